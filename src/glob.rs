use std::ffi::{CStr, CString};
use std::mem;

use crate::error::{Error, GlobFailure, Result};

struct GlobBuf {
	imp: libc::glob_t,
}

impl Drop for GlobBuf {
	fn drop(&mut self) {
		unsafe { libc::globfree(&mut self.imp) }
	}
}

/// Expands `pattern` with `glob(3)`; backslash-escaped metacharacters match
/// literally. Matches come back sorted, and an empty result is an error.
pub fn expand(pattern: &str) -> Result<Vec<CString>> {
	let c_pattern = CString::new(pattern)?;
	let mut buf = GlobBuf { imp: unsafe { mem::zeroed() } };
	let ret = unsafe { libc::glob(c_pattern.as_ptr(), 0, None, &mut buf.imp) };
	let kind = match ret {
		0 => None,
		libc::GLOB_NOSPACE => Some(GlobFailure::OutOfMemory),
		libc::GLOB_ABORTED => Some(GlobFailure::ReadAborted),
		libc::GLOB_NOMATCH => Some(GlobFailure::NoMatch),
		_ => Some(GlobFailure::ReadAborted),
	};
	if let Some(kind) = kind {
		return Err(Error::Glob { pattern: pattern.to_string(), kind: kind });
	}

	let count = buf.imp.gl_pathc as usize;
	let mut matches = Vec::with_capacity(count);
	for i in 0..count {
		let p = unsafe { *buf.imp.gl_pathv.add(i) };
		if p.is_null() {
			break;
		}
		matches.push(unsafe { CStr::from_ptr(p) }.to_owned());
	}
	if matches.is_empty() {
		return Err(Error::Glob { pattern: pattern.to_string(), kind: GlobFailure::NoMatch });
	}
	Ok(matches)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	fn names(matches: Vec<CString>, dir: &std::path::Path) -> Vec<String> {
		let prefix = format!("{}/", dir.display());
		matches.into_iter()
			.map(|m| m.into_string().unwrap().trim_start_matches(&prefix).to_string())
			.collect()
	}

	#[test]
	fn matches_are_sorted() {
		let dir = tempfile::tempdir().unwrap();
		for name in &["b.txt", "a.txt", "c.log"] {
			fs::write(dir.path().join(name), b"").unwrap();
		}
		let found = expand(&format!("{}/*.txt", dir.path().display())).unwrap();
		assert_eq!(names(found, dir.path()), vec!["a.txt", "b.txt"]);
	}

	#[test]
	fn escaped_metacharacters_are_literal() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("a*"), b"").unwrap();
		fs::write(dir.path().join("ab"), b"").unwrap();
		let found = expand(&format!("{}/a\\*", dir.path().display())).unwrap();
		assert_eq!(names(found, dir.path()), vec!["a*"]);
	}

	#[test]
	fn no_match_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		match expand(&format!("{}/*.none", dir.path().display())) {
			Err(Error::Glob { kind: GlobFailure::NoMatch, .. }) => {},
			other => panic!("unexpected {:?}", other),
		}
	}
}

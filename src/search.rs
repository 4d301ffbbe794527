use std::collections::HashMap;
use std::ffi::{CStr, CString, OsStr};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::{env, fs};

const PATH_KEY: &str = "PATH";

/// Resolves command names against `PATH`, remembering what it found.
#[derive(Debug, Default)]
pub struct SearchCache {
	imp: HashMap<CString, CString>,
}

fn is_executable(path: &Path) -> bool {
	match fs::metadata(path) {
		Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
		Err(_) => false,
	}
}

impl SearchCache {
	pub fn new() -> SearchCache {
		SearchCache { imp: HashMap::new() }
	}

	pub fn rehash(&mut self) {
		self.imp.clear();
	}

	/// Names containing `/` are returned unchanged.
	pub fn lookup(&mut self, name: &CStr) -> Option<CString> {
		if name.to_bytes().contains(&b'/') {
			return Some(name.to_owned());
		}
		if let Some(found) = self.imp.get(name) {
			return Some(found.clone());
		}
		let paths = env::var_os(PATH_KEY)?;
		let file_name = OsStr::from_bytes(name.to_bytes());
		for dir in env::split_paths(&paths) {
			let candidate = dir.join(file_name);
			if is_executable(&candidate) {
				let found = CString::new(candidate.into_os_string().into_vec()).ok()?;
				self.imp.insert(name.to_owned(), found.clone());
				return Some(found);
			}
		}
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn slash_names_are_untouched() {
		let mut cache = SearchCache::new();
		let name = CString::new("./not-there").unwrap();
		assert_eq!(cache.lookup(&name), Some(name));
	}

	#[test]
	fn finds_sh_on_path() {
		let mut cache = SearchCache::new();
		let found = cache.lookup(&CString::new("sh").unwrap()).unwrap();
		assert!(found.to_bytes().ends_with(b"/sh"));
		assert_eq!(cache.imp.len(), 1);
	}

	#[test]
	fn unknown_command_is_none() {
		let mut cache = SearchCache::new();
		assert_eq!(cache.lookup(&CString::new("no-such-command-4f1c").unwrap()), None);
	}
}

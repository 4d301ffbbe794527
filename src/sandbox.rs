//! Lexical check that a path stays below a trusted directory.
//!
//! No filesystem access happens here, so a symlink inside the trusted
//! directory that points elsewhere is not detected.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandboxError {
	#[error("sandboxing {path}: escapes trusted path `{trusted}`")]
	Escape { trusted: String, path: String },
	#[error("sandboxing {path}: cannot be verified")]
	Unverifiable { path: String },
}

impl SandboxError {
	pub fn path(&self) -> &str {
		match *self {
			SandboxError::Escape { ref path, .. } => path,
			SandboxError::Unverifiable { ref path } => path,
		}
	}
}

/// Checks that `path` cannot resolve outside `trusted`.
///
/// An empty `trusted` means the current directory.
pub fn verify(trusted: &str, path: &str) -> Result<(), SandboxError> {
	if trusted.contains('\0') || path.contains('\0') {
		return Err(SandboxError::Unverifiable { path: path.to_string() });
	}
	if prefix_check(trusted, path) {
		return Ok(());
	}
	// The current directory has no textual form to normalize against.
	if !trusted.is_empty() && normalized_check(trusted, path) {
		return Ok(());
	}
	Err(SandboxError::Escape { trusted: trusted.to_string(), path: path.to_string() })
}

fn prefix_check(trusted: &str, path: &str) -> bool {
	let rest = match path.strip_prefix(trusted) {
		Some(rest) => rest,
		None => return false,
	};
	if trusted.is_empty() {
		if path.starts_with('/') {
			return false;
		}
	} else if !trusted.ends_with('/') && !(rest.is_empty() || rest.starts_with('/')) {
		// `/trusted` must not vouch for `/trustedX`
		return false;
	}
	let mut depth: i64 = 0;
	for part in rest.split('/') {
		match part {
			"" | "." => {}
			".." => {
				depth -= 1;
				if depth < 0 {
					return false;
				}
			}
			_ => depth += 1,
		}
	}
	true
}

fn normalized_check(trusted: &str, path: &str) -> bool {
	let root = Normalized::new(trusted);
	let candidate = Normalized::new(path);
	if root.absolute != candidate.absolute || !candidate.parts.starts_with(&root.parts) {
		return false;
	}
	!candidate.parts[root.parts.len()..].contains(&"..")
}

#[derive(Debug, PartialEq, Eq)]
struct Normalized<'a> {
	absolute: bool,
	// `..` only ever appears as a leading run, and only when relative.
	parts: Vec<&'a str>,
}

impl<'a> Normalized<'a> {
	fn new(path: &'a str) -> Normalized<'a> {
		let absolute = path.starts_with('/');
		let mut parts: Vec<&'a str> = Vec::new();
		for part in path.split('/') {
			match part {
				"" | "." => {}
				".." => match parts.last() {
					Some(&last) if last != ".." => {
						parts.pop();
					}
					_ if absolute => {}
					_ => parts.push(".."),
				},
				_ => parts.push(part),
			}
		}
		Normalized { absolute: absolute, parts: parts }
	}
}

/// Lexically simplifies `path`: drops `.`, resolves `..` against earlier
/// components and collapses repeated `/`. A trailing `/` is kept.
pub fn simplify(path: &str) -> String {
	let normalized = Normalized::new(path);
	let mut out = String::with_capacity(path.len());
	if normalized.absolute {
		out.push('/');
	}
	out.push_str(&normalized.parts.join("/"));
	if path.ends_with('/') && !normalized.parts.is_empty() {
		out.push('/');
	}
	if out.is_empty() {
		out.push('.');
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	fn escapes(trusted: &str, path: &str) -> bool {
		match verify(trusted, path) {
			Ok(()) => false,
			Err(SandboxError::Escape { .. }) => true,
			Err(e) => panic!("unexpected {:?}", e),
		}
	}

	#[test]
	fn descendants_are_accepted() {
		assert!(!escapes("/home/u/", "/home/u/a/b"));
		assert!(!escapes("/home/u/", "/home/u/a/../b"));
		assert!(!escapes("/home/u/", "/home/u/"));
		assert!(!escapes("./", "file.txt"));
		assert!(!escapes("./", "dir/./file.txt"));
		assert!(!escapes("", "a/b/../c"));
	}

	#[test]
	fn traversal_is_rejected() {
		assert!(escapes("/home/u/", "/home/u/../u2/x"));
		assert!(escapes("/home/u/", "/home/u/a/../../etc"));
		assert!(escapes("./", "../secret"));
		assert!(escapes("./", "/etc/passwd"));
		assert!(escapes("", "../x"));
		assert!(escapes("", "/etc/passwd"));
	}

	#[test]
	fn prefix_without_boundary_is_rejected() {
		assert!(escapes("/home/u/", "/home/uX"));
		assert!(escapes("/home/u", "/home/uX/file"));
		assert!(!escapes("/home/u", "/home/u/file"));
		assert!(!escapes("/home/u", "/home/u"));
	}

	#[test]
	fn fallback_handles_unnormalized_roots() {
		assert!(!escapes("/home/./u/", "/home/u/x"));
		assert!(!escapes("/home//u/", "/home/u/x"));
		assert!(!escapes("/srv/a/../b/", "/srv/b/c"));
		assert!(escapes("/srv/a/../b/", "/srv/a/c"));
		assert!(escapes("/srv/", "srv/x"));
	}

	#[test]
	fn relative_roots_with_parents() {
		assert!(!escapes("../shared/", "../shared/x"));
		assert!(escapes("../", "../../x"));
		assert!(escapes("../shared/", "../shared/../../x"));
	}

	#[test]
	fn nul_bytes_cannot_be_verified() {
		let err = verify("/tmp/", "/tmp/a\0b").unwrap_err();
		assert_eq!(err, SandboxError::Unverifiable { path: "/tmp/a\0b".to_string() });
	}

	#[test]
	fn rejection_names_the_path() {
		let err = verify("/home/u/", "/home/u/../v").unwrap_err();
		assert_eq!(err.path(), "/home/u/../v");
		assert!(err.to_string().contains("/home/u/../v"));
	}

	#[test]
	fn simplify_collapses_components() {
		assert_eq!(simplify("/a/./b//c/../d"), "/a/b/d");
		assert_eq!(simplify("/../a"), "/a");
		assert_eq!(simplify("../a/../../b"), "../../b");
		assert_eq!(simplify("a/b/"), "a/b/");
		assert_eq!(simplify("./"), ".");
		assert_eq!(simplify("/"), "/");
	}
}

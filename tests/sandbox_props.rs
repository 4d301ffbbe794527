use proptest::collection::vec;
use proptest::prelude::*;

use systemf::sandbox::{self, SandboxError};

const ROOT: &str = "/srv/root/";

proptest! {
	#[test]
	fn descendants_are_accepted(names in vec("[a-z][a-z0-9_.]{0,7}", 0..6)) {
		let path = format!("{}{}", ROOT, names.join("/"));
		prop_assert!(sandbox::verify(ROOT, &path).is_ok(), "{} rejected", path);
	}

	#[test]
	fn climbing_above_the_root_is_rejected(names in vec("[a-z]{1,8}", 0..4), extra in 1usize..3) {
		let mut parts = names.clone();
		parts.extend(std::iter::repeat("..".to_string()).take(names.len() + extra));
		let path = format!("{}{}", ROOT, parts.join("/"));
		match sandbox::verify(ROOT, &path) {
			Err(SandboxError::Escape { .. }) => {},
			other => prop_assert!(false, "{} gave {:?}", path, other),
		}
	}

	#[test]
	fn sibling_with_shared_prefix_is_rejected(suffix in "[a-z]{1,8}", rest in "[a-z]{0,8}") {
		let path = format!("/srv/root{}/{}", suffix, rest);
		prop_assert!(sandbox::verify(ROOT, &path).is_err());
	}

	#[test]
	fn detours_that_come_back_are_accepted(names in vec("[a-z]{1,8}", 1..4), leaf in "[a-z]{1,8}") {
		let mut parts = names.clone();
		parts.extend(std::iter::repeat("..".to_string()).take(names.len()));
		parts.push(leaf);
		let path = format!("{}{}", ROOT, parts.join("/"));
		prop_assert!(sandbox::verify(ROOT, &path).is_ok(), "{} rejected", path);
	}

	#[test]
	fn simplify_is_idempotent(path in "(/?)([a-z.]{1,3}/){0,5}[a-z.]{0,3}") {
		let once = sandbox::simplify(&path);
		prop_assert_eq!(sandbox::simplify(&once), once);
	}
}

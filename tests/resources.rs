//! Tests that look at process-wide state (descriptor table, working
//! directory). They hold `SERIAL` so they never overlap each other.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::sync::{Mutex, MutexGuard};

use systemf::{Config, Error, GlobFailure, Runner, Status};

static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
	SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

fn cmd() -> &'static str {
	env!("CARGO_BIN_EXE_sf-cmd")
}

fn open_fds() -> usize {
	fs::read_dir("/proc/self/fd").unwrap().count()
}

#[cfg(target_os = "linux")]
#[test]
fn parent_keeps_no_descriptors() {
	let _guard = serial();
	let dir = tempfile::tempdir().unwrap();
	let d = dir.path().display().to_string();
	let mut runner = Runner::new(Config::default());
	let before = open_fds();

	for _ in 0..5 {
		let fmt = format!("%s comma a b | %s cat | %s {{}} > {0}/out 2>> {0}/err", d);
		assert_eq!(runner.run_format(&fmt, &[cmd(), cmd(), cmd()]).unwrap(), Status::Exited(0));

		let fmt = format!("%s count | %s cat {}/%p", d);
		assert!(matches!(runner.run_format(&fmt, &[cmd(), cmd(), "../x"]), Err(Error::Sandbox(_))));

		let fmt = format!("%s count | %s cat < {}/absent", d);
		assert!(matches!(runner.run_format(&fmt, &[cmd(), cmd()]), Err(Error::Io { .. })));

		let fmt = format!("%s count | %s comma {}/*.none", d);
		match runner.run_format(&fmt, &[cmd(), cmd()]) {
			Err(Error::Glob { kind: GlobFailure::NoMatch, .. }) => {},
			other => panic!("unexpected {:?}", other),
		}
	}

	assert_eq!(open_fds(), before);
	assert_eq!(fs::read_to_string(dir.path().join("out")).unwrap(), "{a,b}");
}

#[test]
fn current_directory_is_not_searched() {
	let _guard = serial();
	let dir = tempfile::tempdir().unwrap();
	let name = "sf-local-only-3b7e";
	let script = dir.path().join(name);
	fs::write(&script, "#!/bin/sh\nexit 42\n").unwrap();
	fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

	let cwd = std::env::current_dir().unwrap();
	std::env::set_current_dir(dir.path()).unwrap();
	let status = Runner::new(Config::default()).run_format(&format!("{} 2> /dev/null", name), &[] as &[&str]);
	std::env::set_current_dir(cwd).unwrap();

	assert_eq!(status.unwrap(), Status::Exited(127));
	// Spelled as a path it does run.
	let status = Runner::new(Config::default()).run_format(&script.display().to_string(), &[] as &[&str]);
	assert_eq!(status.unwrap(), Status::Exited(42));
}

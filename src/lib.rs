//! Run shell-like command lines built from a format string, without a shell.
//!
//! ```no_run
//! let status = systemf::systemf!("tar -czf %p -C /srv/export/ %p && echo done", "backup.tgz", "reports")?;
//! assert!(status.success());
//! # Ok::<(), systemf::Error>(())
//! ```
//!
//! Words coming from `%p` and `%*p` are confined to the directory spelled out
//! by the trusted text before them (or the current directory), so an
//! argument such as `../../etc/passwd` aborts the pipeline instead of
//! reaching outside it.

mod close;
pub mod config;
pub mod error;
mod eval;
mod glob;
pub mod logging;
pub mod parser;
pub mod pid_chain;
pub mod sandbox;
mod search;
mod status;
pub mod syllable;
pub mod task;

pub use config::Config;
pub use error::{Error, GlobFailure, Result};
pub use eval::Runner;
pub use parser::parse;
pub use sandbox::SandboxError;
pub use status::Status;
pub use task::{Pipeline, Redirect, RunIf, Stream, Target, Task, TaskArg};

/// Parses and runs `fmt` with a runner configured from `SYSTEMF_DEBUG`.
pub fn systemf<S: AsRef<str>>(fmt: &str, args: &[S]) -> Result<Status> {
	Runner::new(Config::from_env()).run_format(fmt, args)
}

/// `systemf!("cmd %s %p", a, b)` with any `ToString` arguments.
#[macro_export]
macro_rules! systemf {
	($fmt:expr $(, $arg:expr)* $(,)?) => {
		$crate::systemf($fmt, &[$(::std::string::ToString::to_string(&$arg)),*] as &[::std::string::String])
	};
}

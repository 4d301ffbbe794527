use std::{ffi, fmt, io};

use thiserror::Error;

use crate::sandbox::SandboxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobFailure {
	OutOfMemory,
	ReadAborted,
	NoMatch,
}

impl fmt::Display for GlobFailure {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			GlobFailure::OutOfMemory => write!(f, "out of memory"),
			GlobFailure::ReadAborted => write!(f, "read error during expansion"),
			GlobFailure::NoMatch => write!(f, "no match"),
		}
	}
}

/// Everything that keeps a pipeline from running to completion.
///
/// A child that exits nonzero or dies from a signal is not an error; it is
/// reported through `Status`.
#[derive(Debug, Error)]
pub enum Error {
	#[error("parse error at column {column}: {message}")]
	Parse { column: usize, message: String },
	#[error("invalid task: {0}")]
	Construction(String),
	#[error("glob `{pattern}`: {kind}")]
	Glob { pattern: String, kind: GlobFailure },
	#[error(transparent)]
	Sandbox(#[from] SandboxError),
	#[error("{context}: {source}")]
	Io {
		context: String,
		#[source]
		source: io::Error,
	},
	#[error("Nul char error: {0}")]
	Nul(#[from] ffi::NulError),
}

impl Error {
	pub fn io<C: Into<String>>(context: C, source: io::Error) -> Error {
		Error::Io { context: context.into(), source: source }
	}

	pub fn nix<C: Into<String>>(context: C, errno: nix::Error) -> Error {
		Error::io(context, io::Error::from(errno))
	}
}

pub type Result<T> = std::result::Result<T, Error>;

use std::fmt;

use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;

/// How the last task of a pipeline finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
	Exited(i32),
	Signaled(Signal),
}

impl Status {
	pub fn success(self) -> bool {
		self == Status::Exited(0)
	}

	pub fn code(self) -> Option<i32> {
		match self {
			Status::Exited(code) => Some(code),
			Status::Signaled(_) => None,
		}
	}

	/// `None` while the process has not terminated.
	pub fn from_wait(status: WaitStatus) -> Option<Status> {
		match status {
			WaitStatus::Exited(_, code) => Some(Status::Exited(code)),
			WaitStatus::Signaled(_, signal, _) => Some(Status::Signaled(signal)),
			_ => None,
		}
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			Status::Exited(code) => write!(f, "exit status {}", code),
			Status::Signaled(signal) => write!(f, "killed by {}", signal),
		}
	}
}

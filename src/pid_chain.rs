use nix::errno::Errno;
use nix::sys::wait;
use nix::unistd::Pid;

use crate::status::Status;

const CAPACITY_STEP: usize = 4;

/// Children of the piped segment currently running, in spawn order.
#[derive(Debug)]
pub struct PidChain {
	pids: Vec<Pid>,
}

impl PidChain {
	pub fn new() -> PidChain {
		PidChain { pids: Vec::with_capacity(CAPACITY_STEP) }
	}

	pub fn add(&mut self, pid: Pid) {
		if self.pids.len() == self.pids.capacity() {
			self.pids.reserve_exact(CAPACITY_STEP);
		}
		self.pids.push(pid);
	}

	pub fn pids(&self) -> &[Pid] {
		&self.pids
	}

	pub fn len(&self) -> usize {
		self.pids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pids.is_empty()
	}

	/// Reaps every pid in order and returns the status of the last one.
	///
	/// Panics if the kernel reports a pid other than the one waited for.
	pub fn wait_all(&self) -> nix::Result<Option<Status>> {
		let mut last = None;
		for &pid in &self.pids {
			last = Some(wait_terminated(pid)?);
		}
		Ok(last)
	}

	/// Empties the chain, keeping its storage for the next segment.
	pub fn clear(&mut self) {
		self.pids.clear();
	}

	/// Reaps whatever is left after an aborted pipeline. Errors are ignored;
	/// the pipeline is already failing.
	pub fn reap_abandoned(&mut self) {
		for &pid in &self.pids {
			let _ = wait_terminated(pid);
		}
		self.clear();
	}
}

impl Default for PidChain {
	fn default() -> PidChain {
		PidChain::new()
	}
}

fn wait_terminated(pid: Pid) -> nix::Result<Status> {
	loop {
		let status = match wait::waitpid(pid, None) {
			Ok(status) => status,
			Err(Errno::EINTR) => continue,
			Err(e) => return Err(e),
		};
		let reaped = status.pid();
		assert_eq!(reaped, Some(pid), "waitpid returned {:?} while reaping {}", status, pid);
		if let Some(status) = Status::from_wait(status) {
			return Ok(status);
		}
	}
}

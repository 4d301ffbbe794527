//! Closes every descriptor above stderr. Runs in the forked child, so it
//! must not allocate.

use nix::sys::resource::{getrlimit, Resource};

const FALLBACK_LIMIT: libc::c_int = 1024;

pub fn close_upper_fds() {
	#[cfg(target_os = "linux")]
	{
		let ret = unsafe { libc::syscall(libc::SYS_close_range, 3 as libc::c_uint, libc::c_uint::MAX, 0 as libc::c_uint) };
		if ret == 0 {
			return;
		}
	}
	let limit = match getrlimit(Resource::RLIMIT_NOFILE) {
		Ok((soft, _)) if soft == libc::RLIM_INFINITY => FALLBACK_LIMIT,
		Ok((soft, _)) => soft.min(libc::c_int::MAX as libc::rlim_t) as libc::c_int,
		Err(_) => FALLBACK_LIMIT,
	};
	for fd in 3..limit {
		unsafe { libc::close(fd) };
	}
}

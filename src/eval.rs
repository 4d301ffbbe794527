use std::ffi::CString;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::ptr;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::unistd::{self, ForkResult, Pid};
use tracing::{debug, info, warn};

use crate::close;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::glob;
use crate::parser;
use crate::pid_chain::PidChain;
use crate::sandbox;
use crate::search::SearchCache;
use crate::status::Status;
use crate::task::{Pipeline, Redirect, Stream, Target, Task};

enum Wire {
	Inherit,
	Owned(OwnedFd),
	Share,
}

impl Wire {
	fn raw(&self, inherited: RawFd) -> RawFd {
		match *self {
			Wire::Owned(ref fd) => fd.as_raw_fd(),
			_ => inherited,
		}
	}
}

/// Descriptors for one task. Whatever is still owned here is closed when
/// the parent drops it after the fork.
struct TaskFiles {
	stdin: Wire,
	stdout: Wire,
	stderr: Wire,
	/// Read end of this task's stdout pipe; becomes the next task's stdin.
	out_rd_pipe: Option<OwnedFd>,
}

fn open_redirect(redirect: &Redirect) -> Result<OwnedFd> {
	let mut options = OpenOptions::new();
	match redirect.stream {
		Stream::Stdin => {
			options.read(true);
		},
		Stream::Stdout | Stream::Stderr => {
			options.write(true).create(true).mode(0o666);
			if redirect.append {
				options.append(true);
			} else {
				options.truncate(true);
			}
		},
	}
	let file = options.open(&redirect.text).map_err(|e| Error::io(format!("open {}", redirect.text), e))?;
	Ok(OwnedFd::from(file))
}

fn dup_onto(fd: RawFd, target: RawFd) -> std::result::Result<(), Errno> {
	if fd == target {
		return Ok(());
	}
	unistd::dup2(fd, target).map(drop)
}

impl TaskFiles {
	fn wire(task: &Task, stdin_pipe: Option<OwnedFd>) -> Result<TaskFiles> {
		let mut files = TaskFiles {
			stdin: stdin_pipe.map_or(Wire::Inherit, Wire::Owned),
			stdout: Wire::Inherit,
			stderr: Wire::Inherit,
			out_rd_pipe: None,
		};
		for redirect in &task.redirects {
			let wire = match redirect.target {
				Target::File => Wire::Owned(open_redirect(redirect)?),
				Target::Share => Wire::Share,
				Target::Pipe => {
					let (rd, wr) = unistd::pipe2(OFlag::O_CLOEXEC).map_err(|e| Error::nix("pipe", e))?;
					files.out_rd_pipe = Some(rd);
					Wire::Owned(wr)
				},
			};
			match redirect.stream {
				Stream::Stdin => files.stdin = wire,
				Stream::Stdout => files.stdout = wire,
				Stream::Stderr => files.stderr = wire,
			}
		}
		Ok(files)
	}

	/// Child side. Shared streams are duplicated last so they pick up the
	/// final descriptor of the stream they alias.
	fn install(&self) -> std::result::Result<(), Errno> {
		let (stdin, stdout, stderr) = (Stream::Stdin.fd(), Stream::Stdout.fd(), Stream::Stderr.fd());
		dup_onto(self.stdin.raw(stdin), stdin)?;
		match (&self.stdout, &self.stderr) {
			(_, &Wire::Share) => {
				dup_onto(self.stdout.raw(stdout), stdout)?;
				dup_onto(stdout, stderr)
			},
			(&Wire::Share, _) => {
				dup_onto(self.stderr.raw(stderr), stderr)?;
				dup_onto(stderr, stdout)
			},
			_ => {
				dup_onto(self.stdout.raw(stdout), stdout)?;
				dup_onto(self.stderr.raw(stderr), stderr)
			},
		}
	}
}

/// Everything the child needs, built before the fork so the child never
/// allocates.
struct Exec {
	/// `None` when the command was not found; the child then never execs.
	path: Option<CString>,
	_argv: Vec<CString>,
	argv_ptrs: Vec<*const libc::c_char>,
	failure: Vec<u8>,
}

impl Exec {
	fn new(path: Option<CString>, argv: Vec<CString>) -> Exec {
		let mut argv_ptrs: Vec<*const libc::c_char> = argv.iter().map(|a| a.as_ptr()).collect();
		argv_ptrs.push(ptr::null());
		let name = argv[0].to_string_lossy();
		let failure = match path {
			Some(_) => format!("systemf: cannot execute {}\n", name),
			None => format!("systemf: {}: command not found\n", name),
		}.into_bytes();
		Exec { path: path, _argv: argv, argv_ptrs: argv_ptrs, failure: failure }
	}
}

fn exec_child(files: &TaskFiles, exec: &Exec) -> ! {
	if files.install().is_err() {
		unsafe { libc::_exit(126) }
	}
	close::close_upper_fds();
	let code = match exec.path {
		Some(ref path) => {
			unsafe {
				// Rust programs start with SIGPIPE ignored, and exec keeps ignored signals.
				libc::signal(libc::SIGPIPE, libc::SIG_DFL);
				libc::execv(path.as_ptr(), exec.argv_ptrs.as_ptr());
			}
			if Errno::last() == Errno::ENOENT { 127 } else { 126 }
		},
		None => 127,
	};
	unsafe {
		libc::write(2, exec.failure.as_ptr() as *const libc::c_void, exec.failure.len());
		libc::_exit(code)
	}
}

/// Runs pipelines. Holds the configuration and a command lookup cache that
/// is reused across runs.
#[derive(Debug, Default)]
pub struct Runner {
	config: Config,
	search_cache: SearchCache,
}

impl Runner {
	pub fn new(config: Config) -> Runner {
		Runner { config: config, search_cache: SearchCache::new() }
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Forgets resolved command locations, e.g. after `PATH` changed.
	pub fn rehash(&mut self) {
		self.search_cache.rehash();
	}

	/// Parses `fmt` with `args` and runs the result.
	pub fn run_format<S: AsRef<str>>(&mut self, fmt: &str, args: &[S]) -> Result<Status> {
		let pipeline = match parser::parse(fmt, args) {
			Ok(pipeline) => pipeline,
			Err(e) => return Err(self.report(e)),
		};
		self.run(pipeline)
	}

	/// Runs every task whose condition holds and returns the status of the
	/// last one executed.
	pub fn run(&mut self, pipeline: Pipeline) -> Result<Status> {
		self.run_pipeline(pipeline).map_err(|e| self.report(e))
	}

	fn report(&self, e: Error) -> Error {
		if self.config.log_errors {
			warn!(error = %e, "pipeline aborted");
		}
		e
	}

	fn run_pipeline(&mut self, pipeline: Pipeline) -> Result<Status> {
		pipeline.check_redirects()?;

		let mut chain = PidChain::new();
		let mut stdin_pipe: Option<OwnedFd> = None;
		let mut status = Status::Exited(0);
		let mut tasks = pipeline.tasks.into_iter().peekable();
		while let Some(task) = tasks.next() {
			let feeds_next = task.pipes_stdout();
			match self.spawn(task, stdin_pipe.take()) {
				Ok((pid, out_rd_pipe)) => {
					chain.add(pid);
					stdin_pipe = out_rd_pipe;
				},
				Err(e) => {
					chain.reap_abandoned();
					return Err(e);
				},
			}
			if feeds_next {
				continue;
			}

			status = match chain.wait_all() {
				Ok(last) => last.unwrap_or(status),
				Err(e) => {
					chain.reap_abandoned();
					return Err(Error::nix("waitpid", e));
				},
			};
			chain.clear();
			if let Status::Signaled(signal) = status {
				if self.config.log_errors {
					warn!(%signal, "child terminated by signal");
				}
			}
			if let Some(next) = tasks.peek() {
				if !next.run_if.admits(status) {
					debug!(%status, run_if = ?next.run_if, "stopping pipeline");
					break;
				}
			}
		}
		Ok(status)
	}

	fn verify(&self, task: &Task) -> Result<()> {
		for arg in &task.args {
			let trusted = match arg.trusted_path {
				Some(ref trusted) => trusted,
				None => continue,
			};
			if arg.is_glob {
				for m in &arg.matches {
					sandbox::verify(trusted, &m.to_string_lossy())?;
				}
			} else {
				sandbox::verify(trusted, &arg.text)?;
			}
		}
		for redirect in &task.redirects {
			if let Some(ref trusted) = redirect.trusted_path {
				sandbox::verify(trusted, &redirect.text)?;
			}
		}
		Ok(())
	}

	fn spawn(&mut self, mut task: Task, stdin_pipe: Option<OwnedFd>) -> Result<(Pid, Option<OwnedFd>)> {
		for arg in task.args.iter_mut().filter(|a| a.is_glob) {
			arg.matches = glob::expand(&arg.text)?;
		}
		self.verify(&task)?;

		let argv = task.argv()?;
		if argv.is_empty() {
			return Err(Error::Construction("task has no arguments".to_string()));
		}
		let path = self.search_cache.lookup(&argv[0]);
		if self.config.log_exec {
			info!(?argv, "exec");
		}
		let exec = Exec::new(path, argv);

		let mut files = TaskFiles::wire(&task, stdin_pipe)?;
		let out_rd_pipe = files.out_rd_pipe.take();

		// Anything still buffered would otherwise be written by both processes.
		let _ = io::stdout().flush();
		let _ = io::stderr().flush();

		match unsafe { unistd::fork() } {
			Ok(ForkResult::Child) => exec_child(&files, &exec),
			Ok(ForkResult::Parent { child }) => {
				debug!(pid = %child, "spawned");
				Ok((child, out_rd_pipe))
			},
			Err(e) => Err(Error::nix("fork", e)),
		}
	}
}

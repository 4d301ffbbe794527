use std::ffi::CString;
use std::fmt;

use crate::error::{Error, Result};
use crate::status::Status;
use crate::syllable::{self, Syllable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream { Stdin, Stdout, Stderr }

impl Stream {
	pub fn fd(self) -> i32 {
		match self {
			Stream::Stdin => 0,
			Stream::Stdout => 1,
			Stream::Stderr => 2,
		}
	}
}

impl fmt::Display for Stream {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			Stream::Stdin => write!(f, "stdin"),
			Stream::Stdout => write!(f, "stdout"),
			Stream::Stderr => write!(f, "stderr"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
	File,
	/// stdout feeds the next task's stdin
	Pipe,
	/// stderr aliases stdout, or stdout aliases stderr
	Share,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunIf {
	#[default]
	Always,
	IfPreviousFailed,
	IfPreviousSucceeded,
}

impl RunIf {
	pub fn admits(self, previous: Status) -> bool {
		match self {
			RunIf::Always => true,
			RunIf::IfPreviousFailed => !previous.success(),
			RunIf::IfPreviousSucceeded => previous.success(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskArg {
	pub text: String,
	pub trusted_path: Option<String>,
	pub is_glob: bool,
	/// Filled in by glob expansion right before the task runs.
	pub matches: Vec<CString>,
}

impl TaskArg {
	pub fn new<S: Into<String>>(text: S, trusted_path: Option<String>, is_glob: bool) -> TaskArg {
		TaskArg { text: text.into(), trusted_path: trusted_path, is_glob: is_glob, matches: Vec::new() }
	}

	pub fn from_syllables(syllables: Vec<Syllable>) -> TaskArg {
		let assembled = syllable::assemble(syllables);
		TaskArg::new(assembled.text, assembled.trusted_path, assembled.is_glob)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
	pub stream: Stream,
	pub target: Target,
	/// Destination path for `Target::File`.
	pub text: String,
	pub trusted_path: Option<String>,
	pub append: bool,
}

impl Redirect {
	pub fn new(stream: Stream, target: Target, append: bool) -> Redirect {
		Redirect { stream: stream, target: target, text: String::new(), trusted_path: None, append: append }
	}

	pub fn file<S: Into<String>>(stream: Stream, text: S, trusted_path: Option<String>, append: bool) -> Redirect {
		Redirect { text: text.into(), trusted_path: trusted_path, ..Redirect::new(stream, Target::File, append) }
	}

	/// Builds a file redirect from the syllables of its target word. Targets
	/// are never globbed.
	pub fn from_syllables(stream: Stream, append: bool, syllables: Vec<Syllable>) -> Result<Redirect> {
		let assembled = syllable::assemble(syllables);
		if assembled.is_glob {
			return Err(Error::Construction(format!("glob in {} redirect target `{}`", stream, assembled.text)));
		}
		Ok(Redirect::file(stream, assembled.text, assembled.trusted_path, append))
	}
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Task {
	pub args: Vec<TaskArg>,
	pub redirects: Vec<Redirect>,
	pub run_if: RunIf,
}

impl Task {
	pub fn new() -> Task {
		Task::default()
	}

	pub fn from_words(words: Vec<Vec<Syllable>>, redirects: Vec<Redirect>) -> Task {
		let mut task = Task::new();
		for word in words {
			task.add_arg(TaskArg::from_syllables(word));
		}
		task.redirects = redirects;
		task
	}

	pub fn add_arg(&mut self, arg: TaskArg) -> &mut Task {
		self.args.push(arg);
		self
	}

	/// Redirects are validated when the pipeline starts, not here.
	pub fn add_redirect(&mut self, redirect: Redirect) -> &mut Task {
		self.redirects.push(redirect);
		self
	}

	pub fn set_run_if(&mut self, run_if: RunIf) -> &mut Task {
		self.run_if = run_if;
		self
	}

	pub fn redirect(&self, stream: Stream) -> Option<&Redirect> {
		self.redirects.iter().find(|r| r.stream == stream)
	}

	pub fn pipes_stdout(&self) -> bool {
		self.redirect(Stream::Stdout).map_or(false, |r| r.target == Target::Pipe)
	}

	/// Flattens arguments and glob matches into the exec argument vector.
	pub fn argv(&self) -> Result<Vec<CString>> {
		let mut argv = Vec::with_capacity(self.args.len());
		for arg in &self.args {
			if arg.is_glob {
				argv.extend(arg.matches.iter().cloned());
			} else {
				argv.push(CString::new(arg.text.as_str())?);
			}
		}
		Ok(argv)
	}

	fn check_redirects(&self, is_last: bool) -> Result<()> {
		let mut seen: Vec<Stream> = Vec::with_capacity(3);
		for r in &self.redirects {
			if seen.contains(&r.stream) {
				return Err(Error::Construction(format!("more than one {} redirect", r.stream)));
			}
			seen.push(r.stream);
			match (r.target, r.stream) {
				(Target::File, _) if r.text.is_empty() => {
					return Err(Error::Construction(format!("{} redirect without a file name", r.stream)));
				},
				(Target::File, _) => {},
				(Target::Pipe, Stream::Stdout) if is_last => {
					return Err(Error::Construction("pipe from the last task".to_string()));
				},
				(Target::Pipe, Stream::Stdout) => {},
				(Target::Share, Stream::Stdout) | (Target::Share, Stream::Stderr) => {},
				(target, stream) => {
					return Err(Error::Construction(format!("{:?} target on {}", target, stream)));
				},
			}
		}
		let shares = self.redirects.iter().filter(|r| r.target == Target::Share).count();
		if shares > 1 {
			return Err(Error::Construction("stdout and stderr share each other".to_string()));
		}
		Ok(())
	}
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Pipeline {
	pub tasks: Vec<Task>,
}

impl Pipeline {
	pub fn new() -> Pipeline {
		Pipeline::default()
	}

	pub fn push(&mut self, task: Task) -> &mut Pipeline {
		self.tasks.push(task);
		self
	}

	/// Redirect sanity for every task, checked before anything is spawned.
	pub fn check_redirects(&self) -> Result<()> {
		if self.tasks.is_empty() {
			return Err(Error::Construction("empty pipeline".to_string()));
		}
		let last = self.tasks.len() - 1;
		for (i, task) in self.tasks.iter().enumerate() {
			task.check_redirects(i == last)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn echo() -> Task {
		let mut task = Task::new();
		task.add_arg(TaskArg::new("/bin/echo", None, false));
		task
	}

	fn pipeline(tasks: Vec<Task>) -> Pipeline {
		Pipeline { tasks: tasks }
	}

	#[test]
	fn two_stdout_redirects_are_rejected() {
		let mut task = echo();
		task.add_redirect(Redirect::file(Stream::Stdout, "a", None, false));
		task.add_redirect(Redirect::file(Stream::Stdout, "b", None, true));
		assert!(matches!(pipeline(vec![task]).check_redirects(), Err(Error::Construction(_))));
	}

	#[test]
	fn file_redirect_needs_a_name() {
		let mut task = echo();
		task.add_redirect(Redirect::file(Stream::Stderr, "", None, false));
		assert!(matches!(pipeline(vec![task]).check_redirects(), Err(Error::Construction(_))));
	}

	#[test]
	fn malformed_later_task_rejects_whole_pipeline() {
		let mut first = echo();
		first.add_redirect(Redirect::new(Stream::Stdout, Target::Pipe, false));
		let mut second = echo();
		second.add_redirect(Redirect::new(Stream::Stdin, Target::Share, false));
		assert!(pipeline(vec![first, second]).check_redirects().is_err());
	}

	#[test]
	fn pipe_needs_a_consumer() {
		let mut task = echo();
		task.add_redirect(Redirect::new(Stream::Stdout, Target::Pipe, false));
		assert!(pipeline(vec![task.clone()]).check_redirects().is_err());
		assert!(pipeline(vec![task, echo()]).check_redirects().is_ok());
	}

	#[test]
	fn mutual_share_is_rejected() {
		let mut task = echo();
		task.add_redirect(Redirect::new(Stream::Stdout, Target::Share, false));
		task.add_redirect(Redirect::new(Stream::Stderr, Target::Share, false));
		assert!(pipeline(vec![task]).check_redirects().is_err());
	}

	#[test]
	fn glob_redirect_target_is_rejected() {
		let syl = Syllable::new("*.log", syllable::Flags { is_glob: true, is_file: true, is_trusted: true, ..Default::default() });
		assert!(Redirect::from_syllables(Stream::Stdout, false, vec![syl]).is_err());
	}

	#[test]
	fn argv_keeps_positions_of_glob_matches() {
		let mut task = echo();
		let mut glob = TaskArg::new("*.txt", None, true);
		glob.matches = vec![CString::new("a.txt").unwrap(), CString::new("b.txt").unwrap()];
		task.add_arg(glob);
		task.add_arg(TaskArg::new("end", None, false));
		let argv: Vec<String> = task.argv().unwrap().into_iter().map(|c| c.into_string().unwrap()).collect();
		assert_eq!(argv, vec!["/bin/echo", "a.txt", "b.txt", "end"]);
	}

	#[test]
	fn run_if_follows_previous_status() {
		assert!(RunIf::Always.admits(Status::Exited(3)));
		assert!(RunIf::IfPreviousFailed.admits(Status::Exited(1)));
		assert!(!RunIf::IfPreviousFailed.admits(Status::Exited(0)));
		assert!(RunIf::IfPreviousSucceeded.admits(Status::Exited(0)));
		assert!(!RunIf::IfPreviousSucceeded.admits(Status::Signaled(nix::sys::signal::Signal::SIGKILL)));
	}
}

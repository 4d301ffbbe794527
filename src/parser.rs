//! Turns a format string plus its arguments into a `Pipeline`.
//!
//! Text written in the format string is trusted. Text substituted through
//! `%s`, `%p` and `%*p` is not, and `%p`/`%*p` words are later checked so
//! they cannot leave the directory the trusted part of the word names.

use crate::error::{Error, Result};
use crate::syllable::{Flags, Syllable};
use crate::task::{Pipeline, Redirect, RunIf, Stream, Target, Task};

const UNQUOTED_GLOB: &[char] = &['*', '?', '['];

struct Parser<'a> {
	line: &'a str,
	i: usize,
	args: Vec<&'a str>,
	next_arg: usize,
}

impl<'a> Parser<'a> {
	fn err<M: Into<String>>(&self, message: M) -> Error {
		Error::Parse { column: self.i, message: message.into() }
	}

	fn peek(&self) -> Option<u8> {
		self.line.as_bytes().get(self.i).cloned()
	}

	fn at(&self, s: &str) -> bool {
		self.line[self.i..].starts_with(s)
	}

	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(c) = self.peek() {
			if !f(c) { break; }
			self.i += 1;
		}
	}

	fn is_whitespace(c: u8) -> bool {
		match c {
			b' ' | b'\t' | b'\n' => true,
			_ => false,
		}
	}

	fn is_operator(c: u8) -> bool {
		match c {
			b'|' | b'&' | b';' | b'<' | b'>' => true,
			_ => false,
		}
	}

	fn is_letter(c: u8) -> bool {
		match c {
			b'\'' | b'"' | b'\\' | b'%' => false,
			_ => !Parser::is_whitespace(c) && !Parser::is_operator(c),
		}
	}

	fn skip_whitespaces(&mut self) {
		self.proceed_while(Parser::is_whitespace);
	}

	fn take_arg(&mut self) -> Result<&'a str> {
		match self.args.get(self.next_arg) {
			Some(&arg) => {
				self.next_arg += 1;
				Ok(arg)
			},
			None => Err(self.err(format!("format needs more than {} arguments", self.args.len()))),
		}
	}

	/// Reads `%s`, `%p`, `%*p` or `%%` at the cursor.
	fn read_directive(&mut self, quoted: bool) -> Result<Syllable> {
		let untrusted = Flags { escape_glob: true, ..Flags::default() };
		let syllable = if self.at("%%") {
			self.i += 2;
			return Ok(Syllable::new("%", Flags { escape_glob: true, is_trusted: true, ..Flags::default() }));
		} else if self.at("%s") {
			Syllable::new(self.take_arg()?, untrusted)
		} else if self.at("%p") {
			Syllable::new(self.take_arg()?, Flags { is_file: true, ..untrusted })
		} else if self.at("%*p") {
			if quoted {
				return Err(self.err("%*p inside quotes"));
			}
			self.i += 1;
			Syllable::new(self.take_arg()?, Flags { is_glob: true, is_file: true, ..Flags::default() })
		} else {
			return Err(self.err("unknown % directive"));
		};
		self.i += 2;
		Ok(syllable)
	}

	fn read_single_quoted(&mut self) -> Result<Syllable> {
		let start = self.i;
		self.i += 1;
		match self.line[self.i..].find('\'') {
			Some(len) => {
				let text = &self.line[self.i .. self.i + len];
				self.i += len + 1;
				Ok(Syllable::new(text, Flags { escape_glob: true, is_trusted: true, ..Flags::default() }))
			},
			None => {
				self.i = start;
				Err(self.err("unterminated '"))
			},
		}
	}

	fn read_double_quoted(&mut self, syllables: &mut Vec<Syllable>) -> Result<()> {
		let literal = Flags { escape_glob: true, is_trusted: true, ..Flags::default() };
		let start = self.i;
		self.i += 1;
		let mut run = self.i;
		loop {
			match self.peek() {
				Some(b'"') => {
					if run < self.i {
						syllables.push(Syllable::new(&self.line[run .. self.i], literal));
					}
					self.i += 1;
					return Ok(());
				},
				Some(b'%') => {
					if run < self.i {
						syllables.push(Syllable::new(&self.line[run .. self.i], literal));
					}
					let syllable = self.read_directive(true)?;
					syllables.push(syllable);
					run = self.i;
				},
				Some(_) => self.i += 1,
				None => {
					self.i = start;
					return Err(self.err("unterminated \""));
				},
			}
		}
	}

	/// Reads the syllables of one word; empty if the cursor is not on one.
	fn read_word(&mut self, is_redirect_target: bool) -> Result<Vec<Syllable>> {
		let mut syllables = vec![];
		while let Some(c) = self.peek() {
			match c {
				b'\'' => {
					let syllable = self.read_single_quoted()?;
					syllables.push(syllable);
				},
				b'"' => self.read_double_quoted(&mut syllables)?,
				b'%' => {
					let syllable = self.read_directive(false)?;
					syllables.push(syllable);
				},
				b'\\' => {
					let escaped = match self.line[self.i + 1 ..].chars().next() {
						Some(escaped) => escaped,
						None => return Err(self.err("trailing backslash")),
					};
					self.i += 1 + escaped.len_utf8();
					syllables.push(Syllable::new(escaped.to_string(), Flags { escape_glob: true, is_trusted: true, ..Flags::default() }));
				},
				c if Parser::is_letter(c) => {
					let orig = self.i;
					self.proceed_while(Parser::is_letter);
					let text = &self.line[orig .. self.i];
					let is_glob = text.contains(UNQUOTED_GLOB);
					syllables.push(Syllable::new(text, Flags { is_glob: is_glob, is_file: is_glob, is_trusted: true, ..Flags::default() }));
				},
				_ => break,
			}
		}
		if is_redirect_target {
			for syllable in &mut syllables {
				syllable.flags.is_file = true;
			}
		}
		Ok(syllables)
	}

	fn read_target(&mut self, stream: Stream, append: bool) -> Result<Redirect> {
		self.skip_whitespaces();
		let orig = self.i;
		let word = self.read_word(true)?;
		if word.is_empty() {
			return Err(self.err(format!("missing {} redirect target", stream)));
		}
		Redirect::from_syllables(stream, append, word).map_err(|e| Error::Parse { column: orig, message: e.to_string() })
	}

	fn parse_redirect(&mut self) -> Result<Option<Vec<Redirect>>> {
		let redirects = if self.at("2>&1") {
			self.i += 4;
			vec![Redirect::new(Stream::Stderr, Target::Share, false)]
		} else if self.at("2>>") {
			self.i += 3;
			vec![self.read_target(Stream::Stderr, true)?]
		} else if self.at("2>") {
			self.i += 2;
			vec![self.read_target(Stream::Stderr, false)?]
		} else if self.at("&>>") || self.at("&>") {
			let append = self.at("&>>");
			self.i += if append { 3 } else { 2 };
			let out = self.read_target(Stream::Stdout, append)?;
			vec![out, Redirect::new(Stream::Stderr, Target::Share, false)]
		} else if self.at(">&2") {
			self.i += 3;
			vec![Redirect::new(Stream::Stdout, Target::Share, false)]
		} else if self.at(">>") {
			self.i += 2;
			vec![self.read_target(Stream::Stdout, true)?]
		} else if self.at(">") {
			self.i += 1;
			vec![self.read_target(Stream::Stdout, false)?]
		} else if self.at("<") {
			self.i += 1;
			vec![self.read_target(Stream::Stdin, false)?]
		} else {
			return Ok(None);
		};
		Ok(Some(redirects))
	}

	fn at_separator(&self) -> bool {
		self.at("|") || self.at(";") || self.at("&&")
	}

	fn parse_command(&mut self) -> Result<Task> {
		let mut words: Vec<Vec<Syllable>> = vec![];
		let mut redirects: Vec<Redirect> = vec![];

		loop {
			self.skip_whitespaces();
			if self.peek().is_none() || self.at_separator() {
				break;
			}
			if let Some(rs) = self.parse_redirect()? {
				redirects.extend(rs);
				continue;
			}
			let word = self.read_word(false)?;
			if word.is_empty() {
				let c = self.peek().map_or('?', |c| c as char);
				return Err(self.err(format!("unexpected '{}'", c)));
			}
			words.push(word);
		}

		if words.is_empty() {
			return Err(self.err("empty command"));
		}
		Ok(Task::from_words(words, redirects))
	}

	fn parse_pipeline(&mut self) -> Result<Pipeline> {
		let mut pipeline = Pipeline::new();
		let mut run_if = RunIf::Always;

		loop {
			let mut task = self.parse_command()?;
			task.set_run_if(run_if);
			if self.at("||") {
				self.i += 2;
				run_if = RunIf::IfPreviousFailed;
			} else if self.at("&&") {
				self.i += 2;
				run_if = RunIf::IfPreviousSucceeded;
			} else if self.at("|") {
				self.i += 1;
				task.add_redirect(Redirect::new(Stream::Stdout, Target::Pipe, false));
				run_if = RunIf::Always;
			} else if self.at(";") {
				self.i += 1;
				run_if = RunIf::Always;
				self.skip_whitespaces();
				if self.peek().is_none() {
					pipeline.push(task);
					break;
				}
			} else {
				pipeline.push(task);
				break;
			}
			pipeline.push(task);
		}

		if self.next_arg < self.args.len() {
			return Err(self.err(format!("{} arguments left unused", self.args.len() - self.next_arg)));
		}
		Ok(pipeline)
	}
}

pub fn parse<'a, S: AsRef<str>>(line: &'a str, args: &'a [S]) -> Result<Pipeline> {
	let args: Vec<&'a str> = args.iter().map(|a| a.as_ref()).collect();
	let mut parser: Parser<'a> = Parser { line: line, i: 0, args: args, next_arg: 0 };
	parser.parse_pipeline()
}

use std::io;
use std::process;
use io::BufRead;
use io::Write;

use systemf::{logging, Config, Runner, Status};

const PROMPT: &[u8] = b"systemf> ";

fn exit_code(status: Status) -> i32 {
	match status {
		Status::Exited(code) => code,
		Status::Signaled(signal) => 128 + signal as i32,
	}
}

fn main() {
	logging::init();
	let mut runner = Runner::new(Config::from_env());

	let args: Vec<String> = std::env::args().skip(1).collect();
	if let Some((fmt, rest)) = args.split_first() {
		match runner.run_format(fmt, rest) {
			Ok(status) => process::exit(exit_code(status)),
			Err(e) => {
				eprintln!("systemf: {}", e);
				process::exit(255);
			},
		}
	}

	let mut stdout = io::stdout();
	let stdin = io::stdin();
	let mut stdin_locked = stdin.lock();
	loop {
		let _ = stdout.write_all(PROMPT);
		let _ = stdout.flush();
		let mut line = String::new();
		match stdin_locked.read_line(&mut line) {
			Ok(0) | Err(_) => break,
			Ok(_) => {},
		}
		match line.trim() {
			"" => continue,
			"rehash" => {
				runner.rehash();
				continue;
			},
			_ => {},
		}
		let no_args: &[&str] = &[];
		match runner.run_format(&line, no_args) {
			Ok(status) => println!("{}", status),
			Err(e) => eprintln!("systemf: {}", e),
		}
	}
}

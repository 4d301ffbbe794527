//! Deterministic helper for the pipeline tests: each argument is a verb run
//! in order.

use std::io::{self, Read, Write};
use std::process;

const USAGE: &str = "\
stdout: write '1' to stdout with no newline.
stderr: write '2' to stderr with no newline.
cat:    copy stdin to stdout.
{}:     copy stdin to stdout wrapped in {}.
incr:   read an integer from stdin and print it plus one.
comma:  print the remaining arguments comma separated.
true:   exit with 0 (the default).
false:  exit with 1.
count:  count from 1 upwards on stdout, one number per line, forever.
return: exit with the next argument.
";

fn cat(out: &mut dyn Write) -> io::Result<()> {
	io::copy(&mut io::stdin().lock(), out)?;
	Ok(())
}

fn run(args: &[String]) -> io::Result<i32> {
	let stdout = io::stdout();
	let mut out = stdout.lock();
	let mut retval = 0;
	let mut i = 0;
	while i < args.len() {
		match args[i].as_str() {
			"stdout" => write!(out, "1")?,
			"stderr" => {
				let mut err = io::stderr();
				write!(err, "2")?;
			},
			"cat" => cat(&mut out)?,
			"{}" => {
				write!(out, "{{")?;
				cat(&mut out)?;
				write!(out, "}}")?;
			},
			"incr" => {
				let mut input = String::new();
				io::stdin().read_to_string(&mut input)?;
				let n: i64 = input.split_whitespace().next().and_then(|s| s.parse().ok()).unwrap_or(0);
				write!(out, "{}", n + 1)?;
			},
			"comma" => {
				write!(out, "{}", args[i + 1 ..].join(","))?;
				i = args.len();
			},
			"true" => retval = 0,
			"false" => retval = 1,
			"count" => {
				let mut n: u64 = 1;
				loop {
					writeln!(out, "{}", n)?;
					n += 1;
				}
			},
			"return" => {
				i += 1;
				retval = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(0);
			},
			other => write!(out, "\nInvalid option {}\n", other)?,
		}
		i += 1;
	}
	out.flush()?;
	Ok(retval)
}

fn main() {
	let args: Vec<String> = std::env::args().skip(1).collect();
	if args.is_empty() {
		print!("{}", USAGE);
		return;
	}
	match run(&args) {
		Ok(code) => process::exit(code),
		// A closed pipe ends `count`; anything else is unexpected.
		Err(ref e) if e.kind() == io::ErrorKind::BrokenPipe => process::exit(141),
		Err(e) => {
			eprintln!("sf-cmd: {}", e);
			process::exit(2);
		},
	}
}

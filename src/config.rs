use std::env;

const DEBUG_KEY: &str = "SYSTEMF_DEBUG";

/// What a `Runner` reports through `tracing`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Config {
	/// Warn whenever a pipeline aborts, a path is rejected or a child dies
	/// from a signal.
	pub log_errors: bool,
	/// Log every argument vector right before it is executed.
	pub log_exec: bool,
}

impl Config {
	pub fn new() -> Config {
		Config::default()
	}

	/// Reads `SYSTEMF_DEBUG`, a comma separated list of `errors`, `exec` or
	/// `all`. Unknown entries are ignored.
	pub fn from_env() -> Config {
		match env::var(DEBUG_KEY) {
			Ok(value) => Config::parse_flags(&value),
			Err(_) => Config::default(),
		}
	}

	pub fn parse_flags(value: &str) -> Config {
		let mut config = Config::default();
		for flag in value.split(',').map(str::trim) {
			match flag {
				"errors" => config.log_errors = true,
				"exec" => config.log_exec = true,
				"all" => {
					config.log_errors = true;
					config.log_exec = true;
				},
				_ => {},
			}
		}
		config
	}
}

//! Fragments produced by the tokenizer and their assembly into one word.

/// Characters `glob(3)` treats specially.
pub const GLOB_CHARS: &[char] = &['?', '*', '[', ']'];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
	/// Glob metacharacters are literal and get escaped if the word is globbed.
	pub escape_glob: bool,
	pub is_glob: bool,
	/// The word names a file and may need sandboxing.
	pub is_file: bool,
	/// The text came from the format string, not from a caller argument.
	pub is_trusted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syllable {
	pub text: String,
	pub flags: Flags,
}

impl Syllable {
	pub fn new<S: Into<String>>(text: S, flags: Flags) -> Syllable {
		Syllable { text: text.into(), flags: flags }
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
	pub text: String,
	/// Directory prefix the text must not escape. Only present for file
	/// words that are not entirely trusted.
	pub trusted_path: Option<String>,
	pub is_glob: bool,
}

/// Joins the syllables of one word.
///
/// Only `GLOB_CHARS` are escaped in a glob word, so a literal backslash from
/// an `escape_glob` syllable still acts as an escape for `glob(3)`.
pub fn assemble(syllables: Vec<Syllable>) -> Assembled {
	let mut len = 0;
	let mut escapes = 0;
	let mut is_glob = false;
	let mut is_file = false;
	let mut is_trusted = true;
	let mut prefix_len = 0;
	let mut consumed = 0;
	let mut scanning_prefix = true;

	for syl in &syllables {
		if syl.flags.escape_glob {
			escapes += syl.text.matches(GLOB_CHARS).count();
		}
		len += syl.text.len();
		is_glob |= syl.flags.is_glob;
		is_file |= syl.flags.is_file;
		is_trusted &= syl.flags.is_trusted;

		if scanning_prefix {
			if syl.flags.is_trusted && !syl.flags.is_glob {
				if let Some(i) = syl.text.rfind('/') {
					prefix_len = consumed + i + 1;
				}
				consumed += syl.text.len();
			} else {
				scanning_prefix = false;
			}
		}
	}

	if is_glob {
		len += escapes;
	}
	let mut text = String::with_capacity(len);
	let mut prefix = String::with_capacity(prefix_len);
	for syl in &syllables {
		if prefix.len() < prefix_len {
			let take = (prefix_len - prefix.len()).min(syl.text.len());
			prefix.push_str(&syl.text[..take]);
		}
		if is_glob && syl.flags.escape_glob {
			for c in syl.text.chars() {
				if GLOB_CHARS.contains(&c) {
					text.push('\\');
				}
				text.push(c);
			}
		} else {
			text.push_str(&syl.text);
		}
	}
	debug_assert_eq!(text.len(), len);

	let trusted_path = if is_file && !is_trusted {
		if prefix.is_empty() {
			Some("./".to_string())
		} else {
			Some(prefix)
		}
	} else {
		None
	};

	Assembled { text: text, trusted_path: trusted_path, is_glob: is_glob }
}

use std::io::BufRead;

use crate::config::Options;
use crate::error::ShellError;
use crate::eval::{self, Outcome};
use crate::history::History;
use crate::job::ProcessTable;
use crate::parser;

/// Everything one interactive session owns.
pub struct Session {
	pub table: ProcessTable,
	pub history: History,
	pub options: Options,
}

impl Session {
	pub fn new(options: Options) -> Session {
		Session {
			table: ProcessTable::new(),
			history: History::new(options.history_size),
			options: options,
		}
	}

	/// Parses, records and executes one line typed at the prompt.
	pub fn run_line(&mut self, line: &str) -> Result<Outcome, ShellError> {
		let command = match parser::parse(line)? {
			Some(command) => command,
			None => return Ok(Outcome::Done),
		};
		self.history.record(line);
		eval::execute(self, command)
	}
}

/// Reads one line of raw bytes. Bytes that are not UTF-8 are replaced
/// rather than rejected; `None` means end of input.
pub fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>, ShellError> {
	let mut line: Vec<u8> = vec![];
	match input.read_until(b'\n', &mut line) {
		Ok(0) => Ok(None),
		Ok(_) => Ok(Some(String::from_utf8_lossy(&line).into_owned())),
		Err(e) => Err(ShellError::ReadLine(e)),
	}
}

impl Default for Session {
	fn default() -> Session {
		Session::new(Options::default())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Cursor;

	#[test]
	fn invalid_utf8_does_not_end_input() {
		let mut input = Cursor::new(b"echo \xff\necho still-alive\n".to_vec());
		let first = read_line(&mut input).expect("first line").expect("not eof");
		assert_eq!(first, "echo \u{fffd}\n");
		let second = read_line(&mut input).expect("second line").expect("not eof");
		assert_eq!(second, "echo still-alive\n");
		assert!(read_line(&mut input).expect("eof").is_none());
	}

	#[test]
	fn replaced_bytes_still_run() {
		let mut session = Session::default();
		let mut input = Cursor::new(b"true \xff\n".to_vec());
		let line = read_line(&mut input).expect("line").expect("not eof");
		assert!(matches!(session.run_line(&line), Ok(Outcome::Done)));
		assert_eq!(session.history.latest(), Some("true \u{fffd}"));
	}
}

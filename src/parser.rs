use crate::error::ShellError;
use crate::types::ParsedCommand;

type ParseResult<T> = Result<T, String>;

struct Parser<'a> {
	line: &'a [u8],
	i: usize,
}

impl<'a> Parser<'a> {
	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(c) = self.line.get(self.i) {
			if !f(*c) { break; }
			self.i += 1;
		}
	}

	fn is_whitespace(c: u8) -> bool {
		matches!(c, b' ' | b'\t' | b'\n' | b'\r')
	}

	fn is_letter(c: u8) -> bool {
		match c {
			b'>' | b'<' | b'&' | b'|' => false,
			_ => !Parser::is_whitespace(c),
		}
	}

	fn peek(&self) -> Option<u8> {
		self.line.get(self.i).cloned()
	}

	fn skip_whitespaces(&mut self) {
		self.proceed_while(Parser::is_whitespace);
	}

	fn read_word(&mut self) -> String {
		let orig = self.i;
		self.proceed_while(Parser::is_letter);
		String::from_utf8_lossy(&self.line[orig .. self.i]).into_owned()
	}

	fn read_redirect_target(&mut self, op: char) -> ParseResult<String> {
		self.i += 1;
		self.skip_whitespaces();
		let target = self.read_word();
		if target.is_empty() {
			return Err(format!("missing target after '{}'", op));
		}
		Ok(target)
	}

	fn parse_command(&mut self) -> ParseResult<ParsedCommand> {
		let mut command = ParsedCommand::new(Vec::<String>::new());

		loop {
			self.skip_whitespaces();
			match self.peek() {
				Some(b'<') => {
					let target = self.read_redirect_target('<')?;
					if command.input_redirect.replace(target).is_some() {
						return Err("more than one input redirect".to_string());
					}
				},
				Some(b'>') => {
					let target = self.read_redirect_target('>')?;
					if command.output_redirect.replace(target).is_some() {
						return Err("more than one output redirect".to_string());
					}
				},
				_ => {
					let word = self.read_word();
					if word.is_empty() {
						break;
					}
					command.arguments.push(word);
				},
			}
		}

		if command.arguments.is_empty() {
			return Err("empty command".to_string());
		}
		Ok(command)
	}

	fn parse_pipeline(&mut self) -> ParseResult<ParsedCommand> {
		let mut stages: Vec<ParsedCommand> = vec![];
		let mut blocking = true;

		loop {
			stages.push(self.parse_command()?);
			match self.peek() {
				Some(b'|') => { self.i += 1; },
				Some(b'&') => {
					self.i += 1;
					blocking = false;
					self.skip_whitespaces();
					if let Some(c) = self.peek() {
						return Err(format!("character after '&': '{}'", c as char));
					}
					break;
				},
				Some(c) => { return Err(format!("unknown command separator: '{}'", c as char)); },
				None => { break; },
			}
		}

		let mut head: Option<Box<ParsedCommand>> = None;
		for mut stage in stages.into_iter().rev() {
			stage.blocking = blocking;
			stage.next = head;
			head = Some(Box::new(stage));
		}
		head.map(|stage| *stage).ok_or_else(|| "empty command".to_string())
	}
}

/// Parses one input line. A blank line yields `None`.
pub fn parse(line: &str) -> Result<Option<ParsedCommand>, ShellError> {
	if line.trim().is_empty() {
		return Ok(None);
	}
	let mut parser = Parser { line: line.as_bytes(), i: 0 };
	parser.parse_pipeline().map(Some).map_err(ShellError::Parse)
}

use std::fmt;

/// One stage of a command line as handed over by the parser.
///
/// `next` links a second stage whose standard input is fed by this stage's
/// standard output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
	pub arguments: Vec<String>,
	pub input_redirect: Option<String>,
	pub output_redirect: Option<String>,
	pub blocking: bool,
	pub next: Option<Box<ParsedCommand>>,
}

impl ParsedCommand {
	pub fn new<I, S>(arguments: I) -> ParsedCommand
		where I: IntoIterator<Item = S>, S: Into<String>
	{
		ParsedCommand {
			arguments: arguments.into_iter().map(Into::into).collect(),
			input_redirect: None,
			output_redirect: None,
			blocking: true,
			next: None,
		}
	}

	pub fn name(&self) -> &str {
		self.arguments.first().map_or("", String::as_str)
	}

	pub fn argument(&self, i: usize) -> Option<&str> {
		self.arguments.get(i).map(String::as_str)
	}

	pub fn stages(&self) -> usize {
		1 + self.next.as_ref().map_or(0, |next| next.stages())
	}

	pub fn with_input(mut self, path: &str) -> ParsedCommand {
		self.input_redirect = Some(path.to_owned());
		self
	}

	pub fn with_output(mut self, path: &str) -> ParsedCommand {
		self.output_redirect = Some(path.to_owned());
		self
	}

	pub fn background(mut self) -> ParsedCommand {
		self.blocking = false;
		self
	}

	pub fn piped_into(mut self, next: ParsedCommand) -> ParsedCommand {
		self.next = Some(Box::new(next));
		self
	}
}

/// Renders the argument list of this stage only, space separated.
impl fmt::Display for ParsedCommand {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let mut first = true;
		for arg in &self.arguments {
			if !first {
				f.write_str(" ")?;
			}
			f.write_str(arg)?;
			first = false;
		}
		Ok(())
	}
}

use std::collections::VecDeque;

use crate::config::ReplayPolicy;
use crate::error::ShellError;

pub const DEFAULT_CAPACITY: usize = 20;

/// Bounded ring of previously entered lines, oldest first.
#[derive(Debug)]
pub struct History {
	entries: VecDeque<String>,
	capacity: usize,
}

impl History {
	pub fn new(capacity: usize) -> History {
		let capacity = capacity.max(1);
		History { entries: VecDeque::with_capacity(capacity), capacity: capacity }
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Records a line typed at the prompt. Replay requests (`!...`), blank
	/// lines and repeats of the latest entry are not recorded.
	pub fn record(&mut self, line: &str) -> bool {
		let line = line.trim();
		if line.starts_with('!') {
			return false;
		}
		self.push(line)
	}

	fn push(&mut self, line: &str) -> bool {
		if line.is_empty() || self.latest() == Some(line) {
			return false;
		}
		if self.entries.len() == self.capacity {
			self.entries.pop_front();
		}
		self.entries.push_back(line.to_owned());
		true
	}

	pub fn latest(&self) -> Option<&str> {
		self.entries.back().map(String::as_str)
	}

	/// 1-based, oldest entry first.
	pub fn get(&self, n: usize) -> Option<&str> {
		n.checked_sub(1).and_then(|i| self.entries.get(i)).map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
		self.entries.iter().enumerate().map(|(i, line)| (i + 1, line.as_str()))
	}

	pub fn replay_last(&self) -> Result<String, ShellError> {
		self.latest()
			.map(str::to_owned)
			.ok_or_else(|| ShellError::History("there are no previous commands".to_string()))
	}

	pub fn replay_nth(&mut self, n: &str, policy: ReplayPolicy) -> Result<String, ShellError> {
		let line = n.parse::<usize>().ok()
			.and_then(|n| self.get(n))
			.map(str::to_owned)
			.ok_or_else(|| ShellError::History(format!("command number {} does not exist", n)))?;
		if policy == ReplayPolicy::Record {
			self.push(&line);
		}
		Ok(line)
	}
}

use clap::builder::RangedU64ValueParser;
use clap::{Parser, ValueEnum};
use log::LevelFilter;

use crate::history::DEFAULT_CAPACITY;

/// Whether a line replayed with `!!` or `!N` is itself appended to history.
#[derive(Debug, PartialEq, Eq, Clone, Copy, ValueEnum)]
pub enum ReplayPolicy {
	/// Append the replayed line unless it equals the most recent entry.
	Record,
	/// Leave history untouched.
	Skip,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "ish", version, about = "A small interactive shell")]
pub struct Options {
	/// Report the pid and program of every forked command on stderr and log at debug level.
	#[arg(short, long)]
	pub debug: bool,

	/// Number of lines kept in history.
	#[arg(long, default_value_t = DEFAULT_CAPACITY, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
	pub history_size: usize,

	/// What `!!` and `!N` do to history.
	#[arg(long, value_enum, default_value_t = ReplayPolicy::Record)]
	pub replay: ReplayPolicy,
}

impl Default for Options {
	fn default() -> Options {
		Options { debug: false, history_size: DEFAULT_CAPACITY, replay: ReplayPolicy::Record }
	}
}

impl Options {
	/// Level forced by the command line, overriding `RUST_LOG`.
	pub fn log_level(&self) -> Option<LevelFilter> {
		if self.debug { Some(LevelFilter::Debug) } else { None }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_parsed_defaults() {
		let parsed = Options::try_parse_from(["ish"]).expect("no arguments");
		let default = Options::default();
		assert_eq!(parsed.debug, default.debug);
		assert_eq!(parsed.history_size, default.history_size);
		assert_eq!(parsed.replay, default.replay);
	}

	#[test]
	fn flags() {
		let parsed = Options::try_parse_from(["ish", "-d", "--history-size", "5", "--replay", "skip"]).expect("valid flags");
		assert!(parsed.debug);
		assert_eq!(parsed.history_size, 5);
		assert_eq!(parsed.replay, ReplayPolicy::Skip);
		assert_eq!(parsed.log_level(), Some(LevelFilter::Debug));
		assert_eq!(Options::default().log_level(), None);
	}

	#[test]
	fn zero_history_is_rejected() {
		assert!(Options::try_parse_from(["ish", "--history-size", "0"]).is_err());
	}
}

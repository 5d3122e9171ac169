use std::io;

use nix::errno::Errno;
use thiserror::Error;

/// How far an error reaches: `Fatal` ends the session, `Reported` only
/// aborts the command that raised it.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Severity { Reported, Fatal }

#[derive(Error, Debug)]
pub enum ShellError {
	#[error("fork: {0}")]
	Fork(#[source] Errno),
	#[error("pipe: {0}")]
	Pipe(#[source] Errno),
	#[error("waitpid: {0}")]
	Wait(#[source] Errno),
	#[error("reading input: {0}")]
	ReadLine(#[source] io::Error),
	#[error("parse error: {0}")]
	Parse(String),
	#[error("empty command")]
	EmptyCommand,
	#[error("argument contains a nul byte: {0:?}")]
	NulByte(String),
	#[error("illegal redirection: {0}")]
	IllegalRedirect(&'static str),
	#[error("only two-stage pipelines are supported, got {0} stages")]
	TooManyStages(usize),
	#[error("{0}: missing argument")]
	MissingArgument(&'static str),
	#[error("cd: {path}: {source}")]
	ChangeDir {
		path: String,
		#[source]
		source: Errno,
	},
	#[error("{0}: not a valid process id")]
	InvalidPid(String),
	#[error("sending {signal} to {pid}: {source}")]
	Signal {
		signal: &'static str,
		pid: i32,
		#[source]
		source: Errno,
	},
	#[error("history: {0}")]
	History(String),
	#[error("installing SIGCHLD watcher: {0}")]
	Watcher(#[source] io::Error),
}

impl ShellError {
	pub fn severity(&self) -> Severity {
		match *self {
			ShellError::Fork(_) | ShellError::Pipe(_) | ShellError::Wait(_) | ShellError::ReadLine(_) => Severity::Fatal,
			_ => Severity::Reported,
		}
	}

	pub fn is_fatal(&self) -> bool {
		self.severity() == Severity::Fatal
	}
}

/// Failures inside a forked child before its program image is replaced.
/// These never travel back to the parent; the child prints and exits.
#[derive(Error, Debug)]
pub enum ChildError {
	#[error("open: {path}: {source}")]
	Open {
		path: String,
		#[source]
		source: Errno,
	},
	#[error("dup2: {0}")]
	Dup(#[source] Errno),
	#[error("execvp: {program}: {source}")]
	Exec {
		program: String,
		#[source]
		source: Errno,
	},
}

impl ChildError {
	pub fn exit_code(&self) -> i32 {
		match *self {
			ChildError::Exec { .. } => 127,
			ChildError::Open { .. } | ChildError::Dup(_) => 126,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn resource_exhaustion_is_fatal() {
		assert!(ShellError::Fork(Errno::EAGAIN).is_fatal());
		assert!(ShellError::Pipe(Errno::EMFILE).is_fatal());
		assert!(!ShellError::IllegalRedirect("x").is_fatal());
		assert!(!ShellError::InvalidPid("abc".to_string()).is_fatal());
		assert!(!ShellError::ChangeDir { path: "/nope".to_string(), source: Errno::ENOENT }.is_fatal());
	}

	#[test]
	fn child_exit_codes() {
		let missing = ChildError::Exec { program: "nope".to_string(), source: Errno::ENOENT };
		assert_eq!(missing.exit_code(), 127);
		assert_eq!(missing.to_string(), format!("execvp: nope: {}", Errno::ENOENT));
		assert_eq!(ChildError::Exec { program: "/etc".to_string(), source: Errno::EACCES }.exit_code(), 127);
		assert_eq!(ChildError::Dup(Errno::EBADF).exit_code(), 126);
		assert_eq!(ChildError::Open { path: "/nope".to_string(), source: Errno::ENOENT }.exit_code(), 126);
	}
}

use std::io::{self, Write};

use nix::unistd::{self, Pid};

use crate::error::ShellError;
use crate::eval::{self, Outcome};
use crate::job::SignalKind;
use crate::parser;
use crate::session::Session;
use crate::types::ParsedCommand;

pub type Builtin = fn(&mut Session, &ParsedCommand) -> Result<Outcome, ShellError>;

fn required<'a>(command: &'a ParsedCommand, name: &'static str) -> Result<&'a str, ShellError> {
	command.argument(1).ok_or(ShellError::MissingArgument(name))
}

pub fn builtin_cd(_: &mut Session, command: &ParsedCommand) -> Result<Outcome, ShellError> {
	let path = required(command, "cd")?;
	unistd::chdir(path).map_err(|e| ShellError::ChangeDir { path: path.to_owned(), source: e })?;
	Ok(Outcome::Done)
}

fn parse_pid(arg: &str) -> Result<Pid, ShellError> {
	match arg.parse::<i32>() {
		Ok(pid) if pid > 0 => Ok(Pid::from_raw(pid)),
		_ => Err(ShellError::InvalidPid(arg.to_owned())),
	}
}

fn send(session: &mut Session, command: &ParsedCommand, name: &'static str, kind: SignalKind) -> Result<Outcome, ShellError> {
	let pid = parse_pid(required(command, name)?)?;
	session.table.signal(pid, kind)?;
	Ok(Outcome::Done)
}

pub fn builtin_kill(session: &mut Session, command: &ParsedCommand) -> Result<Outcome, ShellError> {
	send(session, command, "kill", SignalKind::Interrupt)
}

pub fn builtin_wake(session: &mut Session, command: &ParsedCommand) -> Result<Outcome, ShellError> {
	send(session, command, "wake", SignalKind::Continue)
}

pub fn builtin_suspend(session: &mut Session, command: &ParsedCommand) -> Result<Outcome, ShellError> {
	send(session, command, "suspend", SignalKind::Suspend)
}

pub fn builtin_procs(session: &mut Session, _: &ParsedCommand) -> Result<Outcome, ShellError> {
	let listing = session.table.list()?;
	let mut stdout = io::stdout();
	let _ = write!(stdout, "{}", listing);
	let _ = stdout.flush();
	Ok(Outcome::Done)
}

pub fn builtin_quit(_: &mut Session, _: &ParsedCommand) -> Result<Outcome, ShellError> {
	Ok(Outcome::Quit)
}

pub fn builtin_history(session: &mut Session, _: &ParsedCommand) -> Result<Outcome, ShellError> {
	let mut stdout = io::stdout();
	for (n, line) in session.history.iter() {
		let _ = writeln!(stdout, "{} {}", n, line);
	}
	let _ = stdout.flush();
	Ok(Outcome::Done)
}

fn replay(session: &mut Session, line: &str) -> Result<Outcome, ShellError> {
	match parser::parse(line)? {
		Some(command) => eval::execute(session, command),
		None => Ok(Outcome::Done),
	}
}

pub fn builtin_replay_last(session: &mut Session, _: &ParsedCommand) -> Result<Outcome, ShellError> {
	let line = session.history.replay_last()?;
	replay(session, &line)
}

pub fn builtin_replay_nth(session: &mut Session, command: &ParsedCommand) -> Result<Outcome, ShellError> {
	let n = command.name().trim_start_matches('!');
	let policy = session.options.replay;
	let line = session.history.replay_nth(n, policy)?;
	replay(session, &line)
}

pub fn match_builtin(name: &str) -> Option<Builtin> {
	match name {
		"cd" => Some(builtin_cd),
		"kill" => Some(builtin_kill),
		"wake" => Some(builtin_wake),
		"suspend" => Some(builtin_suspend),
		"procs" => Some(builtin_procs),
		"quit" => Some(builtin_quit),
		"history" => Some(builtin_history),
		"!!" => Some(builtin_replay_last),
		_ if name.len() > 1 && name.starts_with('!') => Some(builtin_replay_nth),
		_ => None,
	}
}

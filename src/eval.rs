use std::convert::Infallible;
use std::ffi::CString;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use log::debug;
use nix::fcntl::{self, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult, Pid};

use crate::builtin;
use crate::error::{ChildError, ShellError};
use crate::reap;
use crate::session::Session;
use crate::types::ParsedCommand;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Outcome {
	/// The command ran to completion, or was a built-in.
	Done,
	/// A non-blocking command was left running.
	Background(Pid),
	/// The session was asked to end.
	Quit,
}

/// Everything a child needs after `fork`, converted up front so the child
/// only has to splice descriptors and call `execvp`.
struct Program {
	argv: Vec<CString>,
	input: Option<CString>,
	output: Option<CString>,
}

fn c_string(s: &str) -> Result<CString, ShellError> {
	CString::new(s).map_err(|_| ShellError::NulByte(s.to_owned()))
}

impl Program {
	fn prepare(command: &ParsedCommand) -> Result<Program, ShellError> {
		if command.arguments.is_empty() {
			return Err(ShellError::EmptyCommand);
		}
		Ok(Program {
			argv: command.arguments.iter().map(|a| c_string(a)).collect::<Result<_, _>>()?,
			input: command.input_redirect.as_deref().map(c_string).transpose()?,
			output: command.output_redirect.as_deref().map(c_string).transpose()?,
		})
	}
}

fn splice(path: &CString, oflag: OFlag, target: RawFd) -> Result<(), ChildError> {
	let mode = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH;
	let fd = fcntl::open(path.as_c_str(), oflag, mode).map_err(|e| ChildError::Open {
		path: path.to_string_lossy().into_owned(),
		source: e,
	})?;
	unistd::dup2(fd, target).map_err(ChildError::Dup)?;
	let _ = unistd::close(fd);
	Ok(())
}

fn apply_redirects(program: &Program) -> Result<(), ChildError> {
	if let Some(ref path) = program.input {
		splice(path, OFlag::O_RDONLY, libc::STDIN_FILENO)?;
	}
	if let Some(ref path) = program.output {
		splice(path, OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC, libc::STDOUT_FILENO)?;
	}
	Ok(())
}

fn do_exec_child(program: &Program, channel: Option<(OwnedFd, RawFd)>) -> Result<Infallible, ChildError> {
	if let Some((end, target)) = channel {
		unistd::dup2(end.as_raw_fd(), target).map_err(ChildError::Dup)?;
		drop(end);
	}
	apply_redirects(program)?;
	let name = &program.argv[0];
	unistd::execvp(name, &program.argv).map_err(|e| ChildError::Exec {
		program: name.to_string_lossy().into_owned(),
		source: e,
	})
}

/// Runs in the forked child and never returns into shell code.
fn exec_child(program: &Program, channel: Option<(OwnedFd, RawFd)>) -> ! {
	let e = match do_exec_child(program, channel) {
		Ok(never) => match never {},
		Err(e) => e,
	};
	let _ = writeln!(&mut io::stderr(), "ish: {}", e);
	unsafe { libc::_exit(e.exit_code()) }
}

fn announce(session: &Session, pid: Pid, command: &ParsedCommand) {
	debug!("forked {} for {}", pid, command);
	if session.options.debug {
		let _ = writeln!(&mut io::stderr(), "PID: {}\nExecuting command: {}", pid, command.name());
	}
}

fn wait_child(session: &mut Session, pid: Pid) -> Result<(), ShellError> {
	let event = reap::wait_for(pid)?;
	session.table.apply(pid, event);
	Ok(())
}

fn run_single(session: &mut Session, command: ParsedCommand) -> Result<Outcome, ShellError> {
	let program = Program::prepare(&command)?;
	let _ = io::stdout().flush();
	match unsafe { unistd::fork() }.map_err(ShellError::Fork)? {
		ForkResult::Child => exec_child(&program, None),
		ForkResult::Parent { child } => {
			announce(session, child, &command);
			let blocking = command.blocking;
			session.table.register(command, child);
			if blocking {
				wait_child(session, child)?;
				Ok(Outcome::Done)
			} else {
				Ok(Outcome::Background(child))
			}
		},
	}
}

fn check_pipeline(first: &ParsedCommand, second: &ParsedCommand) -> Result<(), ShellError> {
	if second.next.is_some() {
		return Err(ShellError::TooManyStages(2 + second.next.as_ref().map_or(0, |n| n.stages())));
	}
	if first.output_redirect.is_some() {
		return Err(ShellError::IllegalRedirect("output of the first stage already goes to the pipe"));
	}
	if second.input_redirect.is_some() {
		return Err(ShellError::IllegalRedirect("input of the second stage already comes from the pipe"));
	}
	Ok(())
}

/// Two stages joined by a pipe. Always waits for both, whatever their
/// blocking flags say.
fn run_pipeline(session: &mut Session, first: ParsedCommand, second: ParsedCommand) -> Result<Outcome, ShellError> {
	check_pipeline(&first, &second)?;
	let first_program = Program::prepare(&first)?;
	let second_program = Program::prepare(&second)?;

	let (read_end, write_end) = unistd::pipe2(OFlag::O_CLOEXEC).map_err(ShellError::Pipe)?;
	debug!("pipe {} -> {} for {} | {}", write_end.as_raw_fd(), read_end.as_raw_fd(), first, second);
	let _ = io::stdout().flush();

	let first_pid = match unsafe { unistd::fork() }.map_err(ShellError::Fork)? {
		ForkResult::Child => {
			drop(read_end);
			exec_child(&first_program, Some((write_end, libc::STDOUT_FILENO)))
		},
		ForkResult::Parent { child } => child,
	};
	// the second stage sees EOF only once every copy of the write end is gone
	drop(write_end);
	announce(session, first_pid, &first);

	let second_pid = match unsafe { unistd::fork() } {
		Ok(ForkResult::Child) => exec_child(&second_program, Some((read_end, libc::STDIN_FILENO))),
		Ok(ForkResult::Parent { child }) => child,
		Err(e) => {
			session.table.register(first, first_pid);
			return Err(ShellError::Fork(e));
		},
	};
	drop(read_end);
	announce(session, second_pid, &second);

	session.table.register(first, first_pid);
	session.table.register(second, second_pid);
	wait_child(session, first_pid)?;
	wait_child(session, second_pid)?;
	Ok(Outcome::Done)
}

/// Built-ins run in the shell itself; anything else is forked.
pub fn execute(session: &mut Session, mut command: ParsedCommand) -> Result<Outcome, ShellError> {
	if let Some(builtin) = builtin::match_builtin(command.name()) {
		return builtin(session, &command);
	}
	match command.next.take() {
		Some(second) => run_pipeline(session, command, *second),
		None => run_single(session, command),
	}
}


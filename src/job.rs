use std::collections::VecDeque;
use std::fmt;

use log::{debug, warn};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::error::ShellError;
use crate::reap;
use crate::types::ParsedCommand;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProcStatus { Running, Suspended, Terminated }

/// A state change observed for a child process.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StatusEvent {
	Exited,
	Stopped,
	Continued,
	/// The child was already reaped elsewhere.
	Vanished,
}

impl ProcStatus {
	/// `Terminated` is absorbing.
	pub fn apply(self, event: StatusEvent) -> ProcStatus {
		match (self, event) {
			(ProcStatus::Terminated, _) => ProcStatus::Terminated,
			(_, StatusEvent::Exited) | (_, StatusEvent::Vanished) => ProcStatus::Terminated,
			(_, StatusEvent::Stopped) => ProcStatus::Suspended,
			(_, StatusEvent::Continued) => ProcStatus::Running,
		}
	}
}

impl fmt::Display for ProcStatus {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.pad(match *self {
			ProcStatus::Running => "Running",
			ProcStatus::Suspended => "Suspended",
			ProcStatus::Terminated => "Terminated",
		})
	}
}

/// Signals the `kill`, `wake` and `suspend` built-ins deliver.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SignalKind { Interrupt, Continue, Suspend }

impl SignalKind {
	pub fn signal(self) -> Signal {
		match self {
			SignalKind::Interrupt => Signal::SIGINT,
			SignalKind::Continue => Signal::SIGCONT,
			SignalKind::Suspend => Signal::SIGTSTP,
		}
	}
}

#[derive(Debug)]
pub struct ProcessRecord {
	pub command: ParsedCommand,
	pub pid: Pid,
	pub status: ProcStatus,
}

/// Children forked by this session, most recent first.
///
/// Statuses go stale between calls to `refresh`. Terminated records stay
/// until the next `list`.
#[derive(Debug, Default)]
pub struct ProcessTable {
	records: VecDeque<ProcessRecord>,
}

impl ProcessTable {
	pub fn new() -> ProcessTable {
		ProcessTable { records: VecDeque::new() }
	}

	pub fn register(&mut self, command: ParsedCommand, pid: Pid) {
		debug!("tracking {} ({})", pid, command);
		self.records.push_front(ProcessRecord { command: command, pid: pid, status: ProcStatus::Running });
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &ProcessRecord> {
		self.records.iter()
	}

	pub fn get(&self, pid: Pid) -> Option<&ProcessRecord> {
		self.records.iter().find(|r| r.pid == pid)
	}

	pub fn status(&self, pid: Pid) -> Option<ProcStatus> {
		self.get(pid).map(|r| r.status)
	}

	/// Feeds one observed event into the record for `pid`.
	pub fn apply(&mut self, pid: Pid, event: StatusEvent) -> Option<ProcStatus> {
		let record = self.records.iter_mut().find(|r| r.pid == pid)?;
		let status = record.status.apply(event);
		if status != record.status {
			debug!("{} ({}): {} -> {}", pid, record.command, record.status, status);
			record.status = status;
		}
		Some(status)
	}

	/// Probes every live record without blocking.
	pub fn refresh(&mut self) -> Result<(), ShellError> {
		let live: Vec<Pid> = self.records.iter()
			.filter(|r| r.status != ProcStatus::Terminated)
			.map(|r| r.pid)
			.collect();
		for pid in live {
			if let Some(event) = reap::probe(pid)? {
				self.apply(pid, event);
			}
		}
		Ok(())
	}

	/// Reports every record, then purges the terminated ones.
	pub fn list(&mut self) -> Result<Listing, ShellError> {
		self.refresh()?;
		let rows = self.records.iter().enumerate().map(|(i, r)| ListingRow {
			index: i,
			pid: r.pid,
			status: r.status,
			command: r.command.to_string(),
		}).collect();
		let before = self.records.len();
		self.records.retain(|r| r.status != ProcStatus::Terminated);
		if before != self.records.len() {
			debug!("purged {} terminated records", before - self.records.len());
		}
		Ok(Listing { rows: rows })
	}

	/// Delivers `kind` to any pid, tracked by this table or not.
	pub fn signal(&self, pid: Pid, kind: SignalKind) -> Result<(), ShellError> {
		let sig = kind.signal();
		debug!("sending {} to {}", sig, pid);
		signal::kill(pid, sig).map_err(|e| ShellError::Signal { signal: sig.as_str(), pid: pid.as_raw(), source: e })
	}

	/// Interrupts every child still alive and forgets all records.
	pub fn teardown(&mut self) {
		if let Err(e) = self.refresh() {
			warn!("refresh before teardown: {}", e);
		}
		for record in self.records.drain(..) {
			if record.status == ProcStatus::Terminated {
				continue;
			}
			debug!("interrupting {} ({})", record.pid, record.command);
			if let Err(e) = signal::kill(record.pid, Signal::SIGINT) {
				warn!("interrupting {}: {}", record.pid, e);
			}
			// a stopped child only sees the interrupt once continued
			if record.status == ProcStatus::Suspended {
				if let Err(e) = signal::kill(record.pid, Signal::SIGCONT) {
					warn!("continuing {}: {}", record.pid, e);
				}
			}
		}
	}
}

impl Drop for ProcessTable {
	fn drop(&mut self) {
		self.teardown();
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
	pub index: usize,
	pub pid: Pid,
	pub status: ProcStatus,
	pub command: String,
}

/// Snapshot produced by `ProcessTable::list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
	pub rows: Vec<ListingRow>,
}

impl fmt::Display for Listing {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		writeln!(f, "{:<13}{:<13}{:<13}{}", "Index", "PID", "STATUS", "Command")?;
		for row in &self.rows {
			writeln!(f, "{:<13}{:<13}{:<13}{}", row.index, row.pid, row.status, row.command)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::process::Command;

	fn spawn(args: &[&str]) -> (ParsedCommand, Pid) {
		let child = Command::new(args[0]).args(&args[1..]).spawn().expect("spawn");
		(ParsedCommand::new(args.iter().cloned()), Pid::from_raw(child.id() as i32))
	}

	#[test]
	fn transitions() {
		use self::ProcStatus::*;
		use self::StatusEvent::*;
		assert_eq!(Running.apply(Stopped), Suspended);
		assert_eq!(Suspended.apply(Continued), Running);
		assert_eq!(Suspended.apply(Exited), Terminated);
		assert_eq!(Running.apply(Vanished), Terminated);
		assert_eq!(Terminated.apply(Continued), Terminated);
		assert_eq!(Terminated.apply(Stopped), Terminated);
	}

	#[test]
	fn newest_record_first() {
		let mut table = ProcessTable::new();
		table.register(ParsedCommand::new(vec!["a"]), Pid::from_raw(1_000_001));
		table.register(ParsedCommand::new(vec!["b"]), Pid::from_raw(1_000_002));
		let names: Vec<&str> = table.iter().map(|r| r.command.name()).collect();
		assert_eq!(names, vec!["b", "a"]);
		table.apply(Pid::from_raw(1_000_001), StatusEvent::Exited);
		table.apply(Pid::from_raw(1_000_002), StatusEvent::Exited);
	}

	#[test]
	fn foreign_pid_is_vanished() {
		let mut table = ProcessTable::new();
		// pid 1 is never our child
		table.register(ParsedCommand::new(vec!["init"]), Pid::from_raw(1));
		table.refresh().expect("refresh");
		assert_eq!(table.status(Pid::from_raw(1)), Some(ProcStatus::Terminated));
	}

	#[test]
	fn list_reports_then_purges_terminated() {
		let mut table = ProcessTable::new();
		let (cmd, done) = spawn(&["true"]);
		table.register(cmd, done);
		let (cmd, alive) = spawn(&["sleep", "5"]);
		table.register(cmd, alive);

		assert_eq!(reap::wait_for(done).expect("wait"), StatusEvent::Exited);
		table.apply(done, StatusEvent::Exited);

		let listing = table.list().expect("list");
		assert_eq!(listing.rows.len(), 2);
		assert_eq!(listing.rows[0].pid, alive);
		assert_eq!(listing.rows[0].status, ProcStatus::Running);
		assert_eq!(listing.rows[1].status, ProcStatus::Terminated);
		assert!(listing.to_string().starts_with("Index"));
		assert!(listing.to_string().contains("sleep 5"));

		assert_eq!(table.len(), 1);
		assert!(table.iter().all(|r| r.status != ProcStatus::Terminated));

		table.signal(alive, SignalKind::Interrupt).expect("interrupt");
		reap::wait_for(alive).expect("wait");
	}

	#[test]
	fn suspend_and_wake() {
		let mut table = ProcessTable::new();
		let (cmd, pid) = spawn(&["sleep", "5"]);
		table.register(cmd, pid);

		table.signal(pid, SignalKind::Suspend).expect("suspend");
		let mut status = ProcStatus::Running;
		for _ in 0..100 {
			table.refresh().expect("refresh");
			status = table.status(pid).expect("tracked");
			if status == ProcStatus::Suspended { break; }
			std::thread::sleep(std::time::Duration::from_millis(20));
		}
		assert_eq!(status, ProcStatus::Suspended);

		table.signal(pid, SignalKind::Continue).expect("wake");
		for _ in 0..100 {
			table.refresh().expect("refresh");
			status = table.status(pid).expect("tracked");
			if status == ProcStatus::Running { break; }
			std::thread::sleep(std::time::Duration::from_millis(20));
		}
		assert_eq!(status, ProcStatus::Running);

		table.signal(pid, SignalKind::Interrupt).expect("interrupt");
		reap::wait_for(pid).expect("wait");
	}

	#[test]
	fn teardown_interrupts_suspended_children() {
		let mut table = ProcessTable::new();
		let (cmd, pid) = spawn(&["sleep", "30"]);
		table.register(cmd, pid);

		table.signal(pid, SignalKind::Suspend).expect("suspend");
		for _ in 0..100 {
			table.refresh().expect("refresh");
			if table.status(pid) == Some(ProcStatus::Suspended) { break; }
			std::thread::sleep(std::time::Duration::from_millis(20));
		}
		assert_eq!(table.status(pid), Some(ProcStatus::Suspended));

		table.teardown();
		assert!(table.is_empty());
		assert_eq!(reap::wait_for(pid).expect("wait"), StatusEvent::Exited);
	}

	#[test]
	fn signal_to_missing_pid_is_reported() {
		let table = ProcessTable::new();
		match table.signal(Pid::from_raw(i32::MAX - 1), SignalKind::Continue) {
			Err(ref e @ ShellError::Signal { .. }) => assert!(!e.is_fatal()),
			other => panic!("unexpected {:?}", other),
		}
	}
}

//! Bridge between the kernel's view of our children and the process table.
//!
//! Probes never block on a running child. The blocking wait is only used
//! for foreground commands and pipeline stages.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use signal_hook::consts::SIGCHLD;
use signal_hook::SigId;

use crate::error::ShellError;
use crate::job::StatusEvent;

pub trait WaitStatusExt {
	fn event(self) -> Option<StatusEvent>;
}

impl WaitStatusExt for WaitStatus {
	fn event(self) -> Option<StatusEvent> {
		match self {
			WaitStatus::Exited(..) | WaitStatus::Signaled(..) => Some(StatusEvent::Exited),
			WaitStatus::Stopped(..) => Some(StatusEvent::Stopped),
			WaitStatus::Continued(..) => Some(StatusEvent::Continued),
			_ => None,
		}
	}
}

/// Non-blocking status probe for one child.
///
/// `Ok(None)` means nothing changed since the last probe. A child that is
/// no longer ours to wait for (`ECHILD`) is reported as vanished.
pub fn probe(pid: Pid) -> Result<Option<StatusEvent>, ShellError> {
	let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
	match waitpid(pid, Some(flags)) {
		Ok(status) => Ok(status.event()),
		Err(Errno::ECHILD) => Ok(Some(StatusEvent::Vanished)),
		Err(Errno::EINTR) => Ok(None),
		Err(e) => Err(ShellError::Wait(e)),
	}
}

/// Blocks until `pid` terminates.
pub fn wait_for(pid: Pid) -> Result<StatusEvent, ShellError> {
	loop {
		match waitpid(pid, None) {
			Ok(status) => {
				if let Some(event) = status.event() {
					debug!("{} reaped: {:?}", pid, status);
					return Ok(event);
				}
			},
			Err(Errno::EINTR) => {},
			Err(Errno::ECHILD) => return Ok(StatusEvent::Vanished),
			Err(e) => return Err(ShellError::Wait(e)),
		}
	}
}

/// Records `SIGCHLD` deliveries in a flag the session loop drains between
/// prompts. The handler only stores to the flag.
pub struct ChildWatcher {
	pending: Arc<AtomicBool>,
	id: SigId,
}

impl ChildWatcher {
	pub fn spawn() -> Result<ChildWatcher, ShellError> {
		let pending = Arc::new(AtomicBool::new(false));
		let id = signal_hook::flag::register(SIGCHLD, Arc::clone(&pending)).map_err(ShellError::Watcher)?;
		Ok(ChildWatcher { pending: pending, id: id })
	}

	/// True if a child changed state since the last call.
	pub fn drain(&self) -> bool {
		self.pending.swap(false, Ordering::SeqCst)
	}
}

impl Drop for ChildWatcher {
	fn drop(&mut self) {
		signal_hook::low_level::unregister(self.id);
	}
}

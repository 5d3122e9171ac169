use std::env;
use std::io::{self, Write};
use std::process;

use clap::Parser;
use log::warn;

use ish::config::Options;
use ish::error::ShellError;
use ish::eval::Outcome;
use ish::reap::ChildWatcher;
use ish::session::{self, Session};

fn prompt(stdout: &mut io::Stdout) {
	let cwd = env::current_dir().map(|p| p.display().to_string()).unwrap_or_default();
	let _ = write!(stdout, "{} ", cwd);
	let _ = stdout.flush();
}

fn report(e: &ShellError) {
	let _ = writeln!(&mut io::stderr(), "ish: {}", e);
}

fn run(session: &mut Session, watcher: Option<&ChildWatcher>) -> i32 {
	let mut stdout = io::stdout();
	let stdin = io::stdin();
	let mut stdin_locked = stdin.lock();
	loop {
		if watcher.map_or(false, ChildWatcher::drain) {
			if let Err(e) = session.table.refresh() {
				report(&e);
				if e.is_fatal() { return 1; }
			}
		}

		prompt(&mut stdout);
		let line = match session::read_line(&mut stdin_locked) {
			Ok(Some(line)) => line,
			Ok(None) => return 0,
			Err(e) => {
				report(&e);
				return 1;
			},
		};

		match session.run_line(&line) {
			Ok(Outcome::Quit) => return 0,
			Ok(_) => {},
			Err(e) => {
				report(&e);
				if e.is_fatal() { return 1; }
			},
		}
	}
}

fn main() {
	let options = Options::parse();
	let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
	if let Some(level) = options.log_level() {
		logger.filter_level(level);
	}
	logger.init();

	let watcher = match ChildWatcher::spawn() {
		Ok(w) => Some(w),
		Err(e) => {
			warn!("{}; background jobs are only refreshed by procs", e);
			None
		},
	};

	let mut session = Session::new(options);
	let code = run(&mut session, watcher.as_ref());
	session.table.teardown();
	drop(watcher);
	process::exit(code);
}

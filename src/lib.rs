pub mod builtin;
pub mod config;
pub mod error;
pub mod eval;
pub mod history;
pub mod job;
pub mod parser;
pub mod reap;
pub mod session;
pub mod types;

//! tasklist: task list store with snapshot persistence.

pub mod cli;
pub mod config;
pub mod envelope;
pub mod error;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod tasks;

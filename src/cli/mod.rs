//! CLI module
//!
//! Command-line interface for running syncs.
//!
//! # Commands
//!
//! - `sync` - Sync selected streams from a JSONL directory
//! - `streams` - Show traversal order and replication settings
//! - `validate` - Validate the connector configuration
//! - `state show` - Print the persisted state

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat, StateCommands};
pub use runner::Runner;

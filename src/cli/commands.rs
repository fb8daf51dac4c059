//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Bookmark engine CLI
#[derive(Parser, Debug)]
#[command(name = "bookmark-engine")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Connector configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// State file (JSON)
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync every selected stream from a directory of JSONL files
    Sync {
        /// Directory holding `<stream>.jsonl` files
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Inline state override JSON
        #[arg(long)]
        override_json: Option<String>,

        /// State override file (JSON)
        #[arg(long = "override", conflicts_with = "override_json")]
        override_file: Option<PathBuf>,
    },

    /// Show traversal order, replication method and automatic fields
    Streams,

    /// Validate connector configuration
    Validate,

    /// Inspect persisted state
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
}

/// State subcommands
#[derive(Subcommand, Debug)]
pub enum StateCommands {
    /// Print the persisted state
    Show,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

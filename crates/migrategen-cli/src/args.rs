//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "migrategen")]
#[command(author, version, about = "Order an introspected database schema into migrations")]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the ordered migration plan for a schema snapshot
    Plan {
        /// Snapshot file (JSON) with the raw schema metadata
        snapshot: PathBuf,

        /// Path to config file (default: search for migrategen.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Target framework for column type names
        #[arg(short, long, env = "MIGRATEGEN_TARGET")]
        target: Option<String>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Tables to leave out of the plan
        #[arg(short, long = "exclude", value_name = "TABLE")]
        exclude: Vec<String>,
    },

    /// Display the columns of every table in a snapshot
    Schema {
        /// Snapshot file (JSON) with the raw schema metadata
        snapshot: PathBuf,

        /// Target framework for column type names
        #[arg(short, long, env = "MIGRATEGEN_TARGET")]
        target: Option<String>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output
    Json,
}

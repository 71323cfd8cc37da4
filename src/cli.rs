//! Command-line interface for Fleetwatch
//!
//! Uses clap with derive for type-safe CLI parsing

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Fleetwatch - fleet health monitor and alerter
#[derive(Parser)]
#[command(name = "fleetwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "fleetwatch.toml")]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run one monitoring pass (probe, detect transitions, notify)
    Run {
        /// Compute and log decisions without sending mail
        #[arg(long)]
        no_notify: bool,
    },

    /// Validate configuration
    Check,

    /// Show last known node health from the state file
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Write a sample configuration file
    Init {
        /// Target file
        #[arg(default_value = "fleetwatch.toml")]
        file: PathBuf,

        /// Overwrite an existing file
        #[arg(short = 'y', long)]
        force: bool,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Generate shell completion scripts
    pub fn generate_completion(shell: Shell) {
        let mut cmd = Self::command();
        clap_complete::generate(shell, &mut cmd, "fleetwatch", &mut std::io::stdout());
    }
}

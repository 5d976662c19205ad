//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(name = "voipbl-rtbh")]
#[command(
    author,
    version,
    about = "Blackhole voipbl.org and local blacklists through ExaBGP"
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Defaults to `run` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output, including every command sent)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// The subcommand to execute, `run` if none was given.
    pub fn subcommand(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run { dry_run: false })
    }
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run as an ExaBGP process (the default)
    Run {
        /// Run one cycle and print the commands instead of talking to ExaBGP
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the configuration and show what would be used
    Check,

    /// Print a commented default configuration
    DefaultConfig,

    /// Show version
    Version,
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Single-document editor backed by a versioned store.
///
/// The editor follows one branch, shows its history with per-commit diffs,
/// and only lets you edit while the head commit is checked out.
#[derive(Parser, Debug)]
#[command(name = "legit")]
#[command(version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "LEGIT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Walk through bootstrap, save, browse and external edits
    ///
    /// Runs against an in-memory store and prints each step.
    Demo,

    /// Open an interactive editing session
    ///
    /// The store is in memory and seeded with one commit. Type 'help' at
    /// the prompt for the command list.
    Shell {
        /// Content of the initial commit
        #[arg(long, default_value = "Hello World")]
        content: String,
    },

    /// Show or create the config file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the config file location
    Path,
}

#![doc = include_str!("../README.md")]

/// CLI module - command-line interface for legit
mod cli;

fn main() {
    if !cli::run_cli() {
        std::process::exit(1);
    }
}

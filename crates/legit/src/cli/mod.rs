//! Command-line entry point.

mod args;
mod config;
mod demo;
mod render;
mod shell;

use clap::Parser;
use legit_core::config::LegitConfig;

use args::{Cli, Commands};

/// Parse arguments, set up logging and run the requested command.
///
/// Returns `false` if the command failed.
pub fn run_cli() -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    log::debug!("Running {:?}", cli.command);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Config(command) => config::handle_config_command(command, config_path),
        Commands::Demo => match load_config(config_path) {
            Some(config) => demo::handle_demo(&config),
            None => false,
        },
        Commands::Shell { content } => match load_config(config_path) {
            Some(config) => shell::handle_shell(&config, &content),
            None => false,
        },
    }
}

/// Load the config from `path`, or from the default location.
fn load_config(path: Option<&std::path::Path>) -> Option<LegitConfig> {
    let loaded = match path {
        Some(path) => LegitConfig::load_from(path),
        None => LegitConfig::load(),
    };
    match loaded {
        Ok(config) => {
            log::debug!("Loaded config: {:?}", config);
            Some(config)
        }
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            None
        }
    }
}

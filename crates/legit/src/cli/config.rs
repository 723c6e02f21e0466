//! `legit config` handlers.

use std::path::{Path, PathBuf};

use legit_core::config::LegitConfig;

use super::args::ConfigCommands;

/// Handle config subcommands.
pub fn handle_config_command(command: ConfigCommands, override_path: Option<&Path>) -> bool {
    match command {
        ConfigCommands::Show => handle_show(override_path),
        ConfigCommands::Init { force } => match config_file(override_path) {
            Some(path) => handle_init(&path, force),
            None => {
                eprintln!("Could not determine config directory; pass --config <path>");
                false
            }
        },
        ConfigCommands::Path => {
            match config_file(override_path) {
                Some(path) => println!("{}", path.display()),
                None => println!("(no config directory)"),
            }
            true
        }
    }
}

fn config_file(override_path: Option<&Path>) -> Option<PathBuf> {
    override_path
        .map(Path::to_path_buf)
        .or_else(LegitConfig::config_path)
}

fn handle_show(override_path: Option<&Path>) -> bool {
    let Some(config) = super::load_config(override_path) else {
        return false;
    };

    match config_file(override_path) {
        Some(path) if path.exists() => println!("# {}", path.display()),
        Some(path) => println!("# {} (not found, using defaults)", path.display()),
        None => println!("# (no config directory, using defaults)"),
    }
    for line in describe(&config) {
        println!("{}", line);
    }
    true
}

fn describe(config: &LegitConfig) -> Vec<String> {
    vec![
        format!("namespace: {}", config.namespace),
        format!("branch: {}", config.branch),
        format!("file: {}", config.file),
        format!("poll_interval_ms: {}", config.poll_interval_ms),
        format!("on_head_advance: {:?}", config.on_head_advance),
        format!("draft_refresh: {:?}", config.draft_refresh),
        format!("head path: {}", config.paths().head().display()),
    ]
}

fn handle_init(path: &Path, force: bool) -> bool {
    if path.exists() && !force {
        eprintln!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
        return false;
    }
    match LegitConfig::default().save_to(path) {
        Ok(()) => {
            println!("Wrote default config to {}", path.display());
            true
        }
        Err(e) => {
            eprintln!("Failed to write config: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_defaults_once() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("legit").join("config.toml");

        assert!(handle_init(&path, false));
        assert_eq!(LegitConfig::load_from(&path).unwrap(), LegitConfig::default());

        assert!(!handle_init(&path, false));
        assert!(handle_init(&path, true));
    }

    #[test]
    fn test_override_path_wins() {
        let path = Path::new("/tmp/custom.toml");
        assert_eq!(config_file(Some(path)), Some(path.to_path_buf()));
    }

    #[test]
    fn test_describe_lists_paths() {
        let lines = describe(&LegitConfig::default());
        assert!(lines.contains(&"branch: main".to_string()));
        assert!(lines.contains(&"head path: /.legit/branches/main/.legit/head".to_string()));
    }
}

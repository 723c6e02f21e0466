use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::paths::StorePaths;

/// What happens to a historical selection when the head advances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadAdvancePolicy {
    /// Keep showing the selected commit, read-only.
    #[default]
    Pin,
    /// Move the selection to the new head.
    Follow,
}

/// What happens to the draft when the head advances under a selection that
/// tracks it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftRefreshPolicy {
    /// Replace the draft with the new head's content, dropping unsaved edits.
    #[default]
    Reset,
    /// Replace a clean draft; keep a dirty one and re-base it on the new head.
    KeepUnsaved,
}

/// Editor session configuration, stored as TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegitConfig {
    /// Store namespace (the `<ns>` in `/.<ns>/...`)
    pub namespace: String,

    /// Branch the editor follows
    pub branch: String,

    /// Tracked file, relative to the branch root
    pub file: String,

    /// Milliseconds between head polls
    pub poll_interval_ms: u64,

    /// Historical selection behavior when the head advances
    pub on_head_advance: HeadAdvancePolicy,

    /// Draft behavior when the followed head advances
    pub draft_refresh: DraftRefreshPolicy,
}

impl Default for LegitConfig {
    fn default() -> Self {
        Self {
            namespace: "legit".to_string(),
            branch: "main".to_string(),
            file: "document.txt".to_string(),
            poll_interval_ms: 1000,
            on_head_advance: HeadAdvancePolicy::default(),
            draft_refresh: DraftRefreshPolicy::default(),
        }
    }
}

impl LegitConfig {
    /// Get the config file path (~/.config/legit/config.toml)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("legit").join("config.toml"))
    }

    /// Load config from the default location, or return defaults if there is no file
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load and validate config from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: LegitConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Save config to a specific file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the store paths or the poller cannot use
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("namespace", &self.namespace),
            ("branch", &self.branch),
            ("file", &self.file),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{name} must not be empty")));
            }
        }
        if self.namespace.contains('/') {
            return Err(ConfigError::Invalid(
                "namespace must not contain '/'".to_string(),
            ));
        }
        if self.file.starts_with('/') || self.file.split('/').any(|part| part == "..") {
            return Err(ConfigError::Invalid(format!(
                "file must be a relative path inside the branch: {}",
                self.file
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Poll cadence as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Store paths for the configured namespace, branch and file
    pub fn paths(&self) -> StorePaths {
        StorePaths::new(&self.namespace, &self.branch, &self.file)
    }
}

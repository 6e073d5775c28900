//! Configuration management for jira-panel.
//!
//! This module handles loading and saving the TOML config file, turning it
//! into immutable [`SettingsSnapshot`]s, reporting per-key changes through
//! the [`SettingsStore`] and noticing external edits with [`ConfigWatcher`].

mod settings;
mod store;
mod watcher;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use settings::{normalize_base_url, PanelPosition, SettingsSnapshot, MIN_POLL_INTERVAL_SECS};
pub use store::{SettingGroup, SettingKey, SettingsStore};
pub use watcher::ConfigWatcher;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "JIRA_PANEL_CONFIG";

/// Accepted range for the configured poll interval in seconds.
pub const MIN_CONFIGURED_POLL_INTERVAL_SECS: u32 = 30;
pub const MAX_POLL_INTERVAL_SECS: u32 = 3600;

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine configuration directory")]
    NoConfigDir,

    /// The config directory could not be created.
    #[error("failed to create config directory: {0}")]
    CreateDirError(#[source] std::io::Error),

    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    ReadError(#[source] std::io::Error),

    /// The config file could not be written.
    #[error("failed to write config file: {0}")]
    WriteError(#[source] std::io::Error),

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// The config could not be serialized.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// The config directory could not be watched.
    #[error("failed to watch config file: {0}")]
    WatchError(#[source] notify::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// The persisted configuration file.
///
/// Keys are kebab-case (`jira-url`, `poll-interval`, ...). Missing keys take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub jira_url: String,
    pub jira_email: String,
    pub jira_token: String,
    pub jql_query: String,
    /// Poll interval in seconds.
    pub poll_interval: u32,
    pub issue_format: String,
    pub no_issues_text: String,
    /// 0 = left, 1 = center, 2 = right.
    pub panel_position: u32,
    pub homepage_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jira_url: String::new(),
            jira_email: String::new(),
            jira_token: String::new(),
            jql_query: "assignee = currentUser() AND resolution = Unresolved ORDER BY updated DESC"
                .to_string(),
            poll_interval: 300,
            issue_format: "{key}: {summary}".to_string(),
            no_issues_text: "No issues".to_string(),
            panel_position: PanelPosition::Right.index(),
            homepage_url: String::new(),
        }
    }
}

impl Config {
    /// Load the config from a file.
    ///
    /// A missing file yields the default config.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the config to a file, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::CreateDirError)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(ConfigError::WriteError)
    }

    /// Validate value ranges.
    pub fn validate(&self) -> Result<()> {
        let range = MIN_CONFIGURED_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS;
        if !range.contains(&self.poll_interval) {
            return Err(ConfigError::ValidationError(format!(
                "poll-interval must be between {} and {} seconds, got {}",
                range.start(),
                range.end(),
                self.poll_interval
            )));
        }
        Ok(())
    }
}

/// Resolve the config file path.
///
/// Order: explicit path, then `JIRA_PANEL_CONFIG`, then
/// `{config_dir}/jira-panel/config.toml`.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join("jira-panel").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.issue_format, "{key}: {summary}");
        assert_eq!(config.panel_position, 2);
    }

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "jira-url = \"x.atlassian.net\"\npoll-interval = 45\npanel-position = 0\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.jira_url, "x.atlassian.net");
        assert_eq!(config.poll_interval, 45);
        assert_eq!(config.panel_position, 0);
        assert_eq!(config.no_issues_text, "No issues");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            jira_email: "a@b.com".to_string(),
            homepage_url: "/jira/your-work".to_string(),
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_poll_interval_rejected() {
        for poll_interval in [0, 29, 3601] {
            let config = Config {
                poll_interval,
                ..Config::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("poll-interval"));
        }
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "poll-interval = \"soon\"").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    #[serial]
    fn test_config_path_explicit_wins() {
        std::env::set_var(CONFIG_PATH_ENV, "/tmp/from-env.toml");
        let path = config_path(Some(Path::new("/tmp/explicit.toml"))).unwrap();
        std::env::remove_var(CONFIG_PATH_ENV);
        assert_eq!(path, PathBuf::from("/tmp/explicit.toml"));
    }

    #[test]
    #[serial]
    fn test_config_path_from_env() {
        std::env::set_var(CONFIG_PATH_ENV, "/tmp/from-env.toml");
        let path = config_path(None).unwrap();
        std::env::remove_var(CONFIG_PATH_ENV);
        assert_eq!(path, PathBuf::from("/tmp/from-env.toml"));
    }

    #[test]
    #[serial]
    fn test_config_path_default_structure() {
        std::env::remove_var(CONFIG_PATH_ENV);
        if let Ok(path) = config_path(None) {
            assert!(path.ends_with("jira-panel/config.toml"));
        }
    }
}

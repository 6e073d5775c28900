//! File-backed settings store with per-key change notifications.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{Config, ConfigError, Result, SettingsSnapshot};

/// A recognized settings key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    JiraUrl,
    JiraEmail,
    JiraToken,
    JqlQuery,
    PollInterval,
    IssueFormat,
    NoIssuesText,
    PanelPosition,
    HomepageUrl,
}

/// How the lifecycle controller reacts to a change of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingGroup {
    /// Connection and query parameters: refresh.
    Connection,
    /// Display parameters: refresh so the label is re-rendered.
    Display,
    /// Navigation URLs: only the snapshot changes.
    Navigation,
    /// Restart the poll timer.
    PollInterval,
    /// Detach and re-attach the indicator.
    PanelPosition,
}

impl SettingKey {
    /// Every key, in config file order.
    pub const ALL: [SettingKey; 9] = [
        SettingKey::JiraUrl,
        SettingKey::JiraEmail,
        SettingKey::JiraToken,
        SettingKey::JqlQuery,
        SettingKey::PollInterval,
        SettingKey::IssueFormat,
        SettingKey::NoIssuesText,
        SettingKey::PanelPosition,
        SettingKey::HomepageUrl,
    ];

    /// The key name as written in the config file.
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::JiraUrl => "jira-url",
            SettingKey::JiraEmail => "jira-email",
            SettingKey::JiraToken => "jira-token",
            SettingKey::JqlQuery => "jql-query",
            SettingKey::PollInterval => "poll-interval",
            SettingKey::IssueFormat => "issue-format",
            SettingKey::NoIssuesText => "no-issues-text",
            SettingKey::PanelPosition => "panel-position",
            SettingKey::HomepageUrl => "homepage-url",
        }
    }

    /// Whether the key holds an integer.
    pub fn is_int(self) -> bool {
        matches!(self, SettingKey::PollInterval | SettingKey::PanelPosition)
    }

    pub fn group(self) -> SettingGroup {
        match self {
            SettingKey::JiraUrl
            | SettingKey::JiraEmail
            | SettingKey::JiraToken
            | SettingKey::JqlQuery => SettingGroup::Connection,
            SettingKey::IssueFormat | SettingKey::NoIssuesText => SettingGroup::Display,
            SettingKey::HomepageUrl => SettingGroup::Navigation,
            SettingKey::PollInterval => SettingGroup::PollInterval,
            SettingKey::PanelPosition => SettingGroup::PanelPosition,
        }
    }

    fn string_field(self, config: &Config) -> Option<&String> {
        match self {
            SettingKey::JiraUrl => Some(&config.jira_url),
            SettingKey::JiraEmail => Some(&config.jira_email),
            SettingKey::JiraToken => Some(&config.jira_token),
            SettingKey::JqlQuery => Some(&config.jql_query),
            SettingKey::IssueFormat => Some(&config.issue_format),
            SettingKey::NoIssuesText => Some(&config.no_issues_text),
            SettingKey::HomepageUrl => Some(&config.homepage_url),
            SettingKey::PollInterval | SettingKey::PanelPosition => None,
        }
    }

    fn string_field_mut(self, config: &mut Config) -> Option<&mut String> {
        match self {
            SettingKey::JiraUrl => Some(&mut config.jira_url),
            SettingKey::JiraEmail => Some(&mut config.jira_email),
            SettingKey::JiraToken => Some(&mut config.jira_token),
            SettingKey::JqlQuery => Some(&mut config.jql_query),
            SettingKey::IssueFormat => Some(&mut config.issue_format),
            SettingKey::NoIssuesText => Some(&mut config.no_issues_text),
            SettingKey::HomepageUrl => Some(&mut config.homepage_url),
            SettingKey::PollInterval | SettingKey::PanelPosition => None,
        }
    }

    fn int_field(self, config: &Config) -> Option<u32> {
        match self {
            SettingKey::PollInterval => Some(config.poll_interval),
            SettingKey::PanelPosition => Some(config.panel_position),
            _ => None,
        }
    }

    fn int_field_mut(self, config: &mut Config) -> Option<&mut u32> {
        match self {
            SettingKey::PollInterval => Some(&mut config.poll_interval),
            SettingKey::PanelPosition => Some(&mut config.panel_position),
            _ => None,
        }
    }

    /// The keys whose values differ between two configs.
    pub fn changed_between(old: &Config, new: &Config) -> Vec<SettingKey> {
        SettingKey::ALL
            .into_iter()
            .filter(|key| {
                key.string_field(old) != key.string_field(new)
                    || key.int_field(old) != key.int_field(new)
            })
            .collect()
    }
}

/// Settings persisted in a TOML file.
///
/// Every change, whether made through a setter or by editing the file,
/// emits one [`SettingKey`] per changed key on the channel returned by
/// [`SettingsStore::open`].
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    config: Config,
    tx: mpsc::UnboundedSender<SettingKey>,
}

impl SettingsStore {
    /// Open the store at `path`, loading the current file if it exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<(Self, mpsc::UnboundedReceiver<SettingKey>)> {
        let path = path.into();
        let config = Config::load_from(&path)?;
        let (tx, rx) = mpsc::unbounded_channel();

        debug!(path = %path.display(), "Settings store opened");
        Ok((
            Self {
                path,
                config,
                tx,
            },
            rx,
        ))
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a string setting. Returns `None` for integer keys.
    pub fn get_string(&self, key: SettingKey) -> Option<&str> {
        key.string_field(&self.config).map(String::as_str)
    }

    /// Read an integer setting. Returns `None` for string keys.
    pub fn get_int(&self, key: SettingKey) -> Option<u32> {
        key.int_field(&self.config)
    }

    /// Write a string setting and persist it.
    pub fn set_string(&mut self, key: SettingKey, value: impl Into<String>) -> Result<()> {
        let mut config = self.config.clone();
        let field = key.string_field_mut(&mut config).ok_or_else(|| {
            ConfigError::ValidationError(format!("{} is not a string setting", key.as_str()))
        })?;
        *field = value.into();
        self.commit(config)
    }

    /// Write an integer setting and persist it.
    pub fn set_int(&mut self, key: SettingKey, value: u32) -> Result<()> {
        let mut config = self.config.clone();
        let field = key.int_field_mut(&mut config).ok_or_else(|| {
            ConfigError::ValidationError(format!("{} is not an integer setting", key.as_str()))
        })?;
        *field = value;
        self.commit(config)
    }

    /// Read every setting at this instant.
    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot::from_config(&self.config)
    }

    /// Re-read the file. Returns the keys that changed.
    ///
    /// On error the previous values are kept.
    pub fn reload(&mut self) -> Result<Vec<SettingKey>> {
        let config = Config::load_from(&self.path).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Keeping previous settings");
            e
        })?;
        let changed = self.apply(config);
        if !changed.is_empty() {
            info!(count = changed.len(), "Settings reloaded from file");
        }
        Ok(changed)
    }

    fn commit(&mut self, config: Config) -> Result<()> {
        config.save_to(&self.path)?;
        self.apply(config);
        Ok(())
    }

    fn apply(&mut self, config: Config) -> Vec<SettingKey> {
        let changed = SettingKey::changed_between(&self.config, &config);
        self.config = config;
        for key in &changed {
            debug!(key = key.as_str(), "Setting changed");
            // A closed receiver only means nobody is listening anymore.
            let _ = self.tx.send(*key);
        }
        changed
    }
}

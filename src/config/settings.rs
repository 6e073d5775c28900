//! Immutable settings snapshots.
//!
//! A [`SettingsSnapshot`] is a point-in-time copy of every recognized setting.
//! Components never hold a live handle to the settings store; the lifecycle
//! controller builds a new snapshot on every change and hands out `Arc`s.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Config;

/// Lower bound for the actual poll cadence, regardless of configuration.
pub const MIN_POLL_INTERVAL_SECS: u64 = 60;

/// Where the indicator lives in the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PanelPosition {
    /// The left container, after the system control.
    Left,
    /// The center container.
    Center,
    /// The right container.
    #[default]
    Right,
}

impl PanelPosition {
    /// All positions in container order.
    pub const ALL: [PanelPosition; 3] = [
        PanelPosition::Left,
        PanelPosition::Center,
        PanelPosition::Right,
    ];

    /// Map a stored index to a position. Unknown indices fall back to `Right`.
    pub fn from_index(index: u32) -> Self {
        match index {
            0 => PanelPosition::Left,
            1 => PanelPosition::Center,
            _ => PanelPosition::Right,
        }
    }

    /// The stored index of this position.
    pub fn index(self) -> u32 {
        match self {
            PanelPosition::Left => 0,
            PanelPosition::Center => 1,
            PanelPosition::Right => 2,
        }
    }

    /// The child index at which the indicator is inserted.
    ///
    /// The left container starts with a reserved system control, so the
    /// indicator goes right after it.
    pub fn insertion_index(self) -> usize {
        match self {
            PanelPosition::Left => 1,
            PanelPosition::Center | PanelPosition::Right => 0,
        }
    }
}

impl fmt::Display for PanelPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PanelPosition::Left => "left",
            PanelPosition::Center => "center",
            PanelPosition::Right => "right",
        };
        f.write_str(name)
    }
}

/// All user-configurable parameters at a single instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsSnapshot {
    pub jira_url: String,
    pub jira_email: String,
    pub jira_token: String,
    pub jql_query: String,
    /// Configured poll interval; see [`effective_poll_interval`](Self::effective_poll_interval).
    pub poll_interval_seconds: u32,
    pub issue_format: String,
    pub no_issues_text: String,
    pub panel_position: PanelPosition,
    /// Full URL or path relative to the Jira URL. Empty means the Jira URL.
    pub homepage_url: String,
}

impl SettingsSnapshot {
    /// Read every setting out of a loaded config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            jira_url: config.jira_url.clone(),
            jira_email: config.jira_email.clone(),
            jira_token: config.jira_token.clone(),
            jql_query: config.jql_query.clone(),
            poll_interval_seconds: config.poll_interval.max(1),
            issue_format: config.issue_format.clone(),
            no_issues_text: config.no_issues_text.clone(),
            panel_position: PanelPosition::from_index(config.panel_position),
            homepage_url: config.homepage_url.clone(),
        }
    }

    /// Fill an empty token from a fallback source (e.g. the OS keyring).
    pub fn with_token_fallback(mut self, fallback: impl FnOnce(&str) -> Option<String>) -> Self {
        if self.jira_token.is_empty() && !self.jira_email.is_empty() {
            if let Some(token) = fallback(&self.jira_email) {
                self.jira_token = token;
            }
        }
        self
    }

    /// Whether URL, email and token are all present.
    pub fn has_credentials(&self) -> bool {
        !self.jira_url.trim().is_empty()
            && !self.jira_email.is_empty()
            && !self.jira_token.is_empty()
    }

    /// The timer cadence: the configured interval floored to one minute.
    pub fn effective_poll_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.poll_interval_seconds).max(MIN_POLL_INTERVAL_SECS))
    }

    /// The normalized Jira base URL, if one is configured.
    pub fn base_url(&self) -> Option<String> {
        if self.jira_url.trim().is_empty() {
            None
        } else {
            Some(normalize_base_url(&self.jira_url))
        }
    }

    /// The browse URL for an issue key.
    pub fn issue_url(&self, key: &str) -> Option<String> {
        self.base_url().map(|base| format!("{}/browse/{}", base, key))
    }

    /// The URL opened when no issue is displayed.
    ///
    /// Falls back to the Jira URL when no homepage is set. Relative paths are
    /// resolved against the Jira URL.
    pub fn homepage(&self) -> Option<String> {
        let homepage = self.homepage_url.trim();
        if homepage.is_empty() {
            return self.base_url();
        }
        if has_scheme(homepage) {
            return Some(homepage.to_string());
        }
        if homepage.starts_with('/') {
            return self.base_url().map(|base| format!("{}{}", base, homepage));
        }
        Some(normalize_base_url(homepage))
    }
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

fn has_scheme(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Normalize a Jira base URL.
///
/// Trims whitespace, assumes `https://` when no scheme is given and strips
/// one trailing slash.
pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    let mut normalized = if has_scheme(url) {
        url.to_string()
    } else {
        format!("https://{}", url)
    };
    if normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

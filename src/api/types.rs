//! JIRA API response types.
//!
//! These types model the subset of the JIRA REST API v2 search response that
//! the panel needs: the issue key plus the projected display fields.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The field projection requested from the search endpoint.
pub const SEARCH_FIELDS: &str = "key,summary,status,assignee,priority,issuetype";

/// Search result from a JQL query.
///
/// Returned by `GET /rest/api/2/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// The list of issues, in the tracker's search order.
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// Total number of matching issues.
    #[serde(default)]
    pub total: u32,
    /// Maximum results requested.
    #[serde(default)]
    pub max_results: u32,
    /// The index of the first result.
    #[serde(default)]
    pub start_at: u32,
}

/// A JIRA issue as returned by the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// The issue key (e.g., "PROJ-123").
    pub key: String,
    /// The projected issue fields.
    #[serde(default)]
    pub fields: IssueFields,
}

impl Issue {
    /// Create an issue with only a key and summary.
    pub fn new(key: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            fields: IssueFields {
                summary: Some(summary.into()),
                ..IssueFields::default()
            },
        }
    }

    /// Get the issue summary, if set.
    pub fn summary(&self) -> Option<&str> {
        non_empty(self.fields.summary.as_deref())
    }

    /// Get the issue status name, if set.
    pub fn status(&self) -> Option<&str> {
        non_empty(self.fields.status.as_ref().map(|s| s.name.as_str()))
    }

    /// Get the assignee display name, if assigned.
    pub fn assignee(&self) -> Option<&str> {
        non_empty(self.fields.assignee.as_ref().map(|a| a.display_name.as_str()))
    }

    /// Get the priority name, if set.
    pub fn priority(&self) -> Option<&str> {
        non_empty(self.fields.priority.as_ref().map(|p| p.name.as_str()))
    }

    /// Get the issue type name, if set.
    pub fn issue_type(&self) -> Option<&str> {
        non_empty(self.fields.issuetype.as_ref().map(|t| t.name.as_str()))
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.summary() {
            Some(summary) => write!(f, "{}: {}", self.key, summary),
            None => write!(f, "{}", self.key),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Issue fields.
///
/// Every field is optional; the search projection may omit any of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFields {
    /// The issue summary/title.
    #[serde(default)]
    pub summary: Option<String>,
    /// The issue status.
    #[serde(default)]
    pub status: Option<Named>,
    /// The issue assignee.
    #[serde(default)]
    pub assignee: Option<User>,
    /// The issue priority.
    #[serde(default)]
    pub priority: Option<Named>,
    /// The issue type (Bug, Story, Task, etc.).
    #[serde(default)]
    pub issuetype: Option<Named>,
}

/// A named JIRA entity (status, priority, issue type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Named {
    /// The display name.
    #[serde(default)]
    pub name: String,
}

impl Named {
    /// Create a named entity.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A JIRA user reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// The user's display name.
    #[serde(default)]
    pub display_name: String,
    /// The user's email address (may be hidden).
    #[serde(default)]
    pub email_address: Option<String>,
}

/// Error body returned by JIRA on non-success responses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// General error messages.
    #[serde(default)]
    pub error_messages: Vec<String>,
    /// Field-specific errors, in document order.
    #[serde(default)]
    pub errors: serde_json::Map<String, serde_json::Value>,
}

impl ErrorResponse {
    /// Extract the most relevant message from the error body.
    ///
    /// Prefers the first general message, then the first field error.
    pub fn first_message(&self) -> Option<String> {
        if let Some(message) = self.error_messages.first() {
            return Some(message.clone());
        }
        self.errors.values().next().map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

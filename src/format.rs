//! Issue label formatting.

use crate::api::Issue;

/// Fallback for a missing summary.
pub const NO_SUMMARY: &str = "No summary";
/// Fallback for a missing status or issue type.
pub const UNKNOWN: &str = "Unknown";
/// Fallback for a missing assignee.
pub const UNASSIGNED: &str = "Unassigned";
/// Fallback for a missing priority.
pub const NO_PRIORITY: &str = "No priority";

/// Render an issue through a format template.
///
/// Supported placeholders: `{key}`, `{summary}`, `{status}`, `{assignee}`,
/// `{priority}`, `{type}`. Only the first occurrence of each placeholder is
/// replaced. Substitution happens in that order, so a value that itself
/// contains a later placeholder is substituted too.
pub fn format_issue(issue: &Issue, template: &str) -> String {
    let substitutions = [
        ("{key}", issue.key.as_str()),
        ("{summary}", issue.summary().unwrap_or(NO_SUMMARY)),
        ("{status}", issue.status().unwrap_or(UNKNOWN)),
        ("{assignee}", issue.assignee().unwrap_or(UNASSIGNED)),
        ("{priority}", issue.priority().unwrap_or(NO_PRIORITY)),
        ("{type}", issue.issue_type().unwrap_or(UNKNOWN)),
    ];

    substitutions
        .iter()
        .fold(template.to_string(), |text, (token, value)| {
            text.replacen(token, value, 1)
        })
}

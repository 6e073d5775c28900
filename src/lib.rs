//! jira-panel: a status panel indicator for your current JIRA issue.
//!
//! The panel runs one JQL query on a timer and shows the first matching issue
//! as a short label. Clicking the label opens the issue in a browser; a
//! secondary click opens a small action menu.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod indicator;
pub mod logging;
pub mod opener;
pub mod orchestrator;
pub mod ui;

//! JIRA API client and types.
//!
//! This module provides the interface for querying the JIRA REST API.

pub mod auth;
mod client;
mod error;
mod types;

pub use auth::Auth;
pub use client::{IssueQuery, JiraClient};
pub use error::{ApiError, Result};
pub use types::{ErrorResponse, Issue, IssueFields, Named, SearchResult, User, SEARCH_FIELDS};

//! API error types for the JIRA client.

use thiserror::Error;

/// Errors that can occur when querying the JIRA API.
///
/// The display text of each variant is what the user sees in the error
/// details dialog, and what the refresh orchestrator classifies into a short
/// panel label.
#[derive(Debug, Error)]
pub enum ApiError {
    /// URL, email or token is missing. No request was attempted.
    #[error("Jira URL, email, and token must be configured")]
    Configuration,

    /// Transport-level failure (DNS, connect, TLS, timeout).
    #[error("Network connection failed: {0}")]
    Connection(String),

    /// Authentication failed - invalid email or API token.
    #[error("Authentication failed. Please check your Jira token.")]
    Unauthorized,

    /// Permission denied.
    #[error("Access denied (403 Forbidden). Please check your permissions.")]
    Forbidden,

    /// The JIRA instance or endpoint does not exist.
    #[error("Jira instance not found. Please check your URL.")]
    NotFound,

    /// The request was rejected, usually because of a malformed JQL query.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Any other non-success status.
    #[error("Request failed: {detail}")]
    Http {
        /// The HTTP status code.
        status: u16,
        /// Detail extracted from the error body.
        detail: String,
    },

    /// A success response whose body could not be decoded.
    #[error("Failed to parse response: {0}")]
    ResponseParse(String),
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Create an error from an HTTP status code and the detail extracted
    /// from the error body.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        match status {
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden,
            404 => ApiError::NotFound,
            400 => ApiError::BadRequest(detail.into()),
            _ => ApiError::Http {
                status,
                detail: detail.into(),
            },
        }
    }

    /// The HTTP status this error was created from, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Forbidden => Some(403),
            ApiError::NotFound => Some(404),
            ApiError::BadRequest(_) => Some(400),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the JQL query; keep it out of the message.
        ApiError::Connection(err.without_url().to_string())
    }
}

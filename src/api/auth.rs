//! Authentication handling for the JIRA API.
//!
//! JIRA Cloud uses Basic Auth over `email:token`. Tokens normally live in the
//! config file; when that entry is empty the OS keyring is consulted.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// The keyring service name for jira-panel tokens.
pub const KEYRING_SERVICE: &str = "jira-panel";

/// Errors from the OS keyring.
#[derive(Debug, thiserror::Error)]
#[error("Keyring error: {0}")]
pub struct KeyringError(String);

/// Authentication credentials for JIRA.
#[derive(Clone)]
pub struct Auth {
    /// The user's email address.
    email: String,
    /// The complete "Basic ..." header value.
    auth_header: String,
}

impl Auth {
    /// Create new authentication credentials from email and token.
    ///
    /// The token is immediately encoded and the raw token is not stored.
    pub fn new(email: &str, token: &str) -> Self {
        Self {
            email: email.to_string(),
            auth_header: build_auth_header(email, token),
        }
    }

    /// Get the authorization header value for HTTP requests.
    pub fn header_value(&self) -> &str {
        &self.auth_header
    }

    /// Get the email address.
    pub fn email(&self) -> &str {
        &self.email
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("email", &self.email)
            .field("auth_header", &"<redacted>")
            .finish()
    }
}

/// Build the Basic Auth header value.
///
/// Encodes the UTF-8 bytes of "email:token" in Base64 and prepends "Basic ".
fn build_auth_header(email: &str, token: &str) -> String {
    let credentials = format!("{}:{}", email, token);
    format!("Basic {}", BASE64.encode(credentials.as_bytes()))
}

/// Store an API token in the OS keyring for the given account email.
pub fn store_token(email: &str, token: &str) -> Result<(), KeyringError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, email)
        .map_err(|e| KeyringError(format!("failed to create keyring entry: {}", e)))?;

    entry
        .set_password(token)
        .map_err(|e| KeyringError(format!("failed to store token: {}", e)))
}

/// Retrieve an API token from the OS keyring for the given account email.
pub fn get_token(email: &str) -> Result<String, KeyringError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, email)
        .map_err(|e| KeyringError(format!("failed to access keyring: {}", e)))?;

    entry
        .get_password()
        .map_err(|e| KeyringError(format!("failed to retrieve token: {}", e)))
}

//! JIRA API client implementation.
//!
//! This module provides the client that runs the panel's single query: a JQL
//! search capped at one result. It handles authentication, request building
//! and the classification of non-success responses.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use tracing::{debug, instrument, warn};

use super::auth::Auth;
use super::error::{ApiError, Result};
use super::types::{ErrorResponse, Issue, SearchResult, SEARCH_FIELDS};
use crate::config::SettingsSnapshot;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Only the first matching issue is ever displayed.
const MAX_RESULTS: u32 = 1;

/// User agent sent with every request.
const USER_AGENT: &str = concat!("jira-panel/", env!("CARGO_PKG_VERSION"));

/// Something that can run the panel's issue search.
///
/// Implemented by [`JiraClient`]; the refresh orchestrator only depends on
/// this trait.
#[async_trait]
pub trait IssueQuery: Send + Sync {
    /// Search for issues matching the snapshot's JQL query.
    ///
    /// Resolves to exactly one of the issue list (possibly empty) or a
    /// classified error.
    async fn search_issues(&self, snapshot: &SettingsSnapshot) -> Result<Vec<Issue>>;
}

/// The JIRA API client.
#[derive(Debug, Clone)]
pub struct JiraClient {
    /// The HTTP client.
    client: Client,
}

impl JiraClient {
    /// Create a new JIRA client.
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: Self::build_http_client()?,
        })
    }

    /// Build the HTTP client with appropriate settings.
    fn build_http_client() -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ApiError::from)
    }

    /// Build the search URL for a snapshot.
    ///
    /// Returns `None` when no Jira URL is configured.
    pub fn search_url(snapshot: &SettingsSnapshot) -> Option<String> {
        snapshot.base_url().map(|base| {
            format!(
                "{}/rest/api/2/search?jql={}&maxResults={}&fields={}",
                base,
                urlencoding::encode(&snapshot.jql_query),
                MAX_RESULTS,
                SEARCH_FIELDS
            )
        })
    }

    /// Execute a single GET request.
    async fn execute_get(&self, url: &str, auth: &Auth) -> Result<SearchResult> {
        let response = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, auth.header_value())
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle the HTTP response, checking for errors and parsing JSON.
    async fn handle_response(&self, response: Response) -> Result<SearchResult> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str::<SearchResult>(&body)
                .map_err(|e| ApiError::ResponseParse(e.to_string()))
        } else {
            let error_body = response.text().await.unwrap_or_default();
            debug!("Error response body: {}", error_body);

            Err(Self::error_from_response(status, &error_body))
        }
    }

    /// Create an appropriate error from an HTTP response.
    ///
    /// The detail is the first of `errorMessages`, else the first value of
    /// `errors`, else the bare status.
    fn error_from_response(status: StatusCode, body: &str) -> ApiError {
        let detail = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|parsed| parsed.first_message())
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        warn!(status = status.as_u16(), detail = %detail, "JIRA returned an error");
        ApiError::from_status(status.as_u16(), detail)
    }
}

#[async_trait]
impl IssueQuery for JiraClient {
    #[instrument(skip_all, fields(jql = %snapshot.jql_query))]
    async fn search_issues(&self, snapshot: &SettingsSnapshot) -> Result<Vec<Issue>> {
        if !snapshot.has_credentials() {
            return Err(ApiError::Configuration);
        }
        let url = Self::search_url(snapshot).ok_or(ApiError::Configuration)?;
        let auth = Auth::new(&snapshot.jira_email, &snapshot.jira_token);

        debug!(email = auth.email(), "Searching issues");
        let result = self.execute_get(&url, &auth).await?;
        debug!(
            "Found {} issues (total: {})",
            result.issues.len(),
            result.total
        );
        Ok(result.issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn snapshot_for(url: &str) -> SettingsSnapshot {
        SettingsSnapshot {
            jira_url: url.to_string(),
            jira_email: "a@b.com".to_string(),
            jira_token: "t".to_string(),
            jql_query: "assignee=currentUser()".to_string(),
            ..SettingsSnapshot::default()
        }
    }

    async fn search_with(status: u16, body: &str) -> Result<Vec<Issue>> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/2/search"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;

        JiraClient::new()
            .unwrap()
            .search_issues(&snapshot_for(&server.uri()))
            .await
    }

    #[test]
    fn test_search_url() {
        let url = JiraClient::search_url(&snapshot_for("x.atlassian.net/")).unwrap();
        assert_eq!(
            url,
            "https://x.atlassian.net/rest/api/2/search?jql=assignee%3DcurrentUser%28%29&maxResults=1&fields=key,summary,status,assignee,priority,issuetype"
        );
    }

    #[test]
    fn test_search_url_without_base() {
        assert!(JiraClient::search_url(&snapshot_for("  ")).is_none());
    }

    #[tokio::test]
    async fn test_search_sends_expected_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/2/search"))
            .and(query_param("jql", "assignee=currentUser()"))
            .and(query_param("maxResults", "1"))
            .and(query_param("fields", SEARCH_FIELDS))
            .and(header_eq("Authorization", "Basic YUBiLmNvbTp0"))
            .and(header_eq("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"issues":[{"key":"PROJ-1","fields":{"summary":"Fix bug","status":{"name":"Open"},"issuetype":{"name":"Bug"}}}],"total":1,"maxResults":1,"startAt":0}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let issues = JiraClient::new()
            .unwrap()
            .search_issues(&snapshot_for(&server.uri()))
            .await
            .unwrap();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].key, "PROJ-1");
        assert_eq!(issues[0].summary(), Some("Fix bug"));
    }

    #[tokio::test]
    async fn test_search_empty_result() {
        let issues = search_with(200, r#"{"issues":[],"total":0,"maxResults":1,"startAt":0}"#)
            .await
            .unwrap();
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn test_missing_credentials_never_hits_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = JiraClient::new().unwrap();
        let base = snapshot_for(&server.uri());
        let missing = [
            SettingsSnapshot {
                jira_url: String::new(),
                ..base.clone()
            },
            SettingsSnapshot {
                jira_email: String::new(),
                ..base.clone()
            },
            SettingsSnapshot {
                jira_token: String::new(),
                ..base.clone()
            },
        ];

        for snapshot in missing {
            let err = client.search_issues(&snapshot).await.unwrap_err();
            assert!(matches!(err, ApiError::Configuration));
        }
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let err = search_with(401, r#"{"errorMessages":["Invalid credentials"]}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn test_forbidden() {
        let err = search_with(403, "").await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
    }

    #[tokio::test]
    async fn test_not_found() {
        let err = search_with(404, "<html>nope</html>").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[tokio::test]
    async fn test_bad_request_uses_error_messages() {
        let err = search_with(
            400,
            r#"{"errorMessages":["Error in the JQL Query: unexpected end"],"errors":{}}"#,
        )
        .await
        .unwrap_err();
        match err {
            ApiError::BadRequest(detail) => {
                assert_eq!(detail, "Error in the JQL Query: unexpected end")
            }
            other => panic!("Expected BadRequest, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bad_request_uses_first_field_error() {
        let err = search_with(400, r#"{"errorMessages":[],"errors":{"jql":"Field 'x' does not exist"}}"#)
            .await
            .unwrap_err();
        match err {
            ApiError::BadRequest(detail) => assert_eq!(detail, "Field 'x' does not exist"),
            other => panic!("Expected BadRequest, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_other_status_falls_back_to_status_code() {
        let err = search_with(503, "Service Unavailable").await.unwrap_err();
        match err {
            ApiError::Http { status, detail } => {
                assert_eq!(status, 503);
                assert_eq!(detail, "HTTP 503");
            }
            other => panic!("Expected Http, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_other_status_carries_parsed_detail() {
        let err = search_with(500, r#"{"errorMessages":["boom"]}"#)
            .await
            .unwrap_err();
        match &err {
            ApiError::Http { status, detail } => {
                assert_eq!(*status, 500);
                assert_eq!(detail, "boom");
            }
            other => panic!("Expected Http, got {:?}", other),
        }
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_unparsable_success_body() {
        let err = search_with(200, "not json").await.unwrap_err();
        assert!(matches!(err, ApiError::ResponseParse(_)));
    }

    #[tokio::test]
    async fn test_connection_failure() {
        // Nothing listens on port 1.
        let err = JiraClient::new()
            .unwrap()
            .search_issues(&snapshot_for("http://127.0.0.1:1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Connection(_)));
    }
}

//! Refresh orchestration.
//!
//! The [`RefreshOrchestrator`] decides whether a refresh trigger starts a
//! poll cycle, runs the issue query in a background task, and applies the
//! outcome to the [`Indicator`] when the lifecycle controller hands the
//! completion message back.
//!
//! At most one cycle is in flight. Timer ticks that arrive during a cycle are
//! dropped; manual and settings triggers collapse into a single follow-up that
//! runs as soon as the in-flight cycle completes. Because outcomes are applied
//! on the controller's event loop in completion order and cycles never
//! overlap, an older response can never overwrite a newer one.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{self, Issue, IssueQuery};
use crate::config::SettingsSnapshot;
use crate::indicator::Indicator;

/// Error label shown when URL, email or token is missing.
pub const CONFIGURATION_REQUIRED: &str = "Configuration required";

/// What caused a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// The initial refresh after the indicator is attached.
    Startup,
    /// The periodic poll timer.
    Timer,
    /// The user asked for a refresh.
    Manual,
    /// A setting affecting the query or display changed.
    Settings,
}

impl RefreshTrigger {
    /// Whether the indicator switches to `Loading` before the cycle runs.
    ///
    /// Timer polls update the label in place without a loading flash.
    pub fn shows_loading(self) -> bool {
        !matches!(self, RefreshTrigger::Timer)
    }
}

/// Short, user-facing error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    AccessDenied,
    NotFound,
    Connection,
    Response,
    Query,
    Configuration,
    Request,
}

/// Keyword groups checked in order; the first group with a match wins.
const CLASSIFICATION_RULES: [(&[&str], ErrorCategory); 7] = [
    (
        &["authentication", "unauthorized", "401"],
        ErrorCategory::Authentication,
    ),
    (&["forbidden", "403"], ErrorCategory::AccessDenied),
    (&["not found", "404"], ErrorCategory::NotFound),
    (
        &["network", "connection", "timeout"],
        ErrorCategory::Connection,
    ),
    (&["parse", "json"], ErrorCategory::Response),
    (&["jql", "query"], ErrorCategory::Query),
    (
        &["configuration", "configured"],
        ErrorCategory::Configuration,
    ),
];

impl ErrorCategory {
    /// Classify an error message by case-insensitive keyword matching.
    pub fn classify(message: &str) -> Self {
        let message = message.to_lowercase();
        CLASSIFICATION_RULES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| message.contains(k)))
            .map_or(ErrorCategory::Request, |(_, category)| *category)
    }

    /// The short panel label.
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "Authentication Error",
            ErrorCategory::AccessDenied => "Access Denied",
            ErrorCategory::NotFound => "Jira Not Found",
            ErrorCategory::Connection => "Connection Error",
            ErrorCategory::Response => "Response Error",
            ErrorCategory::Query => "Query Error",
            ErrorCategory::Configuration => "Configuration Error",
            ErrorCategory::Request => "Request Error",
        }
    }
}

/// The result of one poll cycle, sent back to the event loop.
#[derive(Debug)]
pub struct CycleOutcome {
    /// The cycle this outcome belongs to.
    pub cycle_id: u64,
    /// The query result.
    pub result: api::Result<Vec<Issue>>,
}

/// What happened to a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDecision {
    /// A new cycle was started.
    Started(u64),
    /// A cycle is in flight; a follow-up will run after it.
    Queued,
    /// A cycle is in flight and the trigger was a timer tick.
    Dropped,
    /// Credentials are missing; the indicator shows the configuration error.
    ConfigurationRequired,
}

#[derive(Debug)]
struct InFlight {
    id: u64,
    trigger: RefreshTrigger,
    started_at: Instant,
    handle: JoinHandle<()>,
}

/// Coordinates poll cycles.
pub struct RefreshOrchestrator {
    query: Arc<dyn IssueQuery>,
    tx: mpsc::UnboundedSender<CycleOutcome>,
    in_flight: Option<InFlight>,
    pending: Option<RefreshTrigger>,
    next_cycle_id: u64,
}

impl RefreshOrchestrator {
    /// Create an orchestrator and the channel its cycle outcomes arrive on.
    pub fn new(query: Arc<dyn IssueQuery>) -> (Self, mpsc::UnboundedReceiver<CycleOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                query,
                tx,
                in_flight: None,
                pending: None,
                next_cycle_id: 1,
            },
            rx,
        )
    }

    /// Whether a cycle is currently awaiting its response.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The collapsed follow-up trigger, if one is queued.
    pub fn pending(&self) -> Option<RefreshTrigger> {
        self.pending
    }

    /// Handle a refresh trigger.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn request(
        &mut self,
        trigger: RefreshTrigger,
        snapshot: &Arc<SettingsSnapshot>,
        indicator: &mut Indicator,
    ) -> RequestDecision {
        if let Some(in_flight) = &self.in_flight {
            if trigger == RefreshTrigger::Timer {
                debug!(cycle = in_flight.id, "Timer tick during refresh, skipping");
                return RequestDecision::Dropped;
            }
            debug!(cycle = in_flight.id, ?trigger, "Refresh queued behind in-flight cycle");
            self.pending = Some(trigger);
            return RequestDecision::Queued;
        }

        if !snapshot.has_credentials() {
            info!("Missing Jira URL, email or token");
            indicator.show_error(CONFIGURATION_REQUIRED, None);
            return RequestDecision::ConfigurationRequired;
        }

        if trigger.shows_loading() {
            indicator.show_loading();
        }

        let cycle_id = self.next_cycle_id;
        self.next_cycle_id += 1;

        let query = Arc::clone(&self.query);
        let snapshot = Arc::clone(snapshot);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let result = query.search_issues(&snapshot).await;
            // The receiver is gone only during teardown.
            let _ = tx.send(CycleOutcome { cycle_id, result });
        });

        debug!(cycle = cycle_id, ?trigger, "Poll cycle started");
        self.in_flight = Some(InFlight {
            id: cycle_id,
            trigger,
            started_at: Instant::now(),
            handle,
        });
        RequestDecision::Started(cycle_id)
    }

    /// Apply a cycle outcome to the indicator.
    ///
    /// Returns the queued follow-up trigger, which the caller should pass
    /// straight back to [`request`](Self::request).
    pub fn complete(
        &mut self,
        outcome: CycleOutcome,
        indicator: &mut Indicator,
    ) -> Option<RefreshTrigger> {
        let in_flight = match self.in_flight.take() {
            Some(in_flight) if in_flight.id == outcome.cycle_id => in_flight,
            other => {
                warn!(cycle = outcome.cycle_id, "Ignoring outcome of unknown cycle");
                self.in_flight = other;
                return None;
            }
        };

        let elapsed_ms = in_flight.started_at.elapsed().as_millis();
        match outcome.result {
            Ok(issues) => {
                debug!(
                    cycle = in_flight.id,
                    trigger = ?in_flight.trigger,
                    elapsed_ms,
                    count = issues.len(),
                    "Poll cycle succeeded"
                );
                indicator.update_issue(issues.into_iter().next());
            }
            Err(err) => {
                let message = err.to_string();
                let category = ErrorCategory::classify(&message);
                warn!(
                    cycle = in_flight.id,
                    elapsed_ms,
                    category = category.label(),
                    status = ?err.status(),
                    error = %message,
                    "Poll cycle failed"
                );
                indicator.show_error(category.label(), Some(message));
            }
        }

        self.pending.take()
    }

    /// Abort any in-flight request and forget queued work.
    pub fn shutdown(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            debug!(cycle = in_flight.id, "Aborting in-flight request");
            in_flight.handle.abort();
        }
        self.pending = None;
    }
}

impl Drop for RefreshOrchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, IssueFields, Named};
    use crate::indicator::{IndicatorState, StateKind};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Scripted query; optionally blocks each call until the gate opens.
    #[derive(Default)]
    struct FakeQuery {
        calls: AtomicUsize,
        responses: Mutex<VecDeque<api::Result<Vec<Issue>>>>,
        gate: Option<Arc<Notify>>,
    }

    impl FakeQuery {
        fn with_responses(responses: Vec<api::Result<Vec<Issue>>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Self::default()
            }
        }

        fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IssueQuery for FakeQuery {
        async fn search_issues(&self, _snapshot: &SettingsSnapshot) -> api::Result<Vec<Issue>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Vec::new()))
        }
    }

    fn snapshot() -> Arc<SettingsSnapshot> {
        Arc::new(SettingsSnapshot {
            jira_url: "x.atlassian.net".to_string(),
            jira_email: "a@b.com".to_string(),
            jira_token: "t".to_string(),
            jql_query: "assignee=currentUser()".to_string(),
            ..SettingsSnapshot::default()
        })
    }

    fn proj_1() -> Issue {
        Issue {
            key: "PROJ-1".to_string(),
            fields: IssueFields {
                summary: Some("Fix bug".to_string()),
                status: Some(Named::new("Open")),
                issuetype: Some(Named::new("Bug")),
                ..IssueFields::default()
            },
        }
    }

    struct Harness {
        query: Arc<FakeQuery>,
        orchestrator: RefreshOrchestrator,
        outcomes: mpsc::UnboundedReceiver<CycleOutcome>,
        indicator: Indicator,
        snapshot: Arc<SettingsSnapshot>,
    }

    impl Harness {
        fn new(query: FakeQuery) -> Self {
            Self::with_snapshot(query, snapshot())
        }

        fn with_snapshot(query: FakeQuery, snapshot: Arc<SettingsSnapshot>) -> Self {
            let query = Arc::new(query);
            let (orchestrator, outcomes) =
                RefreshOrchestrator::new(Arc::clone(&query) as Arc<dyn IssueQuery>);
            Self {
                query,
                orchestrator,
                outcomes,
                indicator: Indicator::new(Arc::clone(&snapshot)),
                snapshot,
            }
        }

        fn request(&mut self, trigger: RefreshTrigger) -> RequestDecision {
            self.orchestrator
                .request(trigger, &self.snapshot, &mut self.indicator)
        }

        async fn finish_cycle(&mut self) -> Option<RefreshTrigger> {
            let outcome = self.outcomes.recv().await.unwrap();
            self.orchestrator.complete(outcome, &mut self.indicator)
        }
    }

    #[test]
    fn test_classify_keyword_groups() {
        let cases = [
            ("Authentication failed. Please check your Jira token.", "Authentication Error"),
            ("401 Unauthorized", "Authentication Error"),
            ("Access denied (403 Forbidden). Please check your permissions.", "Access Denied"),
            ("Jira instance not found. Please check your URL.", "Jira Not Found"),
            ("Network connection failed: error sending request", "Connection Error"),
            ("operation TIMEOUT", "Connection Error"),
            ("Failed to parse response: expected value", "Response Error"),
            ("invalid JSON", "Response Error"),
            ("Invalid request: Error in the JQL Query", "Query Error"),
            ("Jira URL, email, and token must be configured", "Configuration Error"),
            ("Request failed: HTTP 500", "Request Error"),
            ("", "Request Error"),
        ];
        for (message, label) in cases {
            assert_eq!(ErrorCategory::classify(message).label(), label, "{}", message);
        }
    }

    #[test]
    fn test_classify_uses_first_matching_group() {
        // Mentions both a connection and authentication; authentication wins.
        assert_eq!(
            ErrorCategory::classify("connection refused during authentication"),
            ErrorCategory::Authentication
        );
    }

    #[test]
    fn test_every_api_error_maps_to_its_label() {
        let cases = [
            (ApiError::Unauthorized, "Authentication Error"),
            (ApiError::Forbidden, "Access Denied"),
            (ApiError::NotFound, "Jira Not Found"),
            (ApiError::Connection("dns error".to_string()), "Connection Error"),
            (ApiError::ResponseParse("eof".to_string()), "Response Error"),
            (
                ApiError::BadRequest("Error in the JQL Query".to_string()),
                "Query Error",
            ),
            (ApiError::Configuration, "Configuration Error"),
            (
                ApiError::Http {
                    status: 500,
                    detail: "HTTP 500".to_string(),
                },
                "Request Error",
            ),
        ];
        for (err, label) in cases {
            assert_eq!(ErrorCategory::classify(&err.to_string()).label(), label);
        }
    }

    #[test]
    fn test_only_timer_suppresses_loading() {
        assert!(!RefreshTrigger::Timer.shows_loading());
        assert!(RefreshTrigger::Manual.shows_loading());
        assert!(RefreshTrigger::Settings.shows_loading());
        assert!(RefreshTrigger::Startup.shows_loading());
    }

    #[tokio::test]
    async fn test_first_issue_is_displayed() {
        let mut h = Harness::new(FakeQuery::with_responses(vec![Ok(vec![proj_1()])]));

        assert_eq!(h.request(RefreshTrigger::Manual), RequestDecision::Started(1));
        assert_eq!(h.finish_cycle().await, None);

        assert_eq!(h.indicator.view().text, "PROJ-1: Fix bug");
        assert!(!h.orchestrator.is_in_flight());
    }

    #[tokio::test]
    async fn test_only_first_of_many_issues_is_rendered() {
        let mut h = Harness::new(FakeQuery::with_responses(vec![Ok(vec![
            proj_1(),
            Issue::new("PROJ-2", "Second"),
            Issue::new("PROJ-3", "Third"),
        ])]));

        h.request(RefreshTrigger::Manual);
        h.finish_cycle().await;

        assert_eq!(
            h.indicator.current_issue().map(|i| i.key.as_str()),
            Some("PROJ-1")
        );
    }

    #[tokio::test]
    async fn test_empty_result_shows_no_issues() {
        let mut h = Harness::new(FakeQuery::with_responses(vec![Ok(Vec::new())]));

        h.request(RefreshTrigger::Manual);
        h.finish_cycle().await;

        assert_eq!(
            h.indicator.state(),
            &IndicatorState::NoIssues {
                text: "No issues".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unauthorized_shows_authentication_error() {
        let mut h = Harness::new(FakeQuery::with_responses(vec![Err(ApiError::Unauthorized)]));

        h.request(RefreshTrigger::Manual);
        h.finish_cycle().await;

        assert_eq!(
            h.indicator.state(),
            &IndicatorState::Error {
                message: "Authentication Error".to_string(),
                details: "Authentication failed. Please check your Jira token.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_missing_credentials_short_circuit() {
        let base = snapshot();
        let missing = [
            SettingsSnapshot {
                jira_url: String::new(),
                ..(*base).clone()
            },
            SettingsSnapshot {
                jira_email: String::new(),
                ..(*base).clone()
            },
            SettingsSnapshot {
                jira_token: String::new(),
                ..(*base).clone()
            },
            SettingsSnapshot {
                jira_url: String::new(),
                jira_email: String::new(),
                jira_token: String::new(),
                ..(*base).clone()
            },
        ];

        for snapshot in missing {
            let mut h = Harness::with_snapshot(FakeQuery::default(), Arc::new(snapshot));
            h.indicator.update_issue(Some(proj_1()));

            assert_eq!(
                h.request(RefreshTrigger::Manual),
                RequestDecision::ConfigurationRequired
            );
            assert_eq!(
                h.indicator.state(),
                &IndicatorState::Error {
                    message: CONFIGURATION_REQUIRED.to_string(),
                    details: CONFIGURATION_REQUIRED.to_string()
                }
            );
            assert!(!h.orchestrator.is_in_flight());
            tokio::task::yield_now().await;
            assert_eq!(h.query.calls(), 0);
            assert!(h.outcomes.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_manual_refresh_shows_loading_first() {
        let mut h = Harness::new(FakeQuery::with_responses(vec![Ok(vec![proj_1()])]));
        h.indicator.update_issue(None);

        h.request(RefreshTrigger::Manual);
        assert_eq!(h.indicator.state(), &IndicatorState::Loading);

        h.finish_cycle().await;
        assert_eq!(h.indicator.state().kind(), StateKind::Issue);
    }

    #[tokio::test]
    async fn test_settings_refresh_shows_loading_first() {
        let mut h = Harness::new(FakeQuery::with_responses(vec![Ok(Vec::new())]));
        h.indicator.update_issue(Some(proj_1()));

        h.request(RefreshTrigger::Settings);
        assert_eq!(h.indicator.state(), &IndicatorState::Loading);

        h.finish_cycle().await;
        assert_eq!(h.indicator.state().kind(), StateKind::NoIssues);
    }

    #[tokio::test]
    async fn test_timer_refresh_skips_loading() {
        let mut h = Harness::new(FakeQuery::with_responses(vec![Ok(vec![proj_1()])]));
        h.indicator.update_issue(None);

        h.request(RefreshTrigger::Timer);
        assert_eq!(h.indicator.state().kind(), StateKind::NoIssues);

        h.finish_cycle().await;
        assert_eq!(h.indicator.state().kind(), StateKind::Issue);
    }

    #[tokio::test]
    async fn test_timer_tick_dropped_while_in_flight() {
        let gate = Arc::new(Notify::new());
        let mut h = Harness::new(
            FakeQuery::with_responses(vec![Ok(vec![proj_1()])]).gated(Arc::clone(&gate)),
        );

        assert_eq!(h.request(RefreshTrigger::Startup), RequestDecision::Started(1));
        assert_eq!(h.request(RefreshTrigger::Timer), RequestDecision::Dropped);
        assert_eq!(h.orchestrator.pending(), None);

        gate.notify_one();
        assert_eq!(h.finish_cycle().await, None);
        assert_eq!(h.query.calls(), 1);
    }

    #[tokio::test]
    async fn test_manual_triggers_collapse_into_one_follow_up() {
        let gate = Arc::new(Notify::new());
        let mut h = Harness::new(
            FakeQuery::with_responses(vec![Ok(vec![proj_1()]), Ok(Vec::new())])
                .gated(Arc::clone(&gate)),
        );

        assert_eq!(h.request(RefreshTrigger::Manual), RequestDecision::Started(1));
        assert_eq!(h.request(RefreshTrigger::Settings), RequestDecision::Queued);
        assert_eq!(h.request(RefreshTrigger::Settings), RequestDecision::Queued);
        assert_eq!(h.request(RefreshTrigger::Manual), RequestDecision::Queued);
        assert_eq!(h.request(RefreshTrigger::Timer), RequestDecision::Dropped);

        gate.notify_one();
        let follow_up = h.finish_cycle().await;
        assert_eq!(follow_up, Some(RefreshTrigger::Manual));
        assert_eq!(h.indicator.state().kind(), StateKind::Issue);

        assert_eq!(h.request(follow_up.unwrap()), RequestDecision::Started(2));
        assert_eq!(h.indicator.state(), &IndicatorState::Loading);

        gate.notify_one();
        assert_eq!(h.finish_cycle().await, None);
        assert_eq!(h.indicator.state().kind(), StateKind::NoIssues);
        assert_eq!(h.query.calls(), 2);
    }

    #[tokio::test]
    async fn test_outcome_for_unknown_cycle_is_ignored() {
        let mut h = Harness::new(FakeQuery::default());
        h.indicator.update_issue(None);

        let follow_up = h.orchestrator.complete(
            CycleOutcome {
                cycle_id: 42,
                result: Err(ApiError::Forbidden),
            },
            &mut h.indicator,
        );

        assert_eq!(follow_up, None);
        assert_eq!(h.indicator.state().kind(), StateKind::NoIssues);
    }

    #[tokio::test]
    async fn test_shutdown_aborts_in_flight_request() {
        let gate = Arc::new(Notify::new());
        let mut h = Harness::new(FakeQuery::default().gated(Arc::clone(&gate)));

        h.request(RefreshTrigger::Manual);
        h.request(RefreshTrigger::Manual);
        tokio::task::yield_now().await;

        h.orchestrator.shutdown();
        assert!(!h.orchestrator.is_in_flight());
        assert_eq!(h.orchestrator.pending(), None);

        drop(h.orchestrator);
        assert!(h.outcomes.recv().await.is_none());
    }
}

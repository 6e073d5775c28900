//! The panel indicator state machine.
//!
//! The [`Indicator`] owns what the panel currently shows. It has no toolkit
//! dependency: it produces an [`IndicatorView`] describing what to render and
//! turns clicks and menu activations into [`IndicatorAction`]s that the
//! lifecycle controller carries out.
//!
//! States are fully connected: `Loading`, `Issue`, `NoIssues` and `Error` can
//! each follow any other, driven only by [`Indicator::show_loading`],
//! [`Indicator::update_issue`] and [`Indicator::show_error`].

use std::sync::Arc;

use tracing::debug;

use crate::api::Issue;
use crate::config::SettingsSnapshot;
use crate::format::format_issue;

/// Label shown while a refresh is running.
pub const LOADING_TEXT: &str = "Loading...";

/// Title of the error details dialog.
pub const ERROR_DIALOG_TITLE: &str = "Jira Panel Error";

/// The display state of the indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorState {
    /// A refresh is in progress (also the initial state).
    Loading,
    /// An issue is displayed with its formatted label.
    Issue { issue: Issue, text: String },
    /// The query matched nothing.
    NoIssues { text: String },
    /// The last refresh failed.
    Error { message: String, details: String },
}

impl IndicatorState {
    /// The kind of this state, without payload.
    pub fn kind(&self) -> StateKind {
        match self {
            IndicatorState::Loading => StateKind::Loading,
            IndicatorState::Issue { .. } => StateKind::Issue,
            IndicatorState::NoIssues { .. } => StateKind::NoIssues,
            IndicatorState::Error { .. } => StateKind::Error,
        }
    }
}

/// Payload-free discriminant of [`IndicatorState`], used for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Loading,
    Issue,
    NoIssues,
    Error,
}

impl StateKind {
    /// Style class name.
    pub fn as_str(self) -> &'static str {
        match self {
            StateKind::Loading => "loading",
            StateKind::Issue => "issue",
            StateKind::NoIssues => "no-issues",
            StateKind::Error => "error",
        }
    }
}

/// What the panel adapter should draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorView {
    /// The label text.
    pub text: String,
    /// The state the label belongs to.
    pub kind: StateKind,
}

/// Mouse buttons the indicator reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickButton {
    Primary,
    Secondary,
}

/// Entries of the indicator's action menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Refresh,
    OpenIssue,
    ShowAllIssues,
    Separator,
    Settings,
}

impl MenuItem {
    /// The menu label.
    pub fn label(self) -> &'static str {
        match self {
            MenuItem::Refresh => "Refresh",
            MenuItem::OpenIssue => "Open Issue",
            MenuItem::ShowAllIssues => "Show All Issues",
            MenuItem::Separator => "",
            MenuItem::Settings => "Settings",
        }
    }

    /// Whether the item can be activated.
    pub fn is_selectable(self) -> bool {
        !matches!(self, MenuItem::Separator)
    }
}

/// Something the lifecycle controller should do in response to user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorAction {
    /// Request a user-initiated refresh.
    Refresh,
    /// Open a URL in the default browser.
    OpenUrl(String),
    /// Show the full error details.
    ShowErrorDetails { title: String, details: String },
    /// Open the settings.
    OpenSettings,
    /// Open or close the action menu.
    ToggleMenu,
    /// Nothing to do.
    None,
}

/// The panel indicator.
#[derive(Debug)]
pub struct Indicator {
    state: IndicatorState,
    snapshot: Arc<SettingsSnapshot>,
}

impl Indicator {
    /// Create an indicator in the `Loading` state.
    pub fn new(snapshot: Arc<SettingsSnapshot>) -> Self {
        Self {
            state: IndicatorState::Loading,
            snapshot,
        }
    }

    /// Replace the settings snapshot.
    ///
    /// The current label is kept; it is re-rendered on the next update.
    pub fn set_snapshot(&mut self, snapshot: Arc<SettingsSnapshot>) {
        self.snapshot = snapshot;
    }

    /// The current state.
    pub fn state(&self) -> &IndicatorState {
        &self.state
    }

    /// The displayed issue, if any.
    pub fn current_issue(&self) -> Option<&Issue> {
        match &self.state {
            IndicatorState::Issue { issue, .. } => Some(issue),
            _ => None,
        }
    }

    /// Switch to `Loading`.
    pub fn show_loading(&mut self) {
        self.transition(IndicatorState::Loading);
    }

    /// Show an issue, or the empty-state text when `None`.
    pub fn update_issue(&mut self, issue: Option<Issue>) {
        let state = match issue {
            Some(issue) => {
                let text = format_issue(&issue, &self.snapshot.issue_format);
                IndicatorState::Issue { issue, text }
            }
            None => IndicatorState::NoIssues {
                text: self.snapshot.no_issues_text.clone(),
            },
        };
        self.transition(state);
    }

    /// Show an error. `details` defaults to the short message.
    pub fn show_error(&mut self, message: impl Into<String>, details: Option<String>) {
        let message = message.into();
        let details = details.unwrap_or_else(|| message.clone());
        self.transition(IndicatorState::Error { message, details });
    }

    fn transition(&mut self, state: IndicatorState) {
        debug!(
            from = self.state.kind().as_str(),
            to = state.kind().as_str(),
            "Indicator state change"
        );
        self.state = state;
    }

    /// Describe what to render.
    pub fn view(&self) -> IndicatorView {
        let text = match &self.state {
            IndicatorState::Loading => LOADING_TEXT.to_string(),
            IndicatorState::Issue { text, .. } | IndicatorState::NoIssues { text } => text.clone(),
            IndicatorState::Error { message, .. } => message.clone(),
        };
        IndicatorView {
            text,
            kind: self.state.kind(),
        }
    }

    /// Dispatch a click on the indicator.
    ///
    /// Primary clicks depend on the state; secondary clicks always toggle the
    /// action menu.
    pub fn click(&self, button: ClickButton) -> IndicatorAction {
        match button {
            ClickButton::Secondary => IndicatorAction::ToggleMenu,
            ClickButton::Primary => match &self.state {
                IndicatorState::Issue { issue, .. } => self.open_issue_action(issue),
                IndicatorState::NoIssues { .. } | IndicatorState::Loading => self.homepage_action(),
                IndicatorState::Error { details, .. } => IndicatorAction::ShowErrorDetails {
                    title: ERROR_DIALOG_TITLE.to_string(),
                    details: details.clone(),
                },
            },
        }
    }

    /// The action menu entries for the current state.
    pub fn menu_items(&self) -> Vec<MenuItem> {
        let mut items = vec![MenuItem::Refresh];
        if self.current_issue().is_some() {
            items.push(MenuItem::OpenIssue);
        }
        items.extend([MenuItem::ShowAllIssues, MenuItem::Separator, MenuItem::Settings]);
        items
    }

    /// Activate a menu entry.
    pub fn activate(&self, item: MenuItem) -> IndicatorAction {
        match item {
            MenuItem::Refresh => IndicatorAction::Refresh,
            MenuItem::OpenIssue => match self.current_issue() {
                Some(issue) => self.open_issue_action(issue),
                None => IndicatorAction::None,
            },
            MenuItem::ShowAllIssues => self.homepage_action(),
            MenuItem::Settings => IndicatorAction::OpenSettings,
            MenuItem::Separator => IndicatorAction::None,
        }
    }

    fn open_issue_action(&self, issue: &Issue) -> IndicatorAction {
        self.snapshot
            .issue_url(&issue.key)
            .map_or(IndicatorAction::None, IndicatorAction::OpenUrl)
    }

    fn homepage_action(&self) -> IndicatorAction {
        self.snapshot
            .homepage()
            .map_or(IndicatorAction::None, IndicatorAction::OpenUrl)
    }
}

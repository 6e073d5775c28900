//! Panel lifecycle and event loop.
//!
//! [`App`] owns everything the panel needs at runtime: the settings store,
//! the current [`SettingsSnapshot`], the indicator, the refresh orchestrator
//! and the poll timer. All of it lives on a single task; background work only
//! ever reports back through channels that [`App::step`] selects over.

use std::sync::Arc;

use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::{backend::Backend, layout::Rect, Frame, Terminal};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::api::{auth, IssueQuery};
use crate::config::{
    ConfigWatcher, PanelPosition, SettingGroup, SettingKey, SettingsSnapshot, SettingsStore,
};
use crate::error::Result;
use crate::events::{Command, Event, KeyBindings};
use crate::indicator::{ClickButton, Indicator, IndicatorAction, MenuItem};
use crate::opener::UrlOpener;
use crate::orchestrator::{CycleOutcome, RefreshOrchestrator, RefreshTrigger, RequestDecision};
use crate::ui::{ActionMenu, ErrorDialog, Panel, PanelItem, Theme};

/// Panel item id of the indicator.
pub const INDICATOR_ID: &str = "jira-panel";

/// Screen size assumed until the terminal reports one.
const DEFAULT_SCREEN: Rect = Rect {
    x: 0,
    y: 0,
    width: 80,
    height: 24,
};

/// Looks up a token for an account email when none is configured.
pub type TokenLookup = fn(&str) -> Option<String>;

/// Token lookup backed by the OS keyring.
pub fn keyring_token(email: &str) -> Option<String> {
    match auth::get_token(email) {
        Ok(token) => Some(token),
        Err(e) => {
            debug!(error = %e, "No token in keyring");
            None
        }
    }
}

/// The panel application.
pub struct App {
    store: SettingsStore,
    settings_rx: mpsc::UnboundedReceiver<SettingKey>,
    token_lookup: TokenLookup,
    snapshot: Arc<SettingsSnapshot>,
    orchestrator: RefreshOrchestrator,
    outcomes: mpsc::UnboundedReceiver<CycleOutcome>,
    /// `None` once torn down.
    indicator: Option<Indicator>,
    panel: Panel,
    attached: Option<PanelPosition>,
    poll_timer: Option<Interval>,
    menu: ActionMenu,
    dialog: ErrorDialog,
    opener: Box<dyn UrlOpener>,
    keys: KeyBindings,
    theme: Theme,
    screen: Rect,
    should_quit: bool,
}

impl App {
    /// Create the application. Nothing is attached until [`start`](Self::start).
    pub fn new(
        store: SettingsStore,
        settings_rx: mpsc::UnboundedReceiver<SettingKey>,
        query: Arc<dyn IssueQuery>,
        opener: Box<dyn UrlOpener>,
        token_lookup: TokenLookup,
    ) -> Self {
        let snapshot = Arc::new(store.snapshot().with_token_fallback(token_lookup));
        let (orchestrator, outcomes) = RefreshOrchestrator::new(query);
        let theme = Theme::default();

        Self {
            store,
            settings_rx,
            token_lookup,
            indicator: Some(Indicator::new(Arc::clone(&snapshot))),
            snapshot,
            orchestrator,
            outcomes,
            panel: Panel::new(&theme),
            attached: None,
            poll_timer: None,
            menu: ActionMenu::new(),
            dialog: ErrorDialog::new(),
            opener,
            keys: KeyBindings::default(),
            theme,
            screen: DEFAULT_SCREEN,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// The indicator, until teardown.
    pub fn indicator(&self) -> Option<&Indicator> {
        self.indicator.as_ref()
    }

    pub fn snapshot(&self) -> &Arc<SettingsSnapshot> {
        &self.snapshot
    }

    pub fn panel(&self) -> &Panel {
        &self.panel
    }

    /// Where the indicator is attached, if it is.
    pub fn attached_position(&self) -> Option<PanelPosition> {
        self.attached
    }

    /// Attach the indicator, start polling and run the startup refresh.
    pub fn start(&mut self) {
        info!(position = %self.snapshot.panel_position, "Starting panel");
        self.attach();
        self.start_timer();
        self.request_refresh(RefreshTrigger::Startup);
    }

    /// The single entry point for refreshes.
    pub fn request_refresh(&mut self, trigger: RefreshTrigger) -> Option<RequestDecision> {
        let indicator = self.indicator.as_mut()?;
        let decision = self.orchestrator.request(trigger, &self.snapshot, indicator);
        trace!(?trigger, ?decision, "Refresh requested");
        self.sync_label();
        Some(decision)
    }

    /// Apply a finished poll cycle and start the queued follow-up, if any.
    pub fn handle_outcome(&mut self, outcome: CycleOutcome) {
        let Some(indicator) = self.indicator.as_mut() else {
            return;
        };
        let follow_up = self.orchestrator.complete(outcome, indicator);
        self.sync_label();
        if let Some(trigger) = follow_up {
            self.request_refresh(trigger);
        }
    }

    /// React to a batch of changed settings keys.
    ///
    /// The snapshot is rebuilt once, then each affected concern is updated
    /// once regardless of how many keys in the batch touch it.
    pub fn handle_settings_changed(&mut self, keys: &[SettingKey]) {
        if keys.is_empty() {
            return;
        }
        let groups: Vec<SettingGroup> = keys.iter().map(|k| k.group()).collect();
        debug!(?keys, "Settings changed");

        self.snapshot = Arc::new(self.store.snapshot().with_token_fallback(self.token_lookup));
        if let Some(indicator) = self.indicator.as_mut() {
            indicator.set_snapshot(Arc::clone(&self.snapshot));
        }

        if groups.contains(&SettingGroup::PanelPosition) {
            self.detach();
            self.attach();
        }
        if groups.contains(&SettingGroup::PollInterval) {
            self.start_timer();
        }
        if groups
            .iter()
            .any(|g| matches!(g, SettingGroup::Connection | SettingGroup::Display))
        {
            self.request_refresh(RefreshTrigger::Settings);
        }
    }

    /// Re-read the config file after an external edit.
    ///
    /// Changed keys arrive on the settings channel. An invalid file keeps
    /// the previous values.
    pub fn reload_config_file(&mut self) {
        if let Err(e) = self.store.reload() {
            warn!(error = %e, "Ignoring invalid config file");
        }
    }

    /// Handle one input event.
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => {
                trace!(key = ?key.code, modifiers = ?key.modifiers, "Key event");
                if let Some(command) = self.keys.command(key) {
                    self.handle_command(command);
                }
            }
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(width, height) => {
                trace!(width, height, "Terminal resize event");
                self.screen = Rect::new(0, 0, width, height);
                self.menu.hide();
            }
            Event::Tick => {}
        }
    }

    fn handle_command(&mut self, command: Command) {
        if command == Command::Quit {
            info!("Quit requested");
            self.should_quit = true;
            return;
        }

        // The error dialog blocks all other input.
        if self.dialog.is_visible() {
            if matches!(command, Command::Dismiss | Command::Activate) {
                self.dialog.dismiss();
            }
            return;
        }

        if self.menu.is_visible() {
            match command {
                Command::Up => self.menu.previous(),
                Command::Down => self.menu.next(),
                Command::Activate => {
                    if let Some(item) = self.menu.selected() {
                        self.activate_menu_item(item);
                    }
                }
                Command::Dismiss | Command::ToggleMenu => self.menu.hide(),
                Command::Refresh => {
                    self.menu.hide();
                    self.handle_action(IndicatorAction::Refresh);
                }
                Command::Quit => {}
            }
            return;
        }

        match command {
            Command::Refresh => self.handle_action(IndicatorAction::Refresh),
            Command::Activate => self.click(ClickButton::Primary),
            Command::ToggleMenu => self.handle_action(IndicatorAction::ToggleMenu),
            Command::Dismiss | Command::Up | Command::Down | Command::Quit => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let button = match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => ClickButton::Primary,
            MouseEventKind::Down(MouseButton::Right) => ClickButton::Secondary,
            _ => return,
        };
        let (column, row) = (mouse.column, mouse.row);

        if self.dialog.is_visible() {
            self.dialog.dismiss();
            return;
        }

        if self.menu.is_visible() {
            if let Some(item) = self.menu.hit_test(self.screen, column, row) {
                self.activate_menu_item(item);
                return;
            }
            // A click outside the popup only closes it.
            if !self.menu.contains(self.screen, column, row) {
                self.menu.hide();
            }
            return;
        }

        if self.panel.hit_test(self.screen, column, row) == Some(INDICATOR_ID) {
            self.click(button);
        }
    }

    fn click(&mut self, button: ClickButton) {
        let Some(indicator) = self.indicator.as_ref() else {
            return;
        };
        let action = indicator.click(button);
        debug!(?button, ?action, "Indicator clicked");
        self.handle_action(action);
    }

    fn activate_menu_item(&mut self, item: MenuItem) {
        self.menu.hide();
        let Some(indicator) = self.indicator.as_ref() else {
            return;
        };
        let action = indicator.activate(item);
        debug!(?item, ?action, "Menu item activated");
        self.handle_action(action);
    }

    /// Carry out an indicator action.
    pub fn handle_action(&mut self, action: IndicatorAction) {
        match action {
            IndicatorAction::Refresh => {
                self.request_refresh(RefreshTrigger::Manual);
            }
            IndicatorAction::OpenUrl(url) => {
                self.opener.open_url(&url);
            }
            IndicatorAction::ShowErrorDetails { title, details } => {
                self.dialog.show(title, details);
            }
            IndicatorAction::OpenSettings => {
                self.opener.open_path(self.store.path());
            }
            IndicatorAction::ToggleMenu => {
                let Some(indicator) = self.indicator.as_ref() else {
                    return;
                };
                let anchor = self
                    .panel
                    .item_area(self.screen, INDICATOR_ID)
                    .unwrap_or_default();
                self.menu.toggle(indicator.menu_items(), anchor);
            }
            IndicatorAction::None => {}
        }
    }

    fn attach(&mut self) {
        let Some(indicator) = self.indicator.as_ref() else {
            return;
        };
        let position = self.snapshot.panel_position;
        let view = indicator.view();
        let item = PanelItem::new(INDICATOR_ID, view.text, self.theme.indicator(view.kind));
        self.panel
            .insert_at(item, position, position.insertion_index());
        self.attached = Some(position);
        debug!(%position, "Indicator attached");
    }

    fn detach(&mut self) {
        self.menu.hide();
        if self.panel.remove(INDICATOR_ID).is_some() {
            debug!("Indicator detached");
        }
        self.attached = None;
    }

    fn start_timer(&mut self) {
        let period = self.snapshot.effective_poll_interval();
        let mut timer = time::interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.poll_timer = Some(timer);
        debug!(period_secs = period.as_secs(), "Poll timer started");
    }

    fn sync_label(&mut self) {
        if let Some(indicator) = self.indicator.as_ref() {
            let view = indicator.view();
            let style = self.theme.indicator(view.kind);
            self.panel.update(INDICATOR_ID, view.text, style);
        }
    }

    /// Wait for the next event source to fire and handle it.
    pub async fn step(
        &mut self,
        events: &mut mpsc::UnboundedReceiver<Event>,
        config_changes: &mut Option<mpsc::UnboundedReceiver<()>>,
    ) {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => self.handle_event(event),
                None => {
                    info!("Input closed");
                    self.should_quit = true;
                }
            },
            Some(outcome) = self.outcomes.recv() => self.handle_outcome(outcome),
            Some(key) = self.settings_rx.recv() => {
                let mut keys = vec![key];
                while let Ok(key) = self.settings_rx.try_recv() {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
                self.handle_settings_changed(&keys);
            }
            _ = next_poll(&mut self.poll_timer) => {
                self.request_refresh(RefreshTrigger::Timer);
            }
            changed = next_config_change(config_changes) => {
                if changed {
                    self.reload_config_file();
                } else {
                    debug!("Config watcher stopped");
                    *config_changes = None;
                }
            }
        }
    }

    /// Run the panel until the user quits, then tear it down.
    pub async fn run<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) -> Result<()> {
        self.start();

        let (_watcher, mut config_changes) = match ConfigWatcher::watch(self.store.path()) {
            Ok((watcher, rx)) => (Some(watcher), Some(rx)),
            Err(e) => {
                warn!(error = %e, "External config edits will not be picked up");
                (None, None)
            }
        };

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.view(frame)) {
                break Err(e.into());
            }
            if self.should_quit {
                break Ok(());
            }
            self.step(&mut events, &mut config_changes).await;
        };

        self.shutdown();
        result
    }

    /// Render the panel.
    pub fn view(&mut self, frame: &mut Frame) {
        self.screen = frame.area();
        self.panel.render(frame, self.screen, &self.theme);
        self.menu.render(frame, self.screen, &self.theme);
        self.dialog.render(frame, self.screen, &self.theme);
    }

    /// Tear down: stop the timer, abort the in-flight request and close its
    /// channel, detach the indicator, then drop it.
    pub fn shutdown(&mut self) {
        if self.indicator.is_none() {
            return;
        }
        info!("Shutting down panel");
        self.poll_timer = None;
        self.orchestrator.shutdown();
        self.outcomes.close();
        self.detach();
        self.indicator = None;
    }
}

/// Resolve on the next poll tick; never resolves while polling is stopped.
async fn next_poll(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Resolve once a burst of config file edits has settled, draining any that
/// queued up meanwhile. Resolves `false` when the watcher is gone; never
/// resolves without one.
async fn next_config_change(changes: &mut Option<mpsc::UnboundedReceiver<()>>) -> bool {
    match changes {
        Some(rx) => {
            if rx.recv().await.is_none() {
                return false;
            }
            while rx.try_recv().is_ok() {}
            true
        }
        None => std::future::pending().await,
    }
}

/// Run a single refresh against `query` and return the resulting indicator.
pub async fn poll_once(query: Arc<dyn IssueQuery>, snapshot: Arc<SettingsSnapshot>) -> Indicator {
    let mut indicator = Indicator::new(Arc::clone(&snapshot));
    let (mut orchestrator, mut outcomes) = RefreshOrchestrator::new(query);

    if let RequestDecision::Started(_) =
        orchestrator.request(RefreshTrigger::Manual, &snapshot, &mut indicator)
    {
        if let Some(outcome) = outcomes.recv().await {
            orchestrator.complete(outcome, &mut indicator);
        }
    }
    indicator
}

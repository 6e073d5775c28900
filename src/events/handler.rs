//! Event handler implementation.
//!
//! Polls for terminal events and converts them to application events.

use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEventKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::Event;

/// The tick rate for the event loop in milliseconds.
const TICK_RATE_MS: u64 = 250;

/// Handles application events by polling crossterm for terminal events.
#[derive(Debug, Clone, Copy)]
pub struct EventHandler {
    /// The tick rate duration.
    tick_rate: Duration,
}

impl EventHandler {
    /// Create a new event handler with the default tick rate.
    pub fn new() -> Self {
        Self {
            tick_rate: Duration::from_millis(TICK_RATE_MS),
        }
    }

    #[cfg(test)]
    fn with_tick_rate(tick_rate_ms: u64) -> Self {
        Self {
            tick_rate: Duration::from_millis(tick_rate_ms),
        }
    }

    /// Poll for the next event.
    ///
    /// This method blocks until an event is available or the tick rate elapses.
    /// Returns `Event::Tick` if no event occurred within the tick rate.
    pub fn next(&self) -> std::io::Result<Event> {
        if event::poll(self.tick_rate)? {
            Ok(convert(event::read()?))
        } else {
            Ok(Event::Tick)
        }
    }

    /// Read events on a background thread and forward them to the returned
    /// channel.
    ///
    /// The thread exits once the receiver is dropped or reading fails.
    pub fn spawn(self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        thread::spawn(move || loop {
            let event = match self.next() {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "Terminal input failed");
                    break;
                }
            };
            if tx.send(event).is_err() {
                debug!("Event receiver closed, stopping input thread");
                break;
            }
        });
        rx
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a crossterm event onto an application event.
fn convert(event: CrosstermEvent) -> Event {
    match event {
        // Key releases and repeats are reported on some platforms; only presses count.
        CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Event::Key(key),
        CrosstermEvent::Key(_) => Event::Tick,
        CrosstermEvent::Mouse(mouse) => Event::Mouse(mouse),
        CrosstermEvent::Resize(width, height) => Event::Resize(width, height),
        CrosstermEvent::FocusGained | CrosstermEvent::FocusLost | CrosstermEvent::Paste(_) => {
            Event::Tick
        }
    }
}

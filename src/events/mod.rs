//! Terminal input events.
//!
//! Input is read on a dedicated thread and forwarded to the async event loop.

mod handler;
mod keys;

pub use handler::EventHandler;
pub use keys::{Command, KeyBindings};

use crossterm::event::{KeyEvent, MouseEvent};

/// Events delivered by the [`EventHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A key press.
    Key(KeyEvent),
    /// A mouse click or movement.
    Mouse(MouseEvent),
    /// The terminal was resized.
    Resize(u16, u16),
    /// No input within the tick rate.
    Tick,
}

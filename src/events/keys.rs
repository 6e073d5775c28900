//! Key binding definitions.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What a key press asks the panel to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Refresh,
    /// Same as a primary click on the indicator, or activate the selected menu entry.
    Activate,
    ToggleMenu,
    /// Close the open popup.
    Dismiss,
    Up,
    Down,
}

/// Key binding configuration.
#[derive(Debug, Clone, Copy)]
pub struct KeyBindings {
    /// Whether vim-style bindings are enabled.
    pub vim_mode: bool,
}

impl KeyBindings {
    /// Create new key bindings.
    pub fn new(vim_mode: bool) -> Self {
        Self { vim_mode }
    }

    /// Resolve a key press.
    pub fn command(&self, key: KeyEvent) -> Option<Command> {
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Command::Quit),
            (KeyCode::Char('q'), KeyModifiers::NONE) => Some(Command::Quit),
            (KeyCode::Char('r'), KeyModifiers::NONE) | (KeyCode::F(5), _) => {
                Some(Command::Refresh)
            }
            (KeyCode::Enter, _) | (KeyCode::Char(' '), KeyModifiers::NONE) => {
                Some(Command::Activate)
            }
            (KeyCode::Char('m'), KeyModifiers::NONE) => Some(Command::ToggleMenu),
            (KeyCode::Esc, _) => Some(Command::Dismiss),
            (KeyCode::Up, _) => Some(Command::Up),
            (KeyCode::Down, _) => Some(Command::Down),
            (KeyCode::Char('k'), KeyModifiers::NONE) if self.vim_mode => Some(Command::Up),
            (KeyCode::Char('j'), KeyModifiers::NONE) if self.vim_mode => Some(Command::Down),
            _ => None,
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new(true)
    }
}

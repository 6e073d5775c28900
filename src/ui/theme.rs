//! Theme and styling configuration.

use ratatui::style::{Color, Modifier, Style};

use crate::indicator::StateKind;

/// Color theme for the panel.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    /// Primary foreground color.
    pub fg: Color,
    /// Bar background color.
    pub bg: Color,
    /// Highlight color for selected items.
    pub highlight: Color,
    /// Color of the error label and dialog border.
    pub error: Color,
    /// Color of dimmed text.
    pub muted: Color,
}

impl Theme {
    /// The bar background style.
    pub fn bar(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    /// The indicator label style for a state.
    pub fn indicator(&self, kind: StateKind) -> Style {
        let base = self.bar();
        match kind {
            StateKind::Loading => base.fg(self.muted).add_modifier(Modifier::ITALIC),
            StateKind::Issue => base.add_modifier(Modifier::BOLD),
            StateKind::NoIssues => base.fg(self.muted),
            StateKind::Error => base.fg(self.error).add_modifier(Modifier::BOLD),
        }
    }

    /// The style of the selected menu entry.
    pub fn selected(&self) -> Style {
        Style::default()
            .fg(Color::White)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: Color::White,
            bg: Color::Black,
            highlight: Color::Cyan,
            error: Color::Red,
            muted: Color::Gray,
        }
    }
}

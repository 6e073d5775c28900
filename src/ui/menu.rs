//! The indicator's action menu popup.

use ratatui::{
    layout::Rect,
    style::Style,
    text::Line,
    widgets::{Block, Borders, Clear, List, ListItem, ListState},
    Frame,
};

use crate::indicator::MenuItem;

use super::theme::Theme;

/// A popup listing the indicator's menu entries below its label.
#[derive(Debug, Clone, Default)]
pub struct ActionMenu {
    items: Vec<MenuItem>,
    selected: usize,
    anchor: Rect,
    visible: bool,
}

impl ActionMenu {
    /// Create a hidden menu.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the menu under `anchor` with the first selectable entry selected.
    pub fn show(&mut self, items: Vec<MenuItem>, anchor: Rect) {
        self.selected = items.iter().position(|i| i.is_selectable()).unwrap_or(0);
        self.items = items;
        self.anchor = anchor;
        self.visible = true;
    }

    /// Close the menu.
    pub fn hide(&mut self) {
        self.visible = false;
    }

    /// Open the menu if closed, close it if open.
    pub fn toggle(&mut self, items: Vec<MenuItem>, anchor: Rect) {
        if self.visible {
            self.hide();
        } else {
            self.show(items, anchor);
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    /// The highlighted entry.
    pub fn selected(&self) -> Option<MenuItem> {
        self.items.get(self.selected).copied()
    }

    /// Move the highlight down, skipping separators and wrapping around.
    pub fn next(&mut self) {
        self.step(1);
    }

    /// Move the highlight up, skipping separators and wrapping around.
    pub fn previous(&mut self) {
        self.step(self.items.len().saturating_sub(1));
    }

    fn step(&mut self, offset: usize) {
        let len = self.items.len();
        if len == 0 {
            return;
        }
        let mut index = self.selected;
        for _ in 0..len {
            index = (index + offset) % len;
            if self.items[index].is_selectable() {
                self.selected = index;
                return;
            }
        }
    }

    /// The popup area, clamped to `screen`.
    pub fn area(&self, screen: Rect) -> Rect {
        let label_width = self
            .items
            .iter()
            .map(|i| i.label().len())
            .max()
            .unwrap_or(0);
        let width = u16::try_from(label_width + 4)
            .unwrap_or(u16::MAX)
            .min(screen.width);
        let height = u16::try_from(self.items.len() + 2)
            .unwrap_or(u16::MAX)
            .min(screen.height.saturating_sub(1));

        let x = self.anchor.x.min(screen.right().saturating_sub(width));
        let y = self.anchor.bottom();
        Rect::new(x, y, width, height)
    }

    /// The selectable entry at a screen cell.
    pub fn hit_test(&self, screen: Rect, column: u16, row: u16) -> Option<MenuItem> {
        if !self.visible {
            return None;
        }
        let inner = Block::default().borders(Borders::ALL).inner(self.area(screen));
        if column < inner.x || column >= inner.right() || row < inner.y || row >= inner.bottom() {
            return None;
        }
        self.items
            .get(usize::from(row - inner.y))
            .copied()
            .filter(|i| i.is_selectable())
    }

    /// Whether a screen cell lies inside the popup.
    pub fn contains(&self, screen: Rect, column: u16, row: u16) -> bool {
        let area = self.area(screen);
        self.visible
            && column >= area.x
            && column < area.right()
            && row >= area.y
            && row < area.bottom()
    }

    /// Render the popup.
    pub fn render(&self, frame: &mut Frame, screen: Rect, theme: &Theme) {
        if !self.visible {
            return;
        }
        let area = self.area(screen);
        frame.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.highlight));
        let inner_width = usize::from(block.inner(area).width);

        let entries: Vec<ListItem> = self
            .items
            .iter()
            .map(|item| match item {
                MenuItem::Separator => ListItem::new(Line::styled(
                    "─".repeat(inner_width),
                    Style::default().fg(theme.muted),
                )),
                _ => ListItem::new(format!(" {}", item.label())),
            })
            .collect();

        let list = List::new(entries)
            .block(block)
            .highlight_style(theme.selected());
        let mut state = ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<MenuItem> {
        vec![
            MenuItem::Refresh,
            MenuItem::OpenIssue,
            MenuItem::ShowAllIssues,
            MenuItem::Separator,
            MenuItem::Settings,
        ]
    }

    fn anchor() -> Rect {
        Rect::new(10, 0, 12, 1)
    }

    #[test]
    fn test_toggle() {
        let mut menu = ActionMenu::new();
        assert!(!menu.is_visible());
        menu.toggle(items(), anchor());
        assert!(menu.is_visible());
        assert_eq!(menu.selected(), Some(MenuItem::Refresh));
        menu.toggle(items(), anchor());
        assert!(!menu.is_visible());
    }

    #[test]
    fn test_navigation_skips_separator_and_wraps() {
        let mut menu = ActionMenu::new();
        menu.show(items(), anchor());

        menu.next();
        menu.next();
        assert_eq!(menu.selected(), Some(MenuItem::ShowAllIssues));
        menu.next();
        assert_eq!(menu.selected(), Some(MenuItem::Settings));
        menu.next();
        assert_eq!(menu.selected(), Some(MenuItem::Refresh));
        menu.previous();
        assert_eq!(menu.selected(), Some(MenuItem::Settings));
        menu.previous();
        assert_eq!(menu.selected(), Some(MenuItem::ShowAllIssues));
    }

    #[test]
    fn test_area_below_anchor_and_clamped() {
        let mut menu = ActionMenu::new();
        let screen = Rect::new(0, 0, 30, 20);
        menu.show(items(), Rect::new(25, 0, 5, 1));

        let area = menu.area(screen);
        // "Show All Issues" is the longest label.
        assert_eq!(area.width, 19);
        assert_eq!(area.height, 7);
        assert_eq!(area.y, 1);
        assert_eq!(area.right(), 30);
    }

    #[test]
    fn test_hit_test_rows() {
        let mut menu = ActionMenu::new();
        let screen = Rect::new(0, 0, 80, 20);
        menu.show(items(), anchor());

        // Border at row 1, first entry at row 2.
        assert_eq!(menu.hit_test(screen, 12, 2), Some(MenuItem::Refresh));
        assert_eq!(menu.hit_test(screen, 12, 6), Some(MenuItem::Settings));
        assert_eq!(menu.hit_test(screen, 12, 5), None);
        assert_eq!(menu.hit_test(screen, 12, 1), None);
        assert!(menu.contains(screen, 12, 1));
        assert!(!menu.contains(screen, 50, 3));

        menu.hide();
        assert_eq!(menu.hit_test(screen, 12, 2), None);
    }
}

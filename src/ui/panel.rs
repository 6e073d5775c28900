//! The top bar with its left, center and right containers.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tracing::debug;

use crate::config::PanelPosition;

use super::theme::Theme;

/// Id of the reserved control at the start of the left container.
pub const SYSTEM_ITEM_ID: &str = "system";

/// A labelled item in one of the containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelItem {
    /// Unique item id.
    pub id: String,
    /// Label text, drawn with one cell of padding on each side.
    pub text: String,
    /// Label style.
    pub style: Style,
}

impl PanelItem {
    /// Create an item.
    pub fn new(id: impl Into<String>, text: impl Into<String>, style: Style) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            style,
        }
    }

    fn width(&self) -> u16 {
        let width = Span::raw(self.text.as_str()).width() + 2;
        u16::try_from(width).unwrap_or(u16::MAX)
    }
}

/// The panel bar.
#[derive(Debug, Clone)]
pub struct Panel {
    left: Vec<PanelItem>,
    center: Vec<PanelItem>,
    right: Vec<PanelItem>,
}

impl Panel {
    /// Create a panel holding only the reserved system control.
    pub fn new(theme: &Theme) -> Self {
        Self {
            left: vec![PanelItem::new(
                SYSTEM_ITEM_ID,
                "jira-panel",
                theme.bar().fg(theme.highlight),
            )],
            center: Vec::new(),
            right: Vec::new(),
        }
    }

    fn container(&self, position: PanelPosition) -> &Vec<PanelItem> {
        match position {
            PanelPosition::Left => &self.left,
            PanelPosition::Center => &self.center,
            PanelPosition::Right => &self.right,
        }
    }

    fn container_mut(&mut self, position: PanelPosition) -> &mut Vec<PanelItem> {
        match position {
            PanelPosition::Left => &mut self.left,
            PanelPosition::Center => &mut self.center,
            PanelPosition::Right => &mut self.right,
        }
    }

    /// Insert an item into a container. `index` is clamped to the container length.
    pub fn insert_at(&mut self, item: PanelItem, position: PanelPosition, index: usize) {
        debug!(id = %item.id, %position, index, "Panel item inserted");
        let container = self.container_mut(position);
        let index = index.min(container.len());
        container.insert(index, item);
    }

    /// Remove an item from whichever container holds it.
    ///
    /// The reserved system control cannot be removed.
    pub fn remove(&mut self, id: &str) -> Option<PanelItem> {
        if id == SYSTEM_ITEM_ID {
            return None;
        }
        let (position, index) = self.position_of(id)?;
        debug!(id, %position, "Panel item removed");
        Some(self.container_mut(position).remove(index))
    }

    /// The container and index holding an item.
    pub fn position_of(&self, id: &str) -> Option<(PanelPosition, usize)> {
        PanelPosition::ALL.into_iter().find_map(|position| {
            self.container(position)
                .iter()
                .position(|item| item.id == id)
                .map(|index| (position, index))
        })
    }

    /// Replace an item's label. Returns false if the item is not attached.
    pub fn update(&mut self, id: &str, text: impl Into<String>, style: Style) -> bool {
        let Some((position, index)) = self.position_of(id) else {
            return false;
        };
        let item = &mut self.container_mut(position)[index];
        item.text = text.into();
        item.style = style;
        true
    }

    /// Screen areas of every item, laid out inside `area`'s first row.
    pub fn layout(&self, area: Rect) -> Vec<(&PanelItem, Rect)> {
        let mut placed = Vec::new();
        for position in PanelPosition::ALL {
            let items = self.container(position);
            let total: u16 = items.iter().map(PanelItem::width).fold(0, u16::saturating_add);
            let start = match position {
                PanelPosition::Left => area.x,
                PanelPosition::Center => area.x + area.width.saturating_sub(total) / 2,
                PanelPosition::Right => area.x + area.width.saturating_sub(total),
            };

            let mut x = start;
            for item in items {
                let right_edge = area.right();
                if x >= right_edge {
                    break;
                }
                let width = item.width().min(right_edge - x);
                placed.push((item, Rect::new(x, area.y, width, 1)));
                x = x.saturating_add(width);
            }
        }
        placed
    }

    /// The id of the item at a screen cell.
    pub fn hit_test(&self, area: Rect, column: u16, row: u16) -> Option<&str> {
        self.layout(area)
            .into_iter()
            .find(|(_, rect)| {
                row == rect.y && column >= rect.x && column < rect.x.saturating_add(rect.width)
            })
            .map(|(item, _)| item.id.as_str())
    }

    /// The area of an attached item.
    pub fn item_area(&self, area: Rect, id: &str) -> Option<Rect> {
        self.layout(area)
            .into_iter()
            .find(|(item, _)| item.id == id)
            .map(|(_, rect)| rect)
    }

    /// Draw the bar into the first row of `area`.
    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let bar = Rect::new(area.x, area.y, area.width, area.height.min(1));
        frame.render_widget(Paragraph::new("").style(theme.bar()), bar);

        for (item, rect) in self.layout(bar) {
            let label = Line::from(Span::styled(format!(" {} ", item.text), item.style));
            frame.render_widget(Paragraph::new(label), rect);
        }
    }
}

//! Terminal rendering of the panel bar and its popups.

mod dialog;
mod menu;
mod panel;
pub mod theme;

pub use dialog::ErrorDialog;
pub use menu::ActionMenu;
pub use panel::{Panel, PanelItem, SYSTEM_ITEM_ID};
pub use theme::Theme;

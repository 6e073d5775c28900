//! Opening URLs and files with the system handler.

use std::path::Path;

use tracing::{debug, warn};

/// Opens URLs in the default browser.
pub trait UrlOpener: Send {
    /// Open `url`. Returns whether the handler was launched.
    fn open_url(&self, url: &str) -> bool;

    /// Open a local file with its default application.
    fn open_path(&self, path: &Path) -> bool;
}

/// Delegates to the platform opener (`xdg-open`, `open`, `start`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open_url(&self, url: &str) -> bool {
        debug!(url, "Opening URL");
        match open::that_detached(url) {
            Ok(()) => true,
            Err(e) => {
                warn!(url, error = %e, "Failed to open URL");
                false
            }
        }
    }

    fn open_path(&self, path: &Path) -> bool {
        debug!(path = %path.display(), "Opening file");
        match open::that_detached(path) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to open file");
                false
            }
        }
    }
}

//! Watching the config file for external edits.

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{ConfigError, Result};

/// Quiet period before a burst of writes is reported as one change.
pub const DEBOUNCE: Duration = Duration::from_millis(250);

/// Reports edits of the config file on a channel.
///
/// The parent directory is watched rather than the file itself so editors
/// that save by renaming a temp file over the original are still seen.
/// Watching stops when this is dropped.
pub struct ConfigWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl ConfigWatcher {
    /// Start watching `path`. One `()` is sent per debounced burst of
    /// events touching the file.
    pub fn watch(path: &Path) -> Result<(Self, mpsc::UnboundedReceiver<()>)> {
        let file_name = path
            .file_name()
            .map(OsString::from)
            .ok_or_else(|| {
                ConfigError::ValidationError(format!("{} is not a file path", path.display()))
            })?;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };
        fs::create_dir_all(&dir).map_err(ConfigError::CreateDirError)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut debouncer = new_debouncer(DEBOUNCE, move |res: DebounceEventResult| match res {
            Ok(events) => {
                if events.iter().any(|e| is_config_file(&e.path, &file_name)) {
                    // A closed receiver only means the loop has exited.
                    let _ = tx.send(());
                }
            }
            Err(e) => warn!(error = %e, "Config watcher error"),
        })
        .map_err(ConfigError::WatchError)?;

        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(ConfigError::WatchError)?;

        debug!(dir = %dir.display(), "Watching config directory");
        Ok((
            Self {
                _debouncer: debouncer,
            },
            rx,
        ))
    }
}

fn is_config_file(event_path: &Path, file_name: &OsString) -> bool {
    event_path.file_name() == Some(file_name.as_os_str())
}

//! File logging for the panel.
//!
//! The terminal belongs to the panel UI, so records go to a daily rotating
//! file under the local data directory instead of stderr:
//! - Linux: `~/.local/share/jira-panel/logs/`
//! - macOS: `~/Library/Application Support/jira-panel/logs/`
//! - Windows: `C:\Users\<User>\AppData\Local\jira-panel\logs\`

use std::path::{Path, PathBuf};

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::config::SettingsSnapshot;

/// Environment variable holding a filter for this program only. Takes
/// precedence over `RUST_LOG`.
pub const LOG_FILTER_ENV: &str = "JIRA_PANEL_LOG";

const DEFAULT_LOG_FILTER: &str = "jira_panel=info,warn";

const LOG_FILE_PREFIX: &str = "jira-panel.log";

/// Keeps the background log writer running. Pending records are flushed
/// when it is dropped.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _worker: WorkerGuard,
}

/// Install the global file subscriber.
///
/// `JIRA_PANEL_LOG=debug` shows every poll cycle and indicator transition.
pub fn init() -> anyhow::Result<LogGuard> {
    let log_dir = log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (writer, worker) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(filter(
            std::env::var(LOG_FILTER_ENV).ok().as_deref(),
            std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
        ))
        .try_init()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        log_dir = %log_dir.display(),
        "jira-panel starting up"
    );
    Ok(LogGuard { _worker: worker })
}

/// Record what a panel session starts with. The token is never logged.
pub fn log_session(config_path: &Path, snapshot: &SettingsSnapshot) {
    info!(
        config = %config_path.display(),
        jira_url = %snapshot.jira_url,
        credentials = snapshot.has_credentials(),
        poll_interval_secs = snapshot.effective_poll_interval().as_secs(),
        position = %snapshot.panel_position,
        "Panel session"
    );
}

/// Log shutdown and flush the writer.
pub fn shutdown(guard: LogGuard) {
    info!("jira-panel shutting down");
    drop(guard);
}

fn log_directory() -> anyhow::Result<PathBuf> {
    let base_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;

    Ok(base_dir.join("jira-panel").join("logs"))
}

/// The first usable directive of the program variable, `RUST_LOG` and the
/// default. Unparsable values are skipped.
fn filter(panel: Option<&str>, rust_log: Option<&str>) -> EnvFilter {
    [panel, rust_log]
        .into_iter()
        .flatten()
        .filter(|directive| !directive.trim().is_empty())
        .find_map(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

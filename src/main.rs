//! jira-panel: shows your current JIRA issue in a terminal status bar.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use jira_panel::api::{auth, IssueQuery, JiraClient};
use jira_panel::app::{self, App};
use jira_panel::config::{self, SettingKey, SettingsStore};
use jira_panel::error::{AppError, Result};
use jira_panel::events::EventHandler;
use jira_panel::indicator::{IndicatorState, StateKind};
use jira_panel::logging;
use jira_panel::opener::SystemOpener;

#[derive(Debug, Parser)]
#[command(name = "jira-panel", version, about)]
struct Cli {
    /// Config file to use instead of the default location.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the panel (default).
    Run,
    /// Poll once, print the label and exit.
    Once,
    /// Read an API token from stdin and store it in the OS keyring.
    SetToken,
    /// Print the config file path.
    ConfigPath,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let guard = logging::init()?;
            let result = run(cli.config).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "Panel exited with error");
            }
            logging::shutdown(guard);
            result.map(|()| ExitCode::SUCCESS)
        }
        Commands::Once => once(cli.config).await,
        Commands::SetToken => set_token(cli.config),
        Commands::ConfigPath => config::config_path(cli.config.as_deref())
            .map(|path| {
                println!("{}", path.display());
                ExitCode::SUCCESS
            })
            .map_err(AppError::from),
    };

    result.map_err(|e| {
        let message = e.user_message();
        anyhow::Error::new(e).context(message)
    })
}

fn open_store(explicit: Option<PathBuf>) -> Result<SettingsStore> {
    let path = config::config_path(explicit.as_deref())?;
    let (store, _changes) = SettingsStore::open(path)?;
    Ok(store)
}

fn set_token(explicit: Option<PathBuf>) -> Result<ExitCode> {
    let store = open_store(explicit)?;
    let email = store
        .get_string(SettingKey::JiraEmail)
        .unwrap_or_default()
        .to_string();
    if email.is_empty() {
        return Err(AppError::other(format!(
            "jira-email is not set in {}",
            store.path().display()
        )));
    }

    eprintln!("Paste the API token for {} and press Enter:", email);
    let mut token = String::new();
    io::stdin().lock().read_line(&mut token)?;
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::other("No token given"));
    }

    auth::store_token(&email, token)?;
    eprintln!("Token stored in the OS keyring.");
    Ok(ExitCode::SUCCESS)
}

async fn once(explicit: Option<PathBuf>) -> Result<ExitCode> {
    let store = open_store(explicit)?;
    let snapshot = Arc::new(store.snapshot().with_token_fallback(app::keyring_token));
    let query: Arc<dyn IssueQuery> = Arc::new(JiraClient::new()?);

    let indicator = app::poll_once(query, snapshot).await;
    let view = indicator.view();
    println!("{}", view.text);

    if view.kind != StateKind::Error {
        return Ok(ExitCode::SUCCESS);
    }
    if let IndicatorState::Error { details, .. } = indicator.state() {
        if *details != view.text {
            eprintln!("{}", details);
        }
    }
    Ok(ExitCode::FAILURE)
}

async fn run(explicit: Option<PathBuf>) -> Result<()> {
    let path = config::config_path(explicit.as_deref())?;
    let (store, settings_rx) = SettingsStore::open(&path)?;
    let query: Arc<dyn IssueQuery> = Arc::new(JiraClient::new()?);
    let mut panel = App::new(
        store,
        settings_rx,
        query,
        Box::new(SystemOpener),
        app::keyring_token,
    );
    logging::log_session(&path, panel.snapshot());

    // Restore the terminal even if something panics.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        if let Err(e) = restore_terminal() {
            eprintln!("Failed to restore terminal during panic: {e}");
        }
        original_hook(panic_info);
    }));

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    let events = EventHandler::new().spawn();
    let result = panel.run(&mut terminal, events).await;

    restore_terminal()?;
    terminal.show_cursor()?;
    result
}

fn restore_terminal() -> io::Result<()> {
    terminal::disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)
}

//! Qube entry point
//!
//! Parses flags, sets up logging, builds the core, and runs the
//! cooperative UI loop.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{Event as TermEvent, KeyEventKind};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use qube_executor::CommandExecutor;
use qube_pty::{Session, SessionConfig};
use qube_stream::StreamProcessor;
use qube_tui::app::{Action, App};
use qube_tui::assembly::build_core;
use qube_tui::event::{spawn_input_thread, AppEvent};
use qube_tui::{view, Config};

#[derive(Debug, Parser)]
#[command(name = "qube", version, about = "Terminal front-end for the Amazon Q CLI")]
struct Args {
    /// Q binary override (exported as Q_BIN for discovery)
    #[arg(long)]
    q_bin: Option<String>,

    /// Do not start a chat session automatically
    #[arg(long)]
    no_auto_chat: bool,

    /// Append logs to this file (defaults to $QUBE_LOG; disabled when unset)
    #[arg(long)]
    log: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::new().with_auto_chat(!args.no_auto_chat);
    if let Some(q_bin) = args.q_bin {
        config = config.with_q_bin(q_bin);
    }
    if let Some(log) = args.log {
        config = config.with_log_file(log);
    }

    init_tracing(config.log_file.as_deref())?;
    if let Some(q_bin) = &config.q_bin {
        std::env::set_var(qube_process::detect::Q_BIN_ENV, q_bin);
    }

    info!(version = env!("CARGO_PKG_VERSION"), "starting qube");

    let mut core = build_core(SessionConfig::new());

    if config.auto_chat {
        let executor = core.executor.clone();
        tokio::spawn(async move {
            if let Err(err) = executor.execute("q chat").await {
                warn!(error = %err, "failed to start initial chat session");
            }
        });
    }

    let mut terminal = ratatui::init();
    let result = run_ui(
        &mut terminal,
        &mut core.app_rx,
        &core.executor,
        &core.session,
        &core.processor,
        &config,
    )
    .await;
    ratatui::restore();
    let _ = core.session.stop();

    info!("qube exited");
    result
}

/// The single-threaded cooperative UI loop.
async fn run_ui(
    terminal: &mut ratatui::DefaultTerminal,
    app_rx: &mut UnboundedReceiver<AppEvent>,
    executor: &Arc<CommandExecutor>,
    session: &Arc<Session>,
    processor: &Arc<Mutex<StreamProcessor>>,
    config: &Config,
) -> Result<()> {
    let mut app = App::new(env!("CARGO_PKG_VERSION"), !config.auto_chat);
    let mut term_rx = spawn_input_thread();
    let mut tick = tokio::time::interval(Duration::from_millis(100));

    loop {
        terminal
            .draw(|frame| view::render(frame, &app))
            .context("failed to draw frame")?;

        tokio::select! {
            Some(event) = term_rx.recv() => {
                if let TermEvent::Key(key) = event {
                    if key.kind == KeyEventKind::Press {
                        if let Some(action) = app.handle_key(key) {
                            dispatch(action, executor, session, processor);
                        }
                    }
                }
            }
            Some(event) = app_rx.recv() => {
                app.apply(event);
                // Catch up with whatever else the core queued this frame.
                while let Ok(event) = app_rx.try_recv() {
                    app.apply(event);
                }
            }
            _ = tick.tick() => {}
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Perform a UI action's side effects without blocking the UI loop.
fn dispatch(
    action: Action,
    executor: &Arc<CommandExecutor>,
    session: &Arc<Session>,
    processor: &Arc<Mutex<StreamProcessor>>,
) {
    match action {
        Action::Submit(command) => {
            let executor = executor.clone();
            tokio::spawn(async move {
                // Failures already surfaced through executor events.
                if let Err(err) = executor.execute(&command).await {
                    debug!(error = %err, "submission failed");
                }
            });
        }
        Action::Clear => processor.lock().unwrap().clear(),
        Action::Quit => {
            if session.is_running() {
                if let Err(err) = session.stop() {
                    warn!(error = %err, "failed to stop session");
                }
            }
        }
    }
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

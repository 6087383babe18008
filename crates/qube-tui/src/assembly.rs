//! Core construction and event wiring
//!
//! Builds the session, executor, and stream processor, and spawns the
//! forwarder tasks that translate their events into the UI contract. The
//! assembly owns every channel; components never reference each other
//! except through the seams wired here.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::info;

use qube_executor::{CommandExecutor, CommandRunner, ExecutorEvent, Mode, Status};
use qube_process::CommandOutput;
use qube_pty::{Session, SessionConfig, SessionEvent};
use qube_stream::{ProgressUpdate, StreamProcessor};

use crate::event::AppEvent;

/// Bridges the concrete PTY session to the executor's seam.
struct PtySessionAdapter(Arc<Session>);

impl qube_executor::Session for PtySessionAdapter {
    fn start(&self, mode: &str) -> Result<()> {
        Ok(self.0.start(mode)?)
    }

    fn send(&self, text: &str) -> Result<()> {
        Ok(self.0.send(text)?)
    }

    fn stop(&self) -> Result<()> {
        Ok(self.0.stop()?)
    }

    fn is_running(&self) -> bool {
        self.0.is_running()
    }
}

/// Bridges the short-lived runner to the executor's seam.
struct QRunner;

#[async_trait]
impl CommandRunner for QRunner {
    async fn run(&self, args: &[String], timeout: Duration) -> Result<CommandOutput> {
        Ok(qube_process::run(args, timeout).await?)
    }
}

/// The assembled core: everything the UI loop needs.
pub struct Core {
    pub session: Arc<Session>,
    pub executor: Arc<CommandExecutor>,
    pub processor: Arc<Mutex<StreamProcessor>>,
    /// The UI end of the event queue.
    pub app_rx: UnboundedReceiver<AppEvent>,
}

/// Build the core and spawn its forwarder tasks. Must run inside a tokio
/// runtime.
pub fn build_core(session_config: SessionConfig) -> Core {
    let (app_tx, app_rx) = mpsc::unbounded_channel();
    let (session_tx, session_rx) = mpsc::unbounded_channel();
    let (executor_tx, executor_rx) = mpsc::unbounded_channel();

    let processor = Arc::new(Mutex::new(StreamProcessor::new()));
    let session = Arc::new(Session::new(session_config, session_tx));
    let executor = Arc::new(CommandExecutor::new(
        Arc::new(PtySessionAdapter(session.clone())),
        Arc::new(QRunner),
        processor.clone(),
        executor_tx,
    ));

    tokio::spawn(forward_session_events(
        session_rx,
        processor.clone(),
        app_tx.clone(),
    ));
    tokio::spawn(forward_executor_events(executor_rx, app_tx));

    Core {
        session,
        executor,
        processor,
        app_rx,
    }
}

/// Session bytes run through the stream processor; lifecycle events map
/// onto the UI contract.
async fn forward_session_events(
    mut rx: UnboundedReceiver<SessionEvent>,
    processor: Arc<Mutex<StreamProcessor>>,
    app_tx: UnboundedSender<AppEvent>,
) {
    while let Some(event) = rx.recv().await {
        match event {
            SessionEvent::Output(bytes) => {
                let update = processor
                    .lock()
                    .unwrap()
                    .process_data(&String::from_utf8_lossy(&bytes));
                for line in update.lines {
                    let _ = app_tx.send(AppEvent::AppendOutput(line));
                }
                match update.progress {
                    ProgressUpdate::Set(line) => {
                        let _ = app_tx.send(AppEvent::SetProgress(line));
                    }
                    ProgressUpdate::Cleared => {
                        let _ = app_tx.send(AppEvent::ClearProgress);
                    }
                    ProgressUpdate::Unchanged => {}
                }
            }
            SessionEvent::Initialized => {
                // The banner served its purpose; the conversation starts
                // on a clean screen.
                processor.lock().unwrap().clear();
                let _ = app_tx.send(AppEvent::ClearScreen);
                let _ = app_tx.send(AppEvent::SetConnected(true));
                let _ = app_tx.send(AppEvent::SetStatus(Status::Ready));
                let _ = app_tx.send(AppEvent::SetInputEnabled(true));
            }
            SessionEvent::Exited(code) => {
                info!(code, "session ended");
                let _ = app_tx.send(AppEvent::SetStatus(Status::Ready));
                let _ = app_tx.send(AppEvent::SetMode(Mode::Command));
                let _ = app_tx.send(AppEvent::SetConnected(false));
                if code != 0 {
                    let _ = app_tx.send(AppEvent::IncrementError);
                }
                let _ = app_tx.send(AppEvent::AppendOutput("Q session ended".to_string()));
            }
            SessionEvent::Error(message) => {
                let _ = app_tx.send(AppEvent::IncrementError);
                let _ = app_tx.send(AppEvent::AppendOutput(format!("Session Error: {message}")));
            }
        }
    }
}

/// Executor events map onto the UI contract; status doubles as the input
/// gate.
async fn forward_executor_events(
    mut rx: UnboundedReceiver<ExecutorEvent>,
    app_tx: UnboundedSender<AppEvent>,
) {
    while let Some(event) = rx.recv().await {
        match event {
            ExecutorEvent::StatusChanged(status) => {
                let _ = app_tx.send(AppEvent::SetStatus(status));
                let _ = app_tx.send(AppEvent::SetInputEnabled(status != Status::Running));
            }
            ExecutorEvent::ModeChanged(mode) => {
                let _ = app_tx.send(AppEvent::SetMode(mode));
            }
            ExecutorEvent::Output(output) => {
                for line in output.lines().filter(|line| !line.trim().is_empty()) {
                    let _ = app_tx.send(AppEvent::AppendOutput(line.to_string()));
                }
            }
            ExecutorEvent::Error(message) => {
                let _ = app_tx.send(AppEvent::IncrementError);
                let _ = app_tx.send(AppEvent::AppendOutput(format!("Error: {message}")));
            }
        }
    }
}

//! The command/session dispatch state machine
//!
//! One executor per run. A submission either goes into the live session
//! as a chat message, opens the session (`q chat`), or runs to completion
//! as a short-lived command. Status and mode changes are edge-triggered
//! events; output and errors are forwarded as they happen.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use qube_process::CommandOutput;
use qube_stream::StreamProcessor;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::error::ExecutorError;

/// Operational mode: dispatching one-shot commands or chatting with a
/// live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Command,
    Session,
}

impl Mode {
    pub fn display_name(&self) -> &'static str {
        match self {
            Mode::Command => "Command",
            Mode::Session => "Session",
        }
    }
}

/// Executor status as shown in the status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    Running,
    Error,
}

impl Status {
    pub fn display_name(&self) -> &'static str {
        match self {
            Status::Ready => "Ready",
            Status::Running => "Running",
            Status::Error => "Error",
        }
    }
}

/// Events emitted by the executor. Status and mode events fire only on
/// actual change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorEvent {
    StatusChanged(Status),
    ModeChanged(Mode),
    Output(String),
    Error(String),
}

/// The interactive session as the executor sees it.
pub trait Session: Send + Sync {
    fn start(&self, mode: &str) -> anyhow::Result<()>;
    fn send(&self, text: &str) -> anyhow::Result<()>;
    fn stop(&self) -> anyhow::Result<()>;
    fn is_running(&self) -> bool;
}

/// Short-lived command execution as the executor sees it.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, args: &[String], timeout: Duration) -> anyhow::Result<CommandOutput>;
}

struct State {
    mode: Mode,
    status: Status,
}

/// Dispatches submissions to the session or the short-lived runner.
pub struct CommandExecutor {
    session: Arc<dyn Session>,
    runner: Arc<dyn CommandRunner>,
    /// Shared with the output path; the executor records each chat
    /// submission here before sending so the echo can be dropped.
    processor: Arc<Mutex<StreamProcessor>>,
    state: Mutex<State>,
    events: UnboundedSender<ExecutorEvent>,
}

impl CommandExecutor {
    pub fn new(
        session: Arc<dyn Session>,
        runner: Arc<dyn CommandRunner>,
        processor: Arc<Mutex<StreamProcessor>>,
        events: UnboundedSender<ExecutorEvent>,
    ) -> Self {
        Self {
            session,
            runner,
            processor,
            state: Mutex::new(State {
                mode: Mode::Command,
                status: Status::Ready,
            }),
            events,
        }
    }

    pub fn mode(&self) -> Mode {
        self.state.lock().unwrap().mode
    }

    pub fn status(&self) -> Status {
        self.state.lock().unwrap().status
    }

    /// Execute one submission.
    ///
    /// Whitespace-only input is ignored. While a session is live the
    /// input is a chat message; otherwise `q chat` opens the session and
    /// everything else runs as a short-lived command (with or without the
    /// leading `q`).
    pub async fn execute(&self, command: &str) -> Result<(), ExecutorError> {
        if command.trim().is_empty() {
            return Ok(());
        }

        if self.mode() == Mode::Session
            && self.status() == Status::Running
            && self.session.is_running()
        {
            debug!(command, "sending into session");
            // Record for echo suppression strictly before the write hits
            // the PTY.
            self.processor
                .lock()
                .unwrap()
                .set_last_sent_command(command);
            return match self.session.send(&format!("{command}\r")) {
                Ok(()) => Ok(()),
                Err(err) => {
                    self.set_status(Status::Error);
                    self.emit_error(&err);
                    Err(ExecutorError::SessionSend(err))
                }
            };
        }

        let tokens: Vec<String> = command.split_whitespace().map(str::to_string).collect();
        let Some(first) = tokens.first() else {
            return Ok(());
        };

        if first == "q" && tokens.len() > 1 {
            if tokens[1] == "chat" {
                return self.start_session("chat");
            }
            return self.run_short_lived(&tokens[1..]).await;
        }

        self.run_short_lived(&tokens).await
    }

    fn start_session(&self, kind: &str) -> Result<(), ExecutorError> {
        self.set_status(Status::Running);

        if let Err(err) = self.session.start(kind) {
            self.set_status(Status::Error);
            self.emit_error(&err);
            return Err(ExecutorError::SessionStart(err));
        }

        // The session's initialization event flips the UI to Connected
        // out-of-band; status stays Running until then.
        self.set_mode(Mode::Session);
        Ok(())
    }

    async fn run_short_lived(&self, args: &[String]) -> Result<(), ExecutorError> {
        self.set_status(Status::Running);

        let result = self
            .runner
            .run(args, qube_process::DEFAULT_TIMEOUT)
            .await;

        match result {
            Ok(CommandOutput { output, exit_code }) => {
                if !output.is_empty() {
                    let _ = self.events.send(ExecutorEvent::Output(output));
                }
                if exit_code == 0 {
                    self.set_status(Status::Ready);
                    Ok(())
                } else {
                    warn!(exit_code, "short-lived command failed");
                    let err = ExecutorError::ExitStatus(exit_code);
                    self.set_status(Status::Error);
                    let _ = self
                        .events
                        .send(ExecutorEvent::Error(err.to_string()));
                    Err(err)
                }
            }
            Err(err) => {
                self.set_status(Status::Error);
                self.emit_error(&err);
                Err(ExecutorError::Command(err))
            }
        }
    }

    fn set_status(&self, status: Status) {
        let mut state = self.state.lock().unwrap();
        if state.status != status {
            state.status = status;
            let _ = self.events.send(ExecutorEvent::StatusChanged(status));
        }
    }

    fn set_mode(&self, mode: Mode) {
        let mut state = self.state.lock().unwrap();
        if state.mode != mode {
            state.mode = mode;
            let _ = self.events.send(ExecutorEvent::ModeChanged(mode));
        }
    }

    fn emit_error(&self, err: &anyhow::Error) {
        let _ = self.events.send(ExecutorEvent::Error(err.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct FakeSession {
        running: AtomicBool,
        starts: Mutex<Vec<String>>,
        sent: Mutex<Vec<String>>,
        fail_send: AtomicBool,
    }

    impl Session for FakeSession {
        fn start(&self, mode: &str) -> anyhow::Result<()> {
            self.starts.lock().unwrap().push(mode.to_string());
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn send(&self, text: &str) -> anyhow::Result<()> {
            if self.fail_send.load(Ordering::SeqCst) {
                anyhow::bail!("pipe closed");
            }
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }

        fn stop(&self) -> anyhow::Result<()> {
            self.running.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }
    }

    struct FakeRunner {
        calls: AtomicUsize,
        result: Mutex<Option<anyhow::Result<CommandOutput>>>,
    }

    impl FakeRunner {
        fn returning(result: anyhow::Result<CommandOutput>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result: Mutex::new(Some(result)),
            }
        }

        fn ok(output: &str) -> Self {
            Self::returning(Ok(CommandOutput {
                output: output.to_string(),
                exit_code: 0,
            }))
        }
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(
            &self,
            _args: &[String],
            _timeout: Duration,
        ) -> anyhow::Result<CommandOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .lock()
                .unwrap()
                .take()
                .expect("runner called more than once")
        }
    }

    struct Harness {
        executor: CommandExecutor,
        session: Arc<FakeSession>,
        runner: Arc<FakeRunner>,
        rx: mpsc::UnboundedReceiver<ExecutorEvent>,
    }

    fn harness(runner: FakeRunner) -> Harness {
        let session = Arc::new(FakeSession::default());
        let runner = Arc::new(runner);
        let processor = Arc::new(Mutex::new(StreamProcessor::new()));
        let (tx, rx) = mpsc::unbounded_channel();
        let executor =
            CommandExecutor::new(session.clone(), runner.clone(), processor, tx);
        Harness {
            executor,
            session,
            runner,
            rx,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ExecutorEvent>) -> Vec<ExecutorEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let mut h = harness(FakeRunner::ok(""));
        h.executor.execute("   ").await.unwrap();
        assert!(drain(&mut h.rx).is_empty());
        assert_eq!(h.runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn q_chat_starts_a_session_and_switches_mode() {
        let mut h = harness(FakeRunner::ok(""));
        h.executor.execute("q chat").await.unwrap();

        assert_eq!(*h.session.starts.lock().unwrap(), vec!["chat".to_string()]);
        assert_eq!(h.executor.mode(), Mode::Session);
        assert_eq!(h.executor.status(), Status::Running);
        assert_eq!(
            drain(&mut h.rx),
            vec![
                ExecutorEvent::StatusChanged(Status::Running),
                ExecutorEvent::ModeChanged(Mode::Session),
            ]
        );

        // A live session turns subsequent submissions into chat messages.
        h.executor.execute("hello").await.unwrap();
        assert_eq!(*h.session.sent.lock().unwrap(), vec!["hello\r".to_string()]);
        assert_eq!(h.runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn session_send_records_echo_suppression_first() {
        let session = Arc::new(FakeSession::default());
        let runner = Arc::new(FakeRunner::ok(""));
        let processor = Arc::new(Mutex::new(StreamProcessor::new()));
        let (tx, _rx) = mpsc::unbounded_channel();
        let executor =
            CommandExecutor::new(session.clone(), runner, processor.clone(), tx);

        executor.execute("q chat").await.unwrap();
        executor.execute("hello there").await.unwrap();

        // The processor drops the echoed line exactly once.
        let update = processor.lock().unwrap().process_data("hello there\nreply\n");
        assert_eq!(update.lines, vec!["reply".to_string()]);
    }

    #[tokio::test]
    async fn failed_session_send_sets_error() {
        let mut h = harness(FakeRunner::ok(""));
        h.executor.execute("q chat").await.unwrap();
        drain(&mut h.rx);

        h.session.fail_send.store(true, Ordering::SeqCst);
        let err = h.executor.execute("hello").await.unwrap_err();
        assert!(matches!(err, ExecutorError::SessionSend(_)));
        assert_eq!(h.executor.status(), Status::Error);

        let events = drain(&mut h.rx);
        assert_eq!(events[0], ExecutorEvent::StatusChanged(Status::Error));
        assert!(matches!(events[1], ExecutorEvent::Error(_)));
    }

    #[tokio::test]
    async fn q_prefixed_commands_run_short_lived() {
        let mut h = harness(FakeRunner::ok("version 1.2.3\n"));
        h.executor.execute("q version").await.unwrap();

        assert_eq!(h.runner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.executor.status(), Status::Ready);
        assert_eq!(
            drain(&mut h.rx),
            vec![
                ExecutorEvent::StatusChanged(Status::Running),
                ExecutorEvent::Output("version 1.2.3\n".to_string()),
                ExecutorEvent::StatusChanged(Status::Ready),
            ]
        );
    }

    #[tokio::test]
    async fn bare_commands_fall_through_to_the_runner() {
        let mut h = harness(FakeRunner::ok(""));
        h.executor.execute("whoami").await.unwrap();
        assert_eq!(h.runner.calls.load(Ordering::SeqCst), 1);
        // Empty output emits no Output event.
        assert_eq!(
            drain(&mut h.rx),
            vec![
                ExecutorEvent::StatusChanged(Status::Running),
                ExecutorEvent::StatusChanged(Status::Ready),
            ]
        );
    }

    #[tokio::test]
    async fn non_zero_exit_emits_output_before_error() {
        let mut h = harness(FakeRunner::returning(Ok(CommandOutput {
            output: "oops\n".to_string(),
            exit_code: 7,
        })));
        let err = h.executor.execute("q lint").await.unwrap_err();
        assert!(matches!(err, ExecutorError::ExitStatus(7)));

        let events = drain(&mut h.rx);
        assert_eq!(
            events,
            vec![
                ExecutorEvent::StatusChanged(Status::Running),
                ExecutorEvent::Output("oops\n".to_string()),
                ExecutorEvent::StatusChanged(Status::Error),
                ExecutorEvent::Error("command exited with status 7".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn runner_failure_sets_error_status() {
        let mut h = harness(FakeRunner::returning(Err(anyhow::anyhow!(
            "no such binary"
        ))));
        let err = h.executor.execute("missing").await.unwrap_err();
        assert!(matches!(err, ExecutorError::Command(_)));
        assert_eq!(h.executor.status(), Status::Error);
    }

    #[tokio::test]
    async fn status_events_are_edge_triggered() {
        let mut h = harness(FakeRunner::returning(Err(anyhow::anyhow!("boom"))));
        let _ = h.executor.execute("fail").await;
        drain(&mut h.rx);

        // The next run transitions Error -> Running -> Ready; each edge
        // fires exactly once.
        *h.runner.result.lock().unwrap() = Some(Ok(CommandOutput {
            output: "fine\n".to_string(),
            exit_code: 0,
        }));
        h.executor.execute("ok-now").await.unwrap();

        let events = drain(&mut h.rx);
        assert_eq!(
            events,
            vec![
                ExecutorEvent::StatusChanged(Status::Running),
                ExecutorEvent::Output("fine\n".to_string()),
                ExecutorEvent::StatusChanged(Status::Ready),
            ]
        );
    }

    #[tokio::test]
    async fn dead_session_falls_through_to_short_lived_dispatch() {
        let mut h = harness(FakeRunner::ok("ran\n"));
        h.executor.execute("q chat").await.unwrap();
        drain(&mut h.rx);

        // The session dies out-of-band; the executor notices on the next
        // submission and treats it as a command again.
        h.session.running.store(false, Ordering::SeqCst);
        h.executor.execute("hello").await.unwrap();

        assert!(h.session.sent.lock().unwrap().is_empty());
        assert_eq!(h.runner.calls.load(Ordering::SeqCst), 1);
    }
}

//! The PTY-attached interactive session
//!
//! The child runs attached to a freshly allocated PTY with a forced
//! terminal identity and window size: the Q CLI renders differently under
//! different terminal geometries, and the progress patterns the stream
//! parser relies on are only deterministic at this size.
//!
//! A blocking reader thread forwards output in read order; a waiter thread
//! reports the exit code. Both communicate through the event channel
//! injected at construction, so the session never calls back into the UI.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::init::InitDetector;

/// Initial PTY window size. A correctness contract, not a preference.
pub const PTY_ROWS: u16 = 30;
pub const PTY_COLS: u16 = 80;

const TERM: &str = "xterm-256color";
const READ_BUF_SIZE: usize = 4096;
/// How often the waiter polls for child exit.
const EXIT_POLL: Duration = Duration::from_millis(50);
/// Grace period between TERM and KILL during stop.
const STOP_GRACE: Duration = Duration::from_millis(300);

/// Session configuration.
///
/// With no overrides the session runs the discovered Q binary with the
/// requested mode as its only argument. Tests drive a plain shell through
/// the same machinery via the overrides.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Program to spawn; resolved through Q CLI discovery when unset.
    pub program: Option<PathBuf>,
    /// Arguments; defaults to `[mode]`.
    pub args: Option<Vec<String>>,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }
}

/// Per-start child state shared between the session, its reader, and its
/// waiter. A restart replaces the generation; stale threads detect that
/// and stand down.
struct Generation {
    child: Mutex<Box<dyn Child + Send + Sync>>,
    pid: Option<u32>,
    /// One-shot stop latch.
    stopping: AtomicBool,
}

/// A long-lived child process attached to a PTY.
pub struct Session {
    config: SessionConfig,
    events: UnboundedSender<SessionEvent>,
    running: Arc<AtomicBool>,
    writer: Mutex<Option<Box<dyn Write + Send>>>,
    master: Mutex<Option<Box<dyn MasterPty + Send>>>,
    current: Arc<Mutex<Option<Arc<Generation>>>>,
}

impl Session {
    pub fn new(config: SessionConfig, events: UnboundedSender<SessionEvent>) -> Self {
        Self {
            config,
            events,
            running: Arc::new(AtomicBool::new(false)),
            writer: Mutex::new(None),
            master: Mutex::new(None),
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn the child on a fresh PTY and start streaming its output.
    pub fn start(&self, mode: &str) -> Result<(), SessionError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SessionError::AlreadyRunning);
        }

        let program = match &self.config.program {
            Some(program) => program.clone(),
            None => qube_process::detect_q_cli()?,
        };
        let args = self
            .config
            .args
            .clone()
            .unwrap_or_else(|| vec![mode.to_string()]);

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: PTY_ROWS,
                cols: PTY_COLS,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(SessionError::Create)?;

        let mut cmd = CommandBuilder::new(&program);
        cmd.args(&args);
        cmd.env("TERM", TERM);

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|source| SessionError::Spawn {
                command: program.display().to_string(),
                source,
            })?;
        // The slave must not outlive the spawn, or the reader would never
        // see EOF when the child exits.
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(SessionError::CloneReader)?;
        let writer = pair.master.take_writer().map_err(SessionError::Writer)?;

        let pid = child.process_id();
        let generation = Arc::new(Generation {
            child: Mutex::new(child),
            pid,
            stopping: AtomicBool::new(false),
        });

        *self.writer.lock().unwrap() = Some(writer);
        *self.master.lock().unwrap() = Some(pair.master);
        *self.current.lock().unwrap() = Some(generation.clone());
        self.running.store(true, Ordering::SeqCst);

        info!(program = %program.display(), ?args, pid, rows = PTY_ROWS, cols = PTY_COLS, "session started");

        self.spawn_reader(reader);
        self.spawn_waiter(generation);

        Ok(())
    }

    /// Write `text` verbatim to the PTY. Callers append the CR the Q CLI
    /// expects as submit.
    pub fn send(&self, text: &str) -> Result<(), SessionError> {
        let mut writer = self.writer.lock().unwrap();
        let writer = writer.as_mut().ok_or(SessionError::NotStarted)?;
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Whether a started child has not yet been observed to exit.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Tear the session down: close the PTY, TERM the child, and KILL it
    /// if it survives the grace period. Safe to call repeatedly and
    /// concurrently; only the first call acts.
    pub fn stop(&self) -> Result<(), SessionError> {
        let generation = {
            let current = self.current.lock().unwrap();
            match current.as_ref() {
                Some(generation) => generation.clone(),
                None => return Ok(()),
            }
        };

        if generation.stopping.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        debug!(pid = generation.pid, "stopping session");

        // Closing the PTY unblocks the reader and drops our end of the
        // line discipline.
        drop(self.writer.lock().unwrap().take());
        drop(self.master.lock().unwrap().take());

        if self.running.load(Ordering::SeqCst) {
            #[cfg(unix)]
            if let Some(pid) = generation.pid {
                use nix::sys::signal::{kill, Signal};
                use nix::unistd::Pid;
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }

            let deadline = Instant::now() + STOP_GRACE;
            while self.running.load(Ordering::SeqCst) && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(10));
            }

            if self.running.load(Ordering::SeqCst) {
                warn!(pid = generation.pid, "session child survived TERM, killing");
                let _ = generation.child.lock().unwrap().kill();
            }
        }

        Ok(())
    }

    /// Blocking PTY reads on a dedicated thread. Every read is copied into
    /// a fresh buffer before crossing the channel; successive events never
    /// share backing storage.
    fn spawn_reader(&self, mut reader: Box<dyn Read + Send>) {
        let events = self.events.clone();
        std::thread::spawn(move || {
            let mut detector = InitDetector::new();
            let mut buf = [0u8; READ_BUF_SIZE];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        let chunk = buf[..n].to_vec();
                        let initialized = !detector.is_done()
                            && detector.feed(&String::from_utf8_lossy(&chunk));

                        if events.send(SessionEvent::Output(chunk)).is_err() {
                            break;
                        }
                        if initialized {
                            debug!("session initialized");
                            let _ = events.send(SessionEvent::Initialized);
                        }
                    }
                    Err(err) => {
                        // A master-side read error (EIO on Linux) is how a
                        // PTY reports that the child is gone; the waiter
                        // reports the exit itself.
                        debug!(error = %err, "PTY read ended");
                        break;
                    }
                }
            }
            debug!("session reader finished");
        });
    }

    /// Polls for child exit and reports the code exactly once.
    fn spawn_waiter(&self, generation: Arc<Generation>) {
        let events = self.events.clone();
        let running = self.running.clone();
        let current = self.current.clone();
        std::thread::spawn(move || loop {
            let observed = {
                let mut child = generation.child.lock().unwrap();
                match child.try_wait() {
                    Ok(Some(status)) => Some(Ok(status)),
                    Ok(None) => None,
                    Err(err) => Some(Err(err)),
                }
            };

            match observed {
                None => std::thread::sleep(EXIT_POLL),
                Some(result) => {
                    // A restarted session owns a new generation; a stale
                    // waiter must not touch the shared flags.
                    let is_current = current
                        .lock()
                        .unwrap()
                        .as_ref()
                        .map(|g| Arc::ptr_eq(g, &generation))
                        .unwrap_or(false);
                    if !is_current {
                        break;
                    }

                    running.store(false, Ordering::SeqCst);
                    match result {
                        Ok(status) => {
                            let code = status.exit_code() as i32;
                            info!(code, "session child exited");
                            let _ = events.send(SessionEvent::Exited(code));
                        }
                        Err(err) => {
                            warn!(error = %err, "failed waiting for session child");
                            let _ = events
                                .send(SessionEvent::Error(format!("wait failed: {err}")));
                            let _ = events.send(SessionEvent::Exited(-1));
                        }
                    }
                    break;
                }
            }
        });
    }
}

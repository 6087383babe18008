//! Short-lived command runner
//!
//! Executes a child process to completion with a deadline. stdout and
//! stderr are both piped and drained concurrently into a single buffer,
//! preserving the order chunks arrive in.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{ExecError, Result};

/// Deadline applied by the executor when none is given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured result of a completed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Combined stdout+stderr in arrival order.
    pub output: String,
    /// The child's exit code, -1 if the platform reported none.
    pub exit_code: i32,
}

impl CommandOutput {
    /// Whether the child exited successfully.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run `args` to completion, enforcing `timeout`.
///
/// A non-zero exit is data, not an error: the captured output and exit
/// code are returned so callers can surface both. On timeout the child is
/// killed and `ExecError::Timeout` is returned promptly.
pub async fn run(args: &[String], timeout: Duration) -> Result<CommandOutput> {
    let (program, rest) = args.split_first().ok_or(ExecError::NoCommand)?;

    debug!(command = %program, args = ?rest, timeout_secs = timeout.as_secs(), "spawning command");

    let mut child = Command::new(program)
        .args(rest)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ExecError::Spawn {
            command: program.clone(),
            source,
        })?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    if let Some(stdout) = child.stdout.take() {
        spawn_drain(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_drain(stderr, tx.clone());
    }
    drop(tx);

    let collect = async {
        let mut combined = Vec::new();
        while let Some(chunk) = rx.recv().await {
            combined.extend_from_slice(&chunk);
        }
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((combined, status))
    };

    match tokio::time::timeout(timeout, collect).await {
        Ok(Ok((combined, status))) => {
            let exit_code = status.code().unwrap_or(-1);
            debug!(exit_code, bytes = combined.len(), "command finished");
            Ok(CommandOutput {
                output: String::from_utf8_lossy(&combined).into_owned(),
                exit_code,
            })
        }
        Ok(Err(source)) => Err(ExecError::Io(source)),
        Err(_) => {
            warn!(command = %program, timeout_secs = timeout.as_secs(), "command timed out, killing");
            let _ = child.start_kill();
            let _ = child.wait().await;
            Err(ExecError::Timeout(timeout))
        }
    }
}

/// Forward chunks from one pipe into the shared buffer channel.
fn spawn_drain<R>(mut pipe: R, tx: mpsc::UnboundedSender<Vec<u8>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
            match pipe.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn captures_stdout() {
        let result = run(&args(&["echo", "hello"]), DEFAULT_TIMEOUT).await.unwrap();
        assert_eq!(result.output, "hello\n");
        assert_eq!(result.exit_code, 0);
        assert!(result.success());
    }

    #[tokio::test]
    async fn empty_args_is_an_error() {
        let err = run(&[], DEFAULT_TIMEOUT).await.unwrap_err();
        assert!(matches!(err, ExecError::NoCommand));
        assert_eq!(err.to_string(), "no command provided");
    }

    #[tokio::test]
    async fn spawn_failure_surfaces_platform_error() {
        let err = run(&args(&["qube-no-such-binary-anywhere"]), DEFAULT_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[tokio::test]
    async fn non_zero_exit_still_yields_output() {
        let result = run(
            &args(&["sh", "-c", "echo oops >&2; exit 7"]),
            DEFAULT_TIMEOUT,
        )
        .await
        .unwrap();
        assert_eq!(result.output, "oops\n");
        assert_eq!(result.exit_code, 7);
        assert!(!result.success());
    }

    #[tokio::test]
    async fn merges_stdout_and_stderr() {
        let result = run(
            &args(&["sh", "-c", "echo out; echo err >&2"]),
            DEFAULT_TIMEOUT,
        )
        .await
        .unwrap();
        assert!(result.output.contains("out\n"));
        assert!(result.output.contains("err\n"));
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn timeout_kills_the_child_promptly() {
        let started = Instant::now();
        let err = run(&args(&["sleep", "2"]), Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}

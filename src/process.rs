//! External process execution
//!
//! `ProcessRunner` is the seam between the orchestrator and the real
//! `docker` binary; tests substitute a scripted runner.

use crate::error::{StepError, StepResult};
use crate::log_writer::SharedLineWriter;
use async_trait::async_trait;
use std::fmt;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

const READ_CHUNK: usize = 8 * 1024;

/// Program plus arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Trimmed combined output and exit code of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub output: String,
    pub code: i32,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion, streaming stdout and stderr into `output` as the
    /// process produces them. Returns the exit code (-1 if killed by a signal).
    async fn run(&self, cmd: &CommandSpec, output: SharedLineWriter) -> StepResult<i32>;

    /// Run to completion and capture the trimmed combined output
    async fn run_capture_output(&self, cmd: &CommandSpec) -> StepResult<CapturedOutput>;
}

/// Runs commands with `tokio::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioRunner;

impl TokioRunner {
    pub fn new() -> Self {
        Self
    }
}

/// Copy a child stream into the shared writer chunk by chunk.
///
/// Returns false if the stream broke before EOF; the pipe is then no longer
/// drained and the child has to be stopped.
async fn pump<R: AsyncRead + Unpin>(
    mut reader: R,
    writer: SharedLineWriter,
    stream: &str,
) -> bool {
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => return true,
            Ok(n) => writer.write_bytes(&buf[..n]),
            Err(e) => {
                warn!("Reading {} failed: {}", stream, e);
                return false;
            }
        }
    }
}

#[async_trait]
impl ProcessRunner for TokioRunner {
    async fn run(&self, cmd: &CommandSpec, output: SharedLineWriter) -> StepResult<i32> {
        debug!("Executing: {}", cmd);

        let mut child = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StepError::command_failed(cmd.to_string(), e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| StepError::User("child stdout was not piped".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| StepError::User("child stderr was not piped".to_string()))?;

        let drained = tokio::join!(
            pump(stdout, output.clone(), "stdout"),
            pump(stderr, output.clone(), "stderr"),
        );
        if drained != (true, true) {
            warn!("Stopping {} after losing its output", cmd.program);
            if let Err(e) = child.start_kill() {
                debug!("Kill failed: {}", e);
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| StepError::command_failed(cmd.to_string(), e))?;
        output.flush_partial();

        Ok(status.code().unwrap_or(-1))
    }

    async fn run_capture_output(&self, cmd: &CommandSpec) -> StepResult<CapturedOutput> {
        debug!("Executing: {}", cmd);

        let output = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| StepError::command_failed(cmd.to_string(), e))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CapturedOutput {
            output: combined.trim().to_string(),
            code: output.status.code().unwrap_or(-1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_writer::MemorySink;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[test]
    fn command_spec_display() {
        let cmd = CommandSpec::new("docker", vec!["buildx".to_string(), "ls".to_string()]);
        assert_eq!(cmd.to_string(), "docker buildx ls");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_streams_both_streams() {
        let sink = MemorySink::default();
        let writer = SharedLineWriter::new(sink.clone());

        let code = TokioRunner::new()
            .run(&sh("echo out; echo err 1>&2"), writer)
            .await
            .unwrap();

        assert_eq!(code, 0);
        let lines = sink.lines();
        assert!(lines.contains(&"out".to_string()));
        assert!(lines.contains(&"err".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_flushes_unterminated_tail() {
        let sink = MemorySink::default();
        let writer = SharedLineWriter::new(sink.clone());

        TokioRunner::new()
            .run(&sh("printf 'first\\nlast'"), writer)
            .await
            .unwrap();

        assert_eq!(sink.lines(), vec!["first", "last"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_reports_exit_code() {
        let writer = SharedLineWriter::new(MemorySink::default());
        let code = TokioRunner::new().run(&sh("exit 3"), writer).await.unwrap();
        assert_eq!(code, 3);
    }

    /// Reader that yields one line and then breaks
    struct BrokenPipe {
        sent: bool,
    }

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            if self.sent {
                return std::task::Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "pipe closed",
                )));
            }
            self.sent = true;
            buf.put_slice(b"partial\n");
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn pump_reports_broken_stream() {
        let sink = MemorySink::default();
        let writer = SharedLineWriter::new(sink.clone());

        assert!(!pump(BrokenPipe { sent: false }, writer.clone(), "stdout").await);
        assert!(pump(&b"done\n"[..], writer, "stderr").await);
        assert_eq!(sink.lines(), vec!["partial", "done"]);
    }

    #[tokio::test]
    async fn spawn_failure_is_command_failed() {
        let writer = SharedLineWriter::new(MemorySink::default());
        let cmd = CommandSpec::new("definitely-not-a-real-binary-4242", vec![]);
        let err = TokioRunner::new().run(&cmd, writer).await.unwrap_err();
        assert!(matches!(err, StepError::CommandFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn capture_output_is_trimmed() {
        let out = TokioRunner::new()
            .run_capture_output(&sh("echo '  builder-1  '"))
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(out.output, "builder-1");
    }
}

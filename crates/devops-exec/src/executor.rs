use crate::error::ExecError;
use crate::plan::Invocation;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Abstraction over external process execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait CommandExecutor: Send + Sync {
    /// Run to completion and capture stdout. Stderr goes straight to the terminal.
    async fn exec(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<String, ExecError>;

    /// Run to completion, forwarding stdout and stderr line by line as they arrive.
    async fn exec_streaming(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<(), ExecError>;

    /// Like [`exec_streaming`](Self::exec_streaming), with data piped to stdin.
    async fn exec_streaming_with_stdin(
        &self,
        invocation: &Invocation,
        stdin_data: &[u8],
        cancel: &CancellationToken,
    ) -> Result<(), ExecError>;
}

/// Executor that spawns real child processes.
#[derive(Debug, Clone, Default)]
pub struct RealExecutor {
    timeout: Option<Duration>,
}

impl RealExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill any single invocation still running after `timeout`. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn spawn(
        &self,
        invocation: &Invocation,
        stdin: Stdio,
        stderr: Stdio,
    ) -> Result<Child, ExecError> {
        Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(stderr)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                let program = invocation.program.clone();
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExecError::NotFound { program, source: e }
                } else {
                    ExecError::Spawn { program, source: e }
                }
            })
    }

    /// Wait for exit, killing the child on cancellation or timeout.
    async fn wait(
        &self,
        child: &mut Child,
        command: &str,
        cancel: &CancellationToken,
    ) -> Result<ExitStatus, ExecError> {
        let timeout = self.timeout;
        let deadline = async move {
            match timeout {
                Some(after) => tokio::time::sleep(after).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                warn!(%command, "cancelled, killing process");
                kill(child, command).await;
                Err(ExecError::Cancelled { command: command.to_owned() })
            }
            _ = deadline => {
                let after = timeout.unwrap_or_default();
                warn!(%command, ?after, "timed out, killing process");
                kill(child, command).await;
                Err(ExecError::TimedOut { command: command.to_owned(), after })
            }
            status = child.wait() => {
                status.map_err(|e| ExecError::Wait { command: command.to_owned(), source: e })
            }
        }
    }

    async fn run_streaming(
        &self,
        invocation: &Invocation,
        stdin_data: Option<&[u8]>,
        cancel: &CancellationToken,
    ) -> Result<(), ExecError> {
        let command = invocation.to_string();
        let stdin = if stdin_data.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        let mut child = self.spawn(invocation, stdin, Stdio::piped())?;

        let stdout_task = child
            .stdout
            .take()
            .map(|out| forward_lines(out, Sink::Stdout));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| forward_lines(err, Sink::Stderr));

        if let (Some(data), Some(mut stdin)) = (stdin_data, child.stdin.take()) {
            let written = async {
                stdin.write_all(data).await?;
                stdin.shutdown().await
            }
            .await;
            match written {
                Ok(()) => {}
                // The child exited without reading; its status decides the outcome.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    debug!(%command, "stdin closed before all input was written");
                }
                Err(e) => return Err(ExecError::StdinWrite { command, source: e }),
            }
        }

        let status = self.wait(&mut child, &command, cancel).await;

        // Drain whatever is left in the pipes before reporting.
        for task in [stdout_task, stderr_task].into_iter().flatten() {
            if let Err(e) = task.await {
                warn!(%command, error = %e, "output forwarder panicked");
            }
        }

        check_status(status?, command)
    }
}

impl CommandExecutor for RealExecutor {
    async fn exec(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<String, ExecError> {
        let command = invocation.to_string();
        let mut child = self.spawn(invocation, Stdio::null(), Stdio::inherit())?;

        let stdout = child.stdout.take();
        let reader = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut out) = stdout {
                out.read_to_end(&mut buf).await?;
            }
            Ok::<_, std::io::Error>(buf)
        });

        let status = self.wait(&mut child, &command, cancel).await?;
        let captured = reader
            .await
            .map_err(std::io::Error::other)
            .and_then(|read| read)
            .map_err(|e| ExecError::Wait {
                command: command.clone(),
                source: e,
            })?;

        check_status(status, command.clone())?;
        String::from_utf8(captured).map_err(|e| ExecError::InvalidUtf8 { command, source: e })
    }

    async fn exec_streaming(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<(), ExecError> {
        self.run_streaming(invocation, None, cancel).await
    }

    async fn exec_streaming_with_stdin(
        &self,
        invocation: &Invocation,
        stdin_data: &[u8],
        cancel: &CancellationToken,
    ) -> Result<(), ExecError> {
        self.run_streaming(invocation, Some(stdin_data), cancel).await
    }
}

#[derive(Clone, Copy)]
enum Sink {
    Stdout,
    Stderr,
}

impl Sink {
    fn write(self, line: &[u8]) {
        let text = String::from_utf8_lossy(line);
        match self {
            Sink::Stdout => print!("{text}"),
            Sink::Stderr => eprint!("{text}"),
        }
    }
}

/// Forward child output line by line until EOF.
///
/// Lines are raw bytes; anything that is not UTF-8 is shown lossily. The pipe
/// is always drained to EOF so the child never sees a closed reader.
fn forward_lines<R>(reader: R, sink: Sink) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => sink.write(&line),
                Err(e) => {
                    warn!(error = %e, "stopped forwarding child output");
                    if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                        warn!(error = %e, "failed to drain child output");
                    }
                    break;
                }
            }
        }
    })
}

async fn kill(child: &mut Child, command: &str) {
    if let Err(e) = child.kill().await {
        warn!(%command, error = %e, "failed to kill process");
    }
}

fn check_status(status: ExitStatus, command: String) -> Result<(), ExecError> {
    if status.success() {
        Ok(())
    } else {
        Err(ExecError::Failed {
            command,
            code: status.code(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Invocation {
        Invocation::new("sh", ["-c", script])
    }

    #[tokio::test]
    async fn exec_captures_stdout() {
        let out = RealExecutor::new()
            .exec(&Invocation::new("echo", ["hello"]), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out, "hello\n");
    }

    #[tokio::test]
    async fn exec_reports_failure_code() {
        let err = RealExecutor::new()
            .exec(&sh("exit 4"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::Failed { code: Some(4), .. }));
    }

    #[tokio::test]
    async fn streaming_propagates_exit_code() {
        let err = RealExecutor::new()
            .exec_streaming(
                &sh("echo building; echo oops >&2; exit 3"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn streaming_success() {
        RealExecutor::new()
            .exec_streaming(&sh("echo one; echo two >&2"), &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_program_is_not_found() {
        let err = RealExecutor::new()
            .exec_streaming(
                &Invocation::new("definitely-not-a-real-binary-xyz", Vec::<String>::new()),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::NotFound { .. }));
    }

    #[tokio::test]
    async fn non_executable_file_is_not_reported_as_missing() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("deploy.sh");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o644)).unwrap();

        let err = RealExecutor::new()
            .exec_streaming(
                &Invocation::new(script.to_str().unwrap(), Vec::<String>::new()),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::Spawn { .. }));
        assert_eq!(err.exit_code(), crate::error::EXIT_NOT_EXECUTABLE);
    }

    #[tokio::test]
    async fn non_utf8_output_does_not_fail_successful_child() {
        // Enough output after the bad byte to overflow the pipe buffer.
        let script = r#"printf 'caf\351\n'; printf 'caf\351\n' >&2
i=0; while [ $i -lt 20000 ]; do echo "layer $i"; i=$((i+1)); done
exit 0"#;

        let result = RealExecutor::new()
            .exec_streaming(&sh(script), &CancellationToken::new())
            .await;

        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn non_utf8_output_keeps_child_exit_code() {
        let err = RealExecutor::new()
            .exec_streaming(
                &sh(r#"printf '\377\376\n'; echo after; exit 5"#),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::Failed { code: Some(5), .. }));
    }

    #[tokio::test]
    async fn stdin_is_piped_to_child() {
        RealExecutor::new()
            .exec_streaming_with_stdin(
                &sh(r#"read line; test "$line" = hunter2"#),
                b"hunter2\n",
                &CancellationToken::new(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn timeout_kills_long_running_child() {
        let err = RealExecutor::new()
            .with_timeout(Some(Duration::from_millis(100)))
            .exec_streaming(&Invocation::new("sleep", ["5"]), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::TimedOut { .. }));
    }

    #[tokio::test]
    async fn cancelled_token_kills_child() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = RealExecutor::new()
            .exec_streaming(&Invocation::new("sleep", ["5"]), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::Cancelled { .. }));
    }
}

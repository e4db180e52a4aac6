//! Runtime command execution.

use crate::error::RunnerError;
use crate::stage::RuntimeCommand;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// Captured result of a runtime command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (0 = success, -1 when killed by a signal).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    pub fn failure(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            duration_ms: 0,
        }
    }

    /// Whether the command exited 0.
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes runtime commands. Only exit code and output streams are
/// inspected; stdin is never used.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion, or until `timeout` elapses.
    async fn run(
        &self,
        command: &RuntimeCommand,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, RunnerError>;
}

/// Runs commands as child processes of this one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        command: &RuntimeCommand,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, RunnerError> {
        let start = Instant::now();

        if command.program.is_empty() {
            return Err(RunnerError::EmptyCommand);
        }

        debug!(command = %command, "Spawning runtime command");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            program: command.program.clone(),
            source,
        })?;

        let wait = child.wait_with_output();
        let output = match timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| RunnerError::Timeout {
                    secs: limit.as_secs(),
                })?,
            None => wait.await,
        }
        .map_err(|source| RunnerError::Spawn {
            program: command.program.clone(),
            source,
        })?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> RuntimeCommand {
        RuntimeCommand::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[test]
    fn test_output_passed() {
        assert!(CommandOutput::success("ok").passed());
        assert!(!CommandOutput::failure(1, "", "error").passed());
    }

    #[tokio::test]
    async fn test_execute_simple_command() {
        let result = ProcessRunner
            .run(&sh("echo hello"), None)
            .await
            .expect("execute failed");
        assert!(result.passed());
        assert!(result.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_execute_captures_stderr_and_exit_code() {
        let result = ProcessRunner
            .run(&sh("echo oops >&2; exit 3"), None)
            .await
            .expect("execute failed");
        assert_eq!(result.exit_code, 3);
        assert!(result.stderr.contains("oops"));
        assert!(result.stdout.is_empty());
    }

    #[tokio::test]
    async fn test_execute_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), "x").unwrap();

        let cmd = sh("ls").in_dir(dir.path().to_path_buf());
        let result = ProcessRunner.run(&cmd, None).await.unwrap();
        assert!(result.stdout.contains("marker"));
    }

    #[tokio::test]
    async fn test_execute_times_out() {
        let err = ProcessRunner
            .run(&sh("sleep 5"), Some(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let cmd = RuntimeCommand::new("scorebox-no-such-binary", vec![]);
        let err = ProcessRunner.run(&cmd, None).await.unwrap_err();
        assert!(matches!(err, RunnerError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_empty_program_rejected() {
        let cmd = RuntimeCommand::new("", vec![]);
        let err = ProcessRunner.run(&cmd, None).await.unwrap_err();
        assert!(matches!(err, RunnerError::EmptyCommand));
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-process executor: spawns an external agent CLI inside the
//! Step's working directory, feeds it the prompt on stdin, and maps
//! exit code / stdout to an `ExecutionOutcome` (spec §6.2).

use crate::executor::{ExecutionOutcome, ExecutionRequest, Executor, ExecutorError};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

pub struct CliExecutor {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl CliExecutor {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self { program: program.into(), args, timeout }
    }
}

#[async_trait]
impl Executor for CliExecutor {
    async fn execute(&self, request: ExecutionRequest, cancel: CancellationToken) -> Result<ExecutionOutcome, ExecutorError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&request.working_directory)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(request.prompt.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(ExecutorError::Cancelled),
            result = tokio::time::timeout(self.timeout, child.wait_with_output()) => {
                match result {
                    Ok(Ok(output)) => output,
                    Ok(Err(source)) => return Err(ExecutorError::Io(source)),
                    Err(_) => return Err(ExecutorError::Timeout),
                }
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            Ok(ExecutionOutcome::ok(
                serde_json::json!({ "stdout": stdout }),
                request.context.step_id.to_string(),
            ))
        } else {
            Ok(ExecutionOutcome::failure(format!(
                "{} exited with {:?}: {}",
                self.program,
                output.status.code(),
                stderr.trim()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutionContext;
    use std::path::PathBuf;

    fn request(prompt: &str) -> ExecutionRequest {
        ExecutionRequest {
            working_directory: PathBuf::from("."),
            prompt: prompt.to_string(),
            context: ExecutionContext::default(),
        }
    }

    #[tokio::test]
    async fn execute_succeeds_for_zero_exit_status() {
        let executor = CliExecutor::new("cat", vec![], Duration::from_secs(5));
        let outcome = executor.execute(request("echoed back"), CancellationToken::new()).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.output.unwrap()["stdout"], "echoed back");
    }

    #[tokio::test]
    async fn execute_reports_failure_for_nonzero_exit_status() {
        let executor = CliExecutor::new("sh", vec!["-c".to_string(), "exit 3".to_string()], Duration::from_secs(5));
        let outcome = executor.execute(request("ignored"), CancellationToken::new()).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("exited with"));
    }

    #[tokio::test]
    async fn execute_times_out_for_long_running_process() {
        let executor = CliExecutor::new("sleep", vec!["5".to_string()], Duration::from_millis(50));
        let err = executor.execute(request("ignored"), CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Timeout));
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for spawning child processes with a timeout and
//! killing the whole process tree if it's exceeded.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Timeout applied to `git worktree add`/`remove` invocations.
pub const GIT_WORKTREE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("{label} timed out after {timeout:?}")]
    TimedOut { label: String, timeout: Duration },
    #[error("{label} failed to spawn: {source}")]
    Spawn { label: String, #[source] source: std::io::Error },
}

/// Run `cmd` to completion, killing it if it outlives `timeout`.
///
/// On unix, `cmd` is spawned into its own process group; on timeout,
/// `SIGKILL` is sent to that whole group, not just the direct child, so
/// grandchildren spawned by shell wrappers or build tools don't outlive
/// the timeout. On other platforms only the direct child is killed, via
/// `kill_on_drop`. Callers must not assume the process is still running
/// after this returns `RunError::TimedOut`.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    label: &str,
) -> Result<Output, RunError> {
    cmd.kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn().map_err(|source| RunError::Spawn { label: label.to_string(), source })?;
    let pid = child.id();

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(RunError::Spawn { label: label.to_string(), source }),
        Err(_) => {
            kill_process_group(pid);
            Err(RunError::TimedOut { label: label.to_string(), timeout })
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid else { return };
    let _ = nix::sys::signal::killpg(nix::unistd::Pid::from_raw(pid as i32), nix::sys::signal::Signal::SIGKILL);
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

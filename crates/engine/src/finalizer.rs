// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commits the Story's worktree, optionally squashes and opens a pull
//! request, on the last wave's gate passing (spec §4.9).

use std::time::Duration;
use story_adapters::{run_with_timeout, RunError};
use story_core::Story;
use tokio::process::Command;

const FINALIZE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    #[error("story has no worktree")]
    NoWorktree,
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("git command failed: {0}")]
    Git(String),
}

#[derive(Debug, Clone)]
pub struct FinalizeRequest {
    pub commit_message: Option<String>,
    pub squash: bool,
    pub create_pull_request: bool,
    pub pr_title: Option<String>,
    pub draft: bool,
}

impl Default for FinalizeRequest {
    fn default() -> Self {
        Self { commit_message: None, squash: true, create_pull_request: false, pr_title: None, draft: false }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FinalizeOutcome {
    pub pull_request_url: Option<String>,
}

pub struct Finalizer;

impl Finalizer {
    pub fn new() -> Self {
        Self
    }

    pub async fn finalize(&self, story: &Story, request: &FinalizeRequest) -> Result<FinalizeOutcome, FinalizeError> {
        let worktree = story.worktree_path.clone().ok_or(FinalizeError::NoWorktree)?;
        let message = request.commit_message.clone().unwrap_or_else(|| format!("{}\n\n{}", story.title, story.description));

        run_git(&worktree, &["add", "-A"]).await?;
        // Nothing staged is not an error: a Story whose agents made no
        // filesystem changes still finalizes cleanly.
        if has_staged_changes(&worktree).await? {
            run_git(&worktree, &["commit", "-m", &message]).await?;
        }

        if request.squash {
            self.squash(story, &worktree, &message).await?;
        }

        let mut outcome = FinalizeOutcome::default();
        if request.create_pull_request {
            let branch = story.git_branch.clone().unwrap_or_default();
            run_git(&worktree, &["push", "-u", "origin", &branch]).await?;
            outcome.pull_request_url = self.open_pull_request(story, &worktree, request).await?;
        }

        Ok(outcome)
    }

    async fn squash(&self, story: &Story, worktree: &std::path::Path, message: &str) -> Result<(), FinalizeError> {
        let Some(repo) = &story.repository_path else {
            return Ok(());
        };
        let base_output = run_git(repo, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        let base = String::from_utf8_lossy(&base_output.stdout).trim().to_string();
        if base.is_empty() || base == "HEAD" {
            return Ok(());
        }

        let merge_base_output = run_git(worktree, &["merge-base", "HEAD", &base]).await?;
        let merge_base = String::from_utf8_lossy(&merge_base_output.stdout).trim().to_string();
        if merge_base.is_empty() {
            return Ok(());
        }

        run_git(worktree, &["reset", "--soft", &merge_base]).await?;
        if has_staged_changes(worktree).await? {
            run_git(worktree, &["commit", "-m", message]).await?;
        }
        Ok(())
    }

    async fn open_pull_request(
        &self,
        story: &Story,
        worktree: &std::path::Path,
        request: &FinalizeRequest,
    ) -> Result<Option<String>, FinalizeError> {
        let title = request.pr_title.clone().unwrap_or_else(|| story.title.clone());
        let mut args = vec!["pr", "create", "--title", &title, "--body", &story.description];
        if request.draft {
            args.push("--draft");
        }
        let mut cmd = Command::new("gh");
        cmd.current_dir(worktree).args(&args);
        let output = run_with_timeout(cmd, FINALIZE_TIMEOUT, "gh pr create").await?;
        if !output.status.success() {
            return Err(FinalizeError::Git(String::from_utf8_lossy(&output.stderr).to_string()));
        }
        let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if url.is_empty() { None } else { Some(url) })
    }
}

impl Default for Finalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// `git -C <dir> <args>`, erroring on a non-zero exit (used for
/// plumbing commands whose output the caller needs).
async fn run_git(dir: &std::path::Path, args: &[&str]) -> Result<std::process::Output, FinalizeError> {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(dir).args(args);
    let output = run_with_timeout(cmd, FINALIZE_TIMEOUT, "git").await?;
    if !output.status.success() {
        return Err(FinalizeError::Git(String::from_utf8_lossy(&output.stderr).to_string()));
    }
    Ok(output)
}

/// `git diff --cached --quiet` exits 0 when there is nothing staged and
/// 1 when there is; neither is a failure.
async fn has_staged_changes(dir: &std::path::Path) -> Result<bool, FinalizeError> {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(dir).args(["diff", "--cached", "--quiet"]);
    let output = run_with_timeout(cmd, FINALIZE_TIMEOUT, "git diff --cached --quiet").await?;
    Ok(!output.status.success())
}

#[cfg(test)]
#[path = "finalizer_tests.rs"]
mod tests;

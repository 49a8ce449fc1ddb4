// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WorktreeManager (spec §4.2): scoped acquisition of a per-Story git
//! worktree on a fresh branch off the repository's default branch.

use crate::subprocess::{run_with_timeout, RunError, GIT_WORKTREE_TIMEOUT};
use std::path::{Path, PathBuf};
use story_core::Story;
use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum WorktreeError {
    #[error("story has no repository_path set")]
    NoRepository,
    #[error("git worktree add failed: {0}")]
    AddFailed(String),
    #[error("git worktree remove failed: {0}")]
    RemoveFailed(String),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct WorktreeManager;

impl WorktreeManager {
    pub fn new() -> Self {
        Self
    }

    /// If `story.worktree_path` is already set and exists on disk, return
    /// it unchanged. Otherwise create a sibling worktree directory on a
    /// fresh `feature/story-<shortid>` branch and assign both fields on
    /// `story` (caller is responsible for persisting the Story).
    pub async fn ensure_worktree(&self, story: &mut Story) -> Result<PathBuf, WorktreeError> {
        if let Some(path) = &story.worktree_path {
            if path.exists() {
                return Ok(path.clone());
            }
        }

        let repo_path = story.repository_path.clone().ok_or(WorktreeError::NoRepository)?;
        let repo_name = repo_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "repo".to_string());
        let parent = repo_path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
        let short_id = story.id.short(8);
        let worktree_path = parent.join(format!("{repo_name}-wt-{short_id}"));
        let branch = format!("feature/story-{short_id}");

        let mut cmd = Command::new("git");
        cmd.args([
            "-C",
            &repo_path.display().to_string(),
            "worktree",
            "add",
            "-b",
            &branch,
            &worktree_path.display().to_string(),
            "HEAD",
        ]);
        let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "git worktree add").await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(WorktreeError::AddFailed(stderr));
        }

        story.worktree_path = Some(worktree_path.clone());
        story.git_branch = Some(branch);
        Ok(worktree_path)
    }

    /// Remove the worktree and clear the Story's fields. Tolerates a
    /// missing directory; inability to destroy is logged and surfaced
    /// to the caller but never blocks Story deletion (spec §4.2).
    pub async fn destroy_worktree(&self, story: &mut Story) -> Result<(), WorktreeError> {
        let Some(path) = story.worktree_path.take() else {
            return Ok(());
        };
        story.git_branch = None;

        if !path.exists() {
            return Ok(());
        }

        let mut cmd = Command::new("git");
        cmd.args(["worktree", "remove", "--force", &path.display().to_string()]);
        let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "git worktree remove").await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            tracing::warn!(path = %path.display(), error = %stderr, "git worktree remove failed");
            return Err(WorktreeError::RemoveFailed(stderr));
        }
        Ok(())
    }
}

impl Default for WorktreeManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;

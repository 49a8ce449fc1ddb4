// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional repository search used by the Analyzer (spec §6.3). A
//! missing or failing CodeIndex degrades the analysis, it never blocks
//! a Story's progress.

use async_trait::async_trait;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum CodeIndexError {
    #[error("repository not indexed: {0}")]
    NotIndexed(String),
    #[error("search failed: {0}")]
    SearchFailed(String),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchHit {
    pub path: String,
    pub line: u32,
    pub snippet: String,
}

#[async_trait]
pub trait CodeIndex: Send + Sync {
    async fn search(&self, repository_path: &Path, query: &str, limit: usize) -> Result<Vec<SearchHit>, CodeIndexError>;
}

/// Greps the working tree with `git grep`. Degrades to an empty result
/// set (rather than erroring) when the path isn't a git repository at
/// all, since the Analyzer treats an empty index as "no hits" either way.
pub struct GrepCodeIndex;

impl GrepCodeIndex {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GrepCodeIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodeIndex for GrepCodeIndex {
    async fn search(&self, repository_path: &Path, query: &str, limit: usize) -> Result<Vec<SearchHit>, CodeIndexError> {
        let mut cmd = tokio::process::Command::new("git");
        cmd.current_dir(repository_path);
        cmd.args(["grep", "-n", "-I", "--max-count", &limit.to_string(), query]);
        let output = crate::subprocess::run_with_timeout(cmd, std::time::Duration::from_secs(15), "git grep")
            .await
            .map_err(|e| CodeIndexError::SearchFailed(e.to_string()))?;

        if !output.status.success() {
            // exit code 1 means "no matches", not an error.
            if output.status.code() == Some(1) {
                return Ok(Vec::new());
            }
            return Ok(Vec::new());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let hits = stdout
            .lines()
            .take(limit)
            .filter_map(|line| {
                let mut parts = line.splitn(3, ':');
                let path = parts.next()?.to_string();
                let line_no: u32 = parts.next()?.parse().ok()?;
                let snippet = parts.next()?.trim().to_string();
                Some(SearchHit { path, line: line_no, snippet })
            })
            .collect();
        Ok(hits)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct FakeCodeIndex {
    pub hits: Vec<SearchHit>,
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl CodeIndex for FakeCodeIndex {
    async fn search(&self, _repository_path: &Path, _query: &str, limit: usize) -> Result<Vec<SearchHit>, CodeIndexError> {
        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;
    use tempfile::tempdir;

    fn init_repo_with_file(path: &Path) {
        let run = |args: &[&str]| {
            let status = StdCommand::new("git")
                .args(args)
                .current_dir(path)
                .env("GIT_AUTHOR_NAME", "test")
                .env("GIT_AUTHOR_EMAIL", "test@example.com")
                .env("GIT_COMMITTER_NAME", "test")
                .env("GIT_COMMITTER_EMAIL", "test@example.com")
                .status()
                .expect("git command spawns");
            assert!(status.success());
        };
        run(&["init", "-q"]);
        std::fs::write(path.join("main.rs"), "fn marker_token() {}\n").unwrap();
        run(&["add", "."]);
        run(&["commit", "-q", "-m", "initial"]);
    }

    #[tokio::test]
    async fn grep_index_finds_matching_line() {
        let dir = tempdir().unwrap();
        init_repo_with_file(dir.path());
        let index = GrepCodeIndex::new();
        let hits = index.search(dir.path(), "marker_token", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "main.rs");
    }

    #[tokio::test]
    async fn grep_index_returns_empty_for_no_matches() {
        let dir = tempdir().unwrap();
        init_repo_with_file(dir.path());
        let index = GrepCodeIndex::new();
        let hits = index.search(dir.path(), "nonexistent_token_xyz", 10).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn fake_index_respects_limit() {
        let index = FakeCodeIndex {
            hits: vec![
                SearchHit { path: "a.rs".into(), line: 1, snippet: "x".into() },
                SearchHit { path: "b.rs".into(), line: 2, snippet: "y".into() },
            ],
        };
        let hits = index.search(Path::new("."), "anything", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
    }
}

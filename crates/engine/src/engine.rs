// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composition root exposing the orchestration request surface (spec
//! §6.4) as a single struct, in place of a global service registry
//! (redesign flag, spec §9).

use crate::finalizer::{FinalizeOutcome, FinalizeRequest};
use crate::orchestrator::{CreateStoryRequest, Orchestrator, OrchestratorError};
use crate::verification::{VerificationEngine, VerificationError, VerificationResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use story_adapters::{WorktreeError, WorktreeManager};
use story_core::{Clock, Step, StepId, Story, StoryId};
use story_storage::{Store, StoreError, StoryFilter};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Worktree(#[from] WorktreeError),
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error(transparent)]
    Run(#[from] story_adapters::RunError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which rendered artifact to produce for [`Engine::export_artifacts`]
/// (spec §6.4/§6.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ExportKind {
    Research,
    Plan,
    Changes,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ExportedArtifact {
    pub kind: ExportKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ExportOutcome {
    pub exported: Vec<ExportedArtifact>,
    pub warnings: Vec<String>,
}

pub struct Engine<C: Clock + 'static> {
    store: Arc<dyn Store>,
    worktrees: Arc<WorktreeManager>,
    orchestrator: Orchestrator<C>,
    verification: VerificationEngine,
}

impl<C: Clock + 'static> Engine<C> {
    pub fn new(store: Arc<dyn Store>, worktrees: Arc<WorktreeManager>, orchestrator: Orchestrator<C>, verification: VerificationEngine) -> Self {
        Self { store, worktrees, orchestrator, verification }
    }

    pub async fn create_story(&self, request: CreateStoryRequest) -> Result<Story, EngineError> {
        Ok(self.orchestrator.create_story(request).await?)
    }

    pub async fn list_stories(&self, filter: &StoryFilter) -> Result<Vec<Story>, EngineError> {
        Ok(self.store.list(filter).await?)
    }

    pub async fn get_story(&self, id: StoryId) -> Result<Story, EngineError> {
        Ok(self.store.get_by_id_with_steps(id).await?)
    }

    /// Best-effort worktree teardown followed by a hard delete; an
    /// inability to destroy the worktree is logged but never blocks
    /// deletion of the Story record (spec §4.2).
    pub async fn delete_story(&self, id: StoryId) -> Result<(), EngineError> {
        let mut story = self.store.get_by_id(id).await?;
        if let Err(err) = self.worktrees.destroy_worktree(&mut story).await {
            tracing::warn!(story_id = %id, error = %err, "worktree_destroy_failed, deleting story record anyway");
        }
        Ok(self.store.delete(id).await?)
    }

    /// Crash recovery sweep (spec §4.8); safe to call at the start of
    /// every invocation since there is no long-lived daemon.
    pub async fn recover(&self) -> Result<(), EngineError> {
        Ok(self.orchestrator.recover().await?)
    }

    pub async fn analyze_story(&self, id: StoryId) -> Result<Story, EngineError> {
        Ok(self.orchestrator.analyze_story(id).await?)
    }

    pub async fn plan_story(&self, id: StoryId, config: Option<crate::decomposer::DecomposeConfig>) -> Result<Story, EngineError> {
        Ok(self.orchestrator.plan_story(id, config).await?)
    }

    pub async fn run_story(&self, id: StoryId) -> Result<Story, EngineError> {
        Ok(self.orchestrator.run_story(id).await?)
    }

    pub async fn approve_step(&self, story_id: StoryId, step_id: StepId, approved: bool, feedback: Option<String>) -> Result<Step, EngineError> {
        Ok(self.orchestrator.approve_step(story_id, step_id, approved, feedback).await?)
    }

    pub async fn resume_gate(&self, id: StoryId) -> Result<Story, EngineError> {
        Ok(self.orchestrator.resume_gate(id).await?)
    }

    pub async fn cancel_story(&self, id: StoryId) -> Result<Story, EngineError> {
        Ok(self.orchestrator.cancel_story(id).await?)
    }

    pub async fn finalize_story(&self, id: StoryId, request: FinalizeRequest) -> Result<FinalizeOutcome, EngineError> {
        let story = self.orchestrator.finalize_story(id, request).await?;
        Ok(FinalizeOutcome { pull_request_url: story.pull_request_url })
    }

    /// Standalone verification, independent of any Story (spec §A.6).
    pub async fn verify(&self, path: &Path) -> Result<VerificationResult, EngineError> {
        Ok(self.verification.verify(path).await?)
    }

    pub async fn export_artifacts(&self, id: StoryId, output_path: Option<PathBuf>, include: &[ExportKind]) -> Result<ExportOutcome, EngineError> {
        let story = self.store.get_by_id_with_steps(id).await?;
        let root = output_path.unwrap_or_else(|| PathBuf::from(".story").join("exports").join(story.id.short(8)));
        std::fs::create_dir_all(&root)?;

        let mut outcome = ExportOutcome::default();
        for kind in include {
            match kind {
                ExportKind::Research => {
                    let path = root.join("research.md");
                    std::fs::write(&path, render_research(&story))?;
                    outcome.exported.push(ExportedArtifact { kind: *kind, path });
                }
                ExportKind::Plan => {
                    let path = root.join("plan.md");
                    std::fs::write(&path, render_plan(&story))?;
                    outcome.exported.push(ExportedArtifact { kind: *kind, path });
                }
                ExportKind::Changes => match render_changes(&story).await {
                    Ok(markdown) => {
                        let path = root.join("changes.md");
                        std::fs::write(&path, markdown)?;
                        outcome.exported.push(ExportedArtifact { kind: *kind, path });
                    }
                    Err(err) => outcome.warnings.push(format!("changes: {err}")),
                },
            }
        }
        Ok(outcome)
    }
}

/// Deterministic markdown rendering of `analyzedContext`; a pure
/// function of persisted state so re-exporting is idempotent (spec §6.5).
fn render_research(story: &Story) -> String {
    let mut out = format!("# Research: {}\n\n", story.title);
    let Some(context) = &story.analyzed_context else {
        out.push_str("_No analysis has been recorded for this story yet._\n");
        return out;
    };
    let summary = context.get("summary").and_then(|v| v.as_str()).unwrap_or_default();
    out.push_str(&format!("## Summary\n\n{summary}\n\n"));
    for (heading, key) in [("Core requirements", "coreRequirements"), ("Technical constraints", "technicalConstraints"), ("Affected files", "affectedFiles")] {
        let Some(items) = context.get(key).and_then(|v| v.as_array()) else { continue };
        out.push_str(&format!("## {heading}\n\n"));
        for item in items {
            if let Some(text) = item.as_str() {
                out.push_str(&format!("- {text}\n"));
            }
        }
        out.push('\n');
    }
    if let Some(approach) = context.get("suggestedApproach").and_then(|v| v.as_str()) {
        out.push_str(&format!("## Suggested approach\n\n{approach}\n"));
    }
    out
}

fn render_plan(story: &Story) -> String {
    let mut out = format!("# Plan: {}\n\n", story.title);
    if story.steps.is_empty() {
        out.push_str("_No steps have been planned for this story yet._\n");
        return out;
    }
    let last_wave = story.last_wave();
    for wave in 1..=last_wave {
        out.push_str(&format!("## Wave {wave}\n\n"));
        for step in story.steps_in_wave(wave) {
            out.push_str(&format!("- **{}** ({}) — {}\n", step.name, step.status, step.description));
        }
        out.push('\n');
    }
    out
}

async fn render_changes(story: &Story) -> Result<String, EngineError> {
    use std::time::Duration;
    use story_adapters::run_with_timeout;
    use tokio::process::Command;

    let Some(worktree) = &story.worktree_path else {
        return Ok(format!("# Changes: {}\n\n_No worktree has been materialized for this story._\n", story.title));
    };
    let Some(repo) = &story.repository_path else {
        return Ok(format!("# Changes: {}\n\n_No repository is associated with this story._\n", story.title));
    };

    let timeout = Duration::from_secs(30);
    let mut base_cmd = Command::new("git");
    base_cmd.arg("-C").arg(repo).args(["rev-parse", "--abbrev-ref", "HEAD"]);
    let base_output = run_with_timeout(base_cmd, timeout, "git rev-parse").await?;
    let base = String::from_utf8_lossy(&base_output.stdout).trim().to_string();

    let mut diff_cmd = Command::new("git");
    diff_cmd.arg("-C").arg(worktree).args(["diff", &format!("{base}...HEAD")]);
    let diff_output = run_with_timeout(diff_cmd, timeout, "git diff").await?;
    let diff = String::from_utf8_lossy(&diff_output.stdout).to_string();

    let mut out = format!("# Changes: {}\n\n", story.title);
    if diff.trim().is_empty() {
        out.push_str("_No changes relative to the base branch._\n");
    } else {
        out.push_str("```diff\n");
        out.push_str(&diff);
        out.push_str("```\n");
    }
    Ok(out)
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

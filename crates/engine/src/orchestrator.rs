// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The top-level state machine (spec §4.8): threads C1–C7 together
//! across a Story's lifecycle. The sole mutator of `Story.status`.

use crate::analyzer::{Analyzer, AnalyzerError};
use crate::decomposer::{DecomposeConfig, Decomposer, DecomposerError};
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::finalizer::{FinalizeRequest, Finalizer};
use crate::gate::GateController;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use story_adapters::WorktreeManager;
use story_core::{AutomationMode, Clock, GateMode, Step, Story, StoryId, StoryStatus};
use story_storage::{Store, StoreError};
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("story {0} not found")]
    NotFound(StoryId),
    #[error("invalid state for this operation: {0}")]
    InvalidState(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Debug, Clone, Default)]
pub struct CreateStoryRequest {
    pub title: String,
    pub description: String,
    pub repository_path: Option<PathBuf>,
    pub automation_mode: Option<AutomationMode>,
    pub issue_url: Option<String>,
    pub dispatch_target: Option<String>,
    pub max_parallelism: Option<u32>,
    pub gate_mode: Option<GateMode>,
}

pub struct Orchestrator<C: Clock + 'static> {
    store: Arc<dyn Store>,
    worktrees: Arc<WorktreeManager>,
    analyzer: Arc<Analyzer>,
    decomposer: Arc<Decomposer>,
    dispatcher: Arc<Dispatcher<C>>,
    gate: Arc<GateController>,
    finalizer: Arc<Finalizer>,
    clock: C,
    cancellations: parking_lot::Mutex<HashMap<StoryId, CancellationToken>>,
}

impl<C: Clock + 'static> Orchestrator<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        worktrees: Arc<WorktreeManager>,
        analyzer: Arc<Analyzer>,
        decomposer: Arc<Decomposer>,
        dispatcher: Arc<Dispatcher<C>>,
        gate: Arc<GateController>,
        finalizer: Arc<Finalizer>,
        clock: C,
    ) -> Self {
        Self {
            store,
            worktrees,
            analyzer,
            decomposer,
            dispatcher,
            gate,
            finalizer,
            clock,
            cancellations: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub async fn create_story(&self, request: CreateStoryRequest) -> Result<Story, OrchestratorError> {
        let now = self.clock.epoch_ms();
        let story = Story {
            id: StoryId::new(),
            title: request.title,
            description: request.description,
            repository_path: request.repository_path,
            status: StoryStatus::Created,
            worktree_path: None,
            git_branch: None,
            analyzed_context: None,
            execution_plan: None,
            current_wave: 0,
            gate_mode: request.gate_mode.unwrap_or_default(),
            gate_result: None,
            max_parallelism: request.max_parallelism.unwrap_or_else(Story::default_max_parallelism),
            dispatch_target: request.dispatch_target.unwrap_or_else(|| "default".to_string()),
            automation_mode: request.automation_mode.unwrap_or_default(),
            issue_url: request.issue_url,
            created_at_ms: now,
            updated_at_ms: now,
            completed_at_ms: None,
            pull_request_url: None,
            error: None,
            version: 0,
            steps: Vec::new(),
        };
        let mut story = self.store.create(story).await?;

        if story.repository_path.is_some() {
            match self.worktrees.ensure_worktree(&mut story).await {
                Ok(_) => {
                    story = self.store.update(story).await?;
                }
                Err(err) => {
                    tracing::warn!(story_id = %story.id, error = %err, "worktree_unavailable, failing story at creation");
                    story.status = StoryStatus::Failed;
                    story.error = Some(format!("worktree_unavailable: {err}"));
                    story = self.store.update(story).await?;
                }
            }
        }

        Ok(story)
    }

    pub async fn analyze_story(&self, id: StoryId) -> Result<Story, OrchestratorError> {
        let mut story = self.store.get_by_id_with_steps(id).await?;
        if story.status != StoryStatus::Created {
            // R1: idempotent — analyzing twice (or analyzing past Created) is a no-op.
            return Ok(story);
        }

        story.status = StoryStatus::Analyzing;
        story.updated_at_ms = self.clock.epoch_ms();
        story = self.store.update(story).await?;

        match self.analyzer.analyze(&story).await {
            Ok(context) => {
                story.analyzed_context = Some(serde_json::to_value(&context).unwrap_or(serde_json::Value::Null));
                story.status = StoryStatus::Analyzed;
            }
            Err(err) => {
                story.status = StoryStatus::Failed;
                story.error = Some(analyzer_error_kind(&err));
            }
        }
        story.updated_at_ms = self.clock.epoch_ms();
        Ok(self.store.update(story).await?)
    }

    pub async fn plan_story(&self, id: StoryId, config: Option<DecomposeConfig>) -> Result<Story, OrchestratorError> {
        let mut story = self.store.get_by_id_with_steps(id).await?;
        match story.status {
            StoryStatus::Planned | StoryStatus::Executing | StoryStatus::GatePending | StoryStatus::GateFailed | StoryStatus::Completed => {
                return Ok(story);
            }
            StoryStatus::Analyzed => {}
            _ => return Err(OrchestratorError::InvalidState(format!("cannot plan a Story in status {}", story.status))),
        }

        let Some(analyzed_context) = story.analyzed_context.clone() else {
            return Err(OrchestratorError::InvalidState("story has no analyzedContext".to_string()));
        };
        let context = match serde_json::from_value(analyzed_context) {
            Ok(context) => context,
            Err(err) => {
                story.status = StoryStatus::Failed;
                story.error = Some(format!("llm_parse_error: {err}"));
                return Ok(self.store.update(story).await?);
            }
        };

        story.status = StoryStatus::Planning;
        story.updated_at_ms = self.clock.epoch_ms();
        story = self.store.update(story).await?;

        let config = config.unwrap_or(DecomposeConfig { max_parallelism: story.max_parallelism, include_tests: true });

        match self.decomposer.decompose(&story, &context, &config).await {
            Ok(steps) => {
                let summary: Vec<_> = steps.iter().map(|s| serde_json::json!({"id": s.id, "title": s.name, "wave": s.wave})).collect();
                story.execution_plan = Some(serde_json::Value::Array(summary));
                story.steps = steps;
                story.status = StoryStatus::Planned;
            }
            Err(err) => {
                story.status = StoryStatus::Failed;
                story.error = Some(decomposer_error_kind(&err));
            }
        }
        story.updated_at_ms = self.clock.epoch_ms();
        Ok(self.store.update(story).await?)
    }

    pub async fn run_story(&self, id: StoryId) -> Result<Story, OrchestratorError> {
        let mut story = self.store.get_by_id_with_steps(id).await?;

        match story.status {
            StoryStatus::Completed | StoryStatus::Failed | StoryStatus::Cancelled => return Ok(story),
            StoryStatus::Planned => {
                story.current_wave = 1;
                story.status = StoryStatus::Executing;
                story.updated_at_ms = self.clock.epoch_ms();
                story = self.store.update(story).await?;
            }
            StoryStatus::GatePending => return self.resume_gate(id).await,
            // A GateFailed Story only leaves that state via approveStep
            // remediation (see DESIGN.md); runStory without remediation
            // is a no-op that returns the same state (spec §8 scenario 3).
            StoryStatus::GateFailed => return Ok(story),
            StoryStatus::Executing => {}
            _ => return Err(OrchestratorError::InvalidState(format!("cannot run a Story in status {}", story.status))),
        }

        self.drive_waves(story).await
    }

    /// Runs the Executing/GatePending loop to the next durable stopping
    /// point: a paused gate, a failed gate, completion, or a cancellation.
    async fn drive_waves(&self, mut story: Story) -> Result<Story, OrchestratorError> {
        loop {
            let wave = story.current_wave;
            let cancel = self.cancel_token_for(story.id);
            self.dispatcher.dispatch_wave(self.store.as_ref(), &story, wave, cancel.clone()).await?;
            self.cancellations.lock().remove(&story.id);

            story = self.store.get_by_id_with_steps(story.id).await?;

            if cancel.is_cancelled() {
                story.status = StoryStatus::Cancelled;
                story.updated_at_ms = self.clock.epoch_ms();
                return Ok(self.store.update(story).await?);
            }

            if !story.wave_is_finished(wave) {
                // Steps were skipped pending approval; stop and let the
                // caller re-invoke runStory once they are approved.
                return Ok(story);
            }

            story.status = StoryStatus::GatePending;
            story.updated_at_ms = self.clock.epoch_ms();
            story = self.store.update(story).await?;

            let gate_result = self.gate.evaluate(&story, wave).await;
            let passed = gate_result.is_pass();
            story.gate_result = Some(gate_result);
            story.updated_at_ms = self.clock.epoch_ms();

            if !passed {
                story.status = StoryStatus::GateFailed;
                return Ok(self.store.update(story).await?);
            }

            if story.gate_mode == GateMode::PauseAlways {
                return Ok(self.store.update(story).await?);
            }

            if wave >= story.last_wave() {
                story = self.store.update(story).await?;
                return self.finalize_internal(story, FinalizeRequest::default()).await;
            }

            story.current_wave = wave + 1;
            story.status = StoryStatus::Executing;
            story = self.store.update(story).await?;
        }
    }

    pub async fn resume_gate(&self, id: StoryId) -> Result<Story, OrchestratorError> {
        let mut story = self.store.get_by_id_with_steps(id).await?;
        if story.status != StoryStatus::GatePending {
            return Ok(story);
        }

        let wave = story.current_wave;
        let gate_result = self.gate.evaluate(&story, wave).await;
        let passed = gate_result.is_pass();
        story.gate_result = Some(gate_result);
        story.updated_at_ms = self.clock.epoch_ms();

        if !passed {
            story.status = StoryStatus::GateFailed;
            return Ok(self.store.update(story).await?);
        }

        if wave >= story.last_wave() {
            story = self.store.update(story).await?;
            return self.finalize_internal(story, FinalizeRequest::default()).await;
        }

        story.current_wave = wave + 1;
        story.status = StoryStatus::Executing;
        Ok(self.store.update(story).await?)
    }

    /// Also the sole remediation path out of GateFailed (spec §4.7, §8
    /// scenario 3): approving a failed Step in the current wave resets it
    /// to Pending and un-sticks the Story back to Executing, so the next
    /// `runStory` actually re-dispatches it (see DESIGN.md).
    pub async fn approve_step(
        &self,
        story_id: StoryId,
        step_id: story_core::StepId,
        approved: bool,
        feedback: Option<String>,
    ) -> Result<Step, OrchestratorError> {
        let mut story = self.store.get_by_id_with_steps(story_id).await?;
        let index = story.steps.iter().position(|s| s.id == step_id).ok_or(OrchestratorError::NotFound(story_id))?;
        let step = &mut story.steps[index];
        step.approval = Some(if approved { story_core::StepApproval::Approved } else { story_core::StepApproval::Rejected });
        step.approval_feedback = feedback;

        let remediating =
            approved && story.status == StoryStatus::GateFailed && step.wave == story.current_wave && step.status == story_core::StepStatus::Failed;
        if remediating {
            step.status = story_core::StepStatus::Pending;
            step.error = None;
            step.attempts += 1;
            story.status = StoryStatus::Executing;
        }

        story.updated_at_ms = self.clock.epoch_ms();
        let story = self.store.update(story).await?;
        Ok(story.steps[index].clone())
    }

    pub async fn cancel_story(&self, id: StoryId) -> Result<Story, OrchestratorError> {
        if let Some(token) = self.cancellations.lock().get(&id) {
            token.cancel();
        }

        let mut story = self.store.get_by_id_with_steps(id).await?;
        if story.status.is_terminal() {
            return Ok(story);
        }

        let now = self.clock.epoch_ms();
        for step in story.steps.iter_mut().filter(|s| s.status == story_core::StepStatus::Running) {
            step.fail("cancelled", now);
            self.store.update_step(step.clone()).await?;
        }

        story.status = StoryStatus::Cancelled;
        story.updated_at_ms = now;
        Ok(self.store.update(story).await?)
    }

    pub async fn finalize_story(&self, id: StoryId, request: FinalizeRequest) -> Result<Story, OrchestratorError> {
        let story = self.store.get_by_id_with_steps(id).await?;
        if story.status != StoryStatus::GatePending {
            return Err(OrchestratorError::InvalidState(format!(
                "finalize requires a passing gate, story is {}",
                story.status
            )));
        }
        if !story.gate_result.as_ref().is_some_and(|g| g.is_pass()) {
            return Err(OrchestratorError::InvalidState("last gateResult is not a pass".to_string()));
        }
        self.finalize_internal(story, request).await
    }

    async fn finalize_internal(&self, mut story: Story, request: FinalizeRequest) -> Result<Story, OrchestratorError> {
        match self.finalizer.finalize(&story, &request).await {
            Ok(outcome) => {
                story.pull_request_url = outcome.pull_request_url;
                story.status = StoryStatus::Completed;
                story.completed_at_ms = Some(self.clock.epoch_ms());
            }
            Err(err) => {
                tracing::warn!(story_id = %story.id, error = %err, "finalize_failure, story stays in current gate state");
                story.error = Some(format!("finalize_failure: {err}"));
            }
        }
        story.updated_at_ms = self.clock.epoch_ms();
        Ok(self.store.update(story).await?)
    }

    fn cancel_token_for(&self, id: StoryId) -> CancellationToken {
        let mut cancellations = self.cancellations.lock();
        cancellations.entry(id).or_insert_with(CancellationToken::new).clone()
    }

    /// Sweep Stories left in an in-flight status by a crash (spec §4.8).
    /// Runs at the start of every CLI invocation (§A.6) since there is no
    /// long-lived daemon to run it once at boot.
    pub async fn recover(&self) -> Result<(), OrchestratorError> {
        use story_storage::StoryFilter;

        for status in [StoryStatus::Analyzing, StoryStatus::Planning, StoryStatus::Executing, StoryStatus::GatePending] {
            let filter = StoryFilter { status: Some(status), repository_path: None };
            for mut story in self.store.list(&filter).await? {
                if status == StoryStatus::Analyzing {
                    story.status = StoryStatus::Created;
                } else if status == StoryStatus::Planning {
                    story.status = StoryStatus::Analyzed;
                } else if status == StoryStatus::Executing {
                    let now = self.clock.epoch_ms();
                    for step in story.steps.iter_mut().filter(|s| s.status == story_core::StepStatus::Running) {
                        step.fail("interrupted", now);
                        self.store.update_step(step.clone()).await?;
                    }
                    story.status = StoryStatus::GatePending;
                    story.updated_at_ms = now;
                    story = self.store.update(story).await?;
                    let gate_result = self.gate.evaluate(&story, story.current_wave).await;
                    story.gate_result = Some(gate_result);
                    self.store.update(story).await?;
                    continue;
                } else {
                    // Already GatePending: re-evaluate in case the worktree
                    // changed out from under a previous process.
                    let gate_result = self.gate.evaluate(&story, story.current_wave).await;
                    story.gate_result = Some(gate_result);
                    self.store.update(story).await?;
                    continue;
                }
                story.updated_at_ms = self.clock.epoch_ms();
                self.store.update(story).await?;
            }
        }
        Ok(())
    }
}

fn analyzer_error_kind(err: &AnalyzerError) -> String {
    match err {
        AnalyzerError::LlmUnavailable(msg) => format!("llm_unavailable: {msg}"),
        AnalyzerError::ParseError(msg) => format!("llm_parse_error: {msg}"),
    }
}

fn decomposer_error_kind(err: &DecomposerError) -> String {
    match err {
        DecomposerError::LlmUnavailable(msg) => format!("llm_unavailable: {msg}"),
        DecomposerError::ParseError(msg) => format!("llm_parse_error: {msg}"),
        DecomposerError::InvalidDependencies(msg) => format!("llm_parse_error: invalid dependencies: {msg}"),
        DecomposerError::Empty => "llm_parse_error: empty decomposition".to_string(),
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;

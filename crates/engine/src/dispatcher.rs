// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawns executions for every Pending Step of a wave, bounded by
//! `maxParallelism`, and collects a `WaveOutcome` (spec §4.6).

use std::sync::Arc;
use story_adapters::{ExecutionContext, ExecutionOutcome, ExecutionRequest, ExecutorError, ExecutorRegistry};
use story_core::{requires_approval, Clock, Step, StepId, Story, Task, Wave, WaveOutcome};
use story_storage::Store;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no executor registered for target {0}")]
    UnknownExecutor(String),
    #[error(transparent)]
    Store(#[from] story_storage::StoreError),
}

pub struct Dispatcher<C: Clock + 'static> {
    registry: Arc<ExecutorRegistry>,
    clock: C,
}

impl<C: Clock + 'static> Dispatcher<C> {
    pub fn new(registry: Arc<ExecutorRegistry>, clock: C) -> Self {
        Self { registry, clock }
    }

    /// Dispatch every Pending Step of `wave`, respecting the Story's
    /// `maxParallelism` and the shared `cancel` token (spec §4.6, §5).
    pub async fn dispatch_wave(
        &self,
        store: &dyn Store,
        story: &Story,
        wave: Wave,
        cancel: CancellationToken,
    ) -> Result<WaveOutcome, DispatchError> {
        let semaphore = Arc::new(Semaphore::new(story.max_parallelism.max(1) as usize));
        let mut outcome = WaveOutcome::default();

        let pending: Vec<Step> = story
            .steps_in_wave(wave)
            .filter(|s| s.status == story_core::StepStatus::Pending)
            .cloned()
            .collect();

        let mut handles = Vec::new();
        for step in pending {
            if requires_approval(story.automation_mode, &step) && step.approval != Some(story_core::StepApproval::Approved) {
                outcome.skipped_step_ids.push(step.id);
                continue;
            }

            let dispatch_target = step.executor_override.clone().unwrap_or_else(|| story.dispatch_target.clone());
            let Some(executor) = self.registry.resolve(&dispatch_target) else {
                return Err(DispatchError::UnknownExecutor(dispatch_target));
            };

            let permit = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let clock = self.clock.clone();
            let worktree = story.worktree_path.clone().unwrap_or_default();
            let story_id = story.id;
            outcome.started_step_ids.push(step.id);

            handles.push(tokio::spawn(async move {
                // The semaphore is owned by this dispatch_wave call and never closed.
                #[allow(clippy::expect_used)]
                let _permit = permit.acquire_owned().await.expect("semaphore not closed");
                let mut step = step;
                let agent_id = format!("{}-{}", story_id.short(8), step.id.short(8));
                step.begin_dispatch(agent_id, clock.epoch_ms());

                // The Step is projected into a Task for the duration of
                // execution (spec §3); the Task is the thing that actually
                // terminates, and its result is written back into the Step.
                let mut task = Task::from_step(&step);

                let request = ExecutionRequest {
                    working_directory: worktree,
                    prompt: task.description.clone(),
                    context: ExecutionContext {
                        story_id,
                        step_id: task.id,
                        capability: step.capability.clone(),
                        language: step.language.clone(),
                    },
                };

                let result = executor.execute(request, cancel.clone()).await;
                let now = clock.epoch_ms();
                match result {
                    Ok(ExecutionOutcome { success: true, output, .. }) => {
                        task.complete(output.unwrap_or(serde_json::Value::Null), now);
                    }
                    Ok(ExecutionOutcome { success: false, error, .. }) => {
                        task.fail(error.unwrap_or_else(|| "executor reported failure".to_string()), now);
                    }
                    Err(ExecutorError::Cancelled) => {
                        task.fail("cancelled", now);
                    }
                    Err(err) => {
                        task.fail(err.to_string(), now);
                    }
                }
                task.write_back(&mut step);
                step.assigned_agent_id = None;
                step
            }));
        }

        // Only Steps that have genuinely been re-executed (this is not
        // their first attempt) trigger downstream invalidation (spec §4.6
        // step 7); a step's first-ever completion must not flag anything.
        let mut reexecuted_ids = Vec::new();
        for handle in handles {
            // Dispatch tasks never panic; they only mutate and return a Step.
            #[allow(clippy::expect_used)]
            let step = handle.await.expect("dispatch task does not panic");
            match step.status {
                story_core::StepStatus::Completed => {
                    outcome.completed_step_ids.push(step.id);
                    if step.attempts > 1 {
                        reexecuted_ids.push(step.id);
                    }
                }
                story_core::StepStatus::Failed => outcome.failed_step_ids.push(step.id),
                _ => {}
            }
            store.update_step(step).await?;
        }

        invalidate_downstream(store, story, &reexecuted_ids).await?;

        Ok(outcome)
    }
}

/// Flag every Pending Step transitively dependent on a just re-executed
/// Step as `needsRework` (spec §4.6 step 7). Walks the `dependsOn` graph
/// to a fixpoint, so a Step two or more hops downstream of a rerun is
/// caught, not just its immediate dependents.
async fn invalidate_downstream(store: &dyn Store, story: &Story, reexecuted: &[StepId]) -> Result<(), DispatchError> {
    if reexecuted.is_empty() {
        return Ok(());
    }
    let mut affected: std::collections::HashSet<StepId> = reexecuted.iter().copied().collect();
    loop {
        let mut grew = false;
        for step in &story.steps {
            if step.status == story_core::StepStatus::Pending
                && !affected.contains(&step.id)
                && step.depends_on.iter().any(|dep| affected.contains(dep))
            {
                affected.insert(step.id);
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }

    for step in &story.steps {
        if step.status == story_core::StepStatus::Pending && affected.contains(&step.id) {
            let mut step = step.clone();
            step.flag_needs_rework();
            store.update_step(step).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;

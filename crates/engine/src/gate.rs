// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! After a wave finishes, invokes the VerificationEngine and classifies
//! the outcome per `gateMode` (spec §4.7).

use crate::verification::{VerificationEngine, VerificationError};
use story_core::{FailingStepDetail, GateResult, Story, Wave};

pub struct GateController {
    verification: VerificationEngine,
}

impl GateController {
    pub fn new(verification: VerificationEngine) -> Self {
        Self { verification }
    }

    /// Run verification against the Story's worktree and classify the
    /// result into a [`GateResult`] (spec §4.7).
    pub async fn evaluate(&self, story: &Story, wave: Wave) -> GateResult {
        let Some(worktree) = &story.worktree_path else {
            return GateResult::unavailable(wave, "story has no worktree");
        };

        match self.verification.verify(worktree).await {
            Ok(result) if result.success => {
                tracing::info!(story_id = %story.id, wave, summary = %result.summary, "gate passed");
                GateResult::passed(wave, result.summary)
            }
            Ok(result) => {
                let failing_steps = result
                    .step_results
                    .iter()
                    .filter(|r| r.required && !r.success)
                    .map(|r| FailingStepDetail {
                        project: r.project.clone(),
                        step_type: r.step_type.clone(),
                        reason: if r.timed_out { "timed out".to_string() } else { r.stderr.clone() },
                    })
                    .collect();
                tracing::warn!(story_id = %story.id, wave, summary = %result.summary, "gate failed");
                GateResult::failed(wave, result.summary, failing_steps)
            }
            Err(err) => {
                tracing::warn!(story_id = %story.id, wave, error = %err, "verification unavailable");
                GateResult::unavailable(wave, verification_unavailable_reason(&err))
            }
        }
    }
}

fn verification_unavailable_reason(err: &VerificationError) -> String {
    format!("verification_unavailable: {err}")
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;

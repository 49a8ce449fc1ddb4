// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task: a transient, dispatch-time projection of a Step (spec §3).
//!
//! Tasks exist only for the lifetime of a single Dispatcher invocation —
//! they are never persisted. The Step is always the source of truth;
//! a Task is written back into its owning Step the moment it terminates.

use crate::story::{Step, StepId, StepStatus};
use crate::wave::Wave;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: StepId,
    pub title: String,
    pub description: String,
    pub wave: Wave,
    pub depends_on: Vec<StepId>,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Task {
    /// Project a Step into its dispatch-time Task representation.
    pub fn from_step(step: &Step) -> Self {
        Self {
            id: step.id,
            title: step.name.clone(),
            description: step.description.clone(),
            wave: step.wave,
            depends_on: step.depends_on.clone(),
            status: step.status,
            started_at_ms: step.started_at_ms,
            completed_at_ms: step.completed_at_ms,
            output: step.output.clone(),
            error: step.error.clone(),
        }
    }

    /// Record a successful executor result on this Task.
    pub fn complete(&mut self, output: serde_json::Value, now_ms: u64) {
        self.output = Some(output);
        self.error = None;
        self.status = StepStatus::Completed;
        self.completed_at_ms = Some(now_ms);
    }

    /// Record a failed executor result on this Task.
    pub fn fail(&mut self, error: impl Into<String>, now_ms: u64) {
        self.error = Some(error.into());
        self.status = StepStatus::Failed;
        self.completed_at_ms = Some(now_ms);
    }

    /// Write this Task's terminal state back into the Step it was
    /// projected from (spec §3: "written back into the owning Step on
    /// termination").
    pub fn write_back(self, step: &mut Step) {
        step.status = self.status;
        step.output = self.output;
        step.error = self.error;
        step.completed_at_ms = self.completed_at_ms;
    }
}

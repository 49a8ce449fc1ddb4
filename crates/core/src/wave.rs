// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wave numbering and the result of dispatching one wave.

use crate::story::StepId;
use serde::{Deserialize, Serialize};

/// A 1-based wave number. Steps sharing a wave are independent and may
/// run in parallel; wave k+1 may not start until every Step of wave k
/// has reached a terminal status (spec §3 invariants 2–3).
pub type Wave = u32;

/// Result of dispatching every Pending Step of a wave (spec §4.6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaveOutcome {
    pub started_step_ids: Vec<StepId>,
    pub completed_step_ids: Vec<StepId>,
    pub failed_step_ids: Vec<StepId>,
    pub skipped_step_ids: Vec<StepId>,
}

impl WaveOutcome {
    /// The wave is finished once every started Step has reached a
    /// terminal status — i.e. nothing is left dangling in `Running`.
    pub fn is_finished(&self, total_started: usize) -> bool {
        self.completed_step_ids.len() + self.failed_step_ids.len() + self.skipped_step_ids.len()
            >= total_started
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finished_when_every_started_step_is_terminal() {
        let mut outcome = WaveOutcome::default();
        outcome.started_step_ids = vec![StepId::new(), StepId::new()];
        outcome.completed_step_ids = vec![outcome.started_step_ids[0]];
        assert!(!outcome.is_finished(2));
        outcome.failed_step_ids = vec![outcome.started_step_ids[1]];
        assert!(outcome.is_finished(2));
    }
}

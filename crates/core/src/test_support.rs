// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared proptest strategies for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

pub mod strategies {
    use crate::story::{StepStatus, StoryStatus};
    use proptest::prelude::*;

    pub fn arb_step_status() -> impl Strategy<Value = StepStatus> {
        prop_oneof![
            Just(StepStatus::Pending),
            Just(StepStatus::Running),
            Just(StepStatus::Completed),
            Just(StepStatus::Failed),
            Just(StepStatus::Skipped),
        ]
    }

    pub fn arb_story_status() -> impl Strategy<Value = StoryStatus> {
        prop_oneof![
            Just(StoryStatus::Created),
            Just(StoryStatus::Analyzing),
            Just(StoryStatus::Analyzed),
            Just(StoryStatus::Planning),
            Just(StoryStatus::Planned),
            Just(StoryStatus::Executing),
            Just(StoryStatus::GatePending),
            Just(StoryStatus::GateFailed),
            Just(StoryStatus::Completed),
            Just(StoryStatus::Failed),
            Just(StoryStatus::Cancelled),
        ]
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Story aggregate and its owned Steps.
//!
//! A Story is the aggregate root described in spec §3: it owns a
//! collection of Steps and is driven forward by the Orchestrator's state
//! machine (§4.8). `analyzedContext` and `executionPlan` stay opaque
//! (`serde_json::Value`) per the design note on opaque JSON-string
//! columns — only the Analyzer/Decomposer know their shape. `gateResult`
//! has a concrete shape in the spec, so it is typed directly here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a Story.
    pub struct StoryId("sty-");
}

crate::define_id! {
    /// Unique identifier for a Step.
    pub struct StepId("stp-");
}

/// Story lifecycle state (spec §3, §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    Created,
    Analyzing,
    Analyzed,
    Planning,
    Planned,
    Executing,
    GatePending,
    GateFailed,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    StoryStatus {
        Created => "created",
        Analyzing => "analyzing",
        Analyzed => "analyzed",
        Planning => "planning",
        Planned => "planned",
        Executing => "executing",
        GatePending => "gate_pending",
        GateFailed => "gate_failed",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl StoryStatus {
    /// Terminal statuses never advance further (P2).
    pub fn is_terminal(&self) -> bool {
        matches!(self, StoryStatus::Completed | StoryStatus::Failed | StoryStatus::Cancelled)
    }
}

/// Whether a passing gate advances automatically or waits for `resumeGate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    AutoProceed,
    PauseAlways,
}

impl Default for GateMode {
    fn default() -> Self {
        GateMode::AutoProceed
    }
}

crate::simple_display! {
    GateMode {
        AutoProceed => "auto_proceed",
        PauseAlways => "pause_always",
    }
}

/// Policy governing whether per-Step human approval is required before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationMode {
    Assisted,
    Autonomous,
    FullAutonomous,
}

impl Default for AutomationMode {
    fn default() -> Self {
        AutomationMode::Assisted
    }
}

crate::simple_display! {
    AutomationMode {
        Assisted => "assisted",
        Autonomous => "autonomous",
        FullAutonomous => "full_autonomous",
    }
}

/// Pure policy function (design note §9): whether a Step needs human
/// approval before it may leave Pending, given the Story's automation mode.
///
/// - `Assisted` always requires approval.
/// - `Autonomous` requires it only for Steps flagged `requiresConfirmation`.
/// - `FullAutonomous` never requires it.
pub fn requires_approval(mode: AutomationMode, step: &Step) -> bool {
    match mode {
        AutomationMode::Assisted => true,
        AutomationMode::Autonomous => step.requires_confirmation,
        AutomationMode::FullAutonomous => false,
    }
}

/// Pass/fail verdict of a gate evaluation (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    Passed,
    Failed,
}

crate::simple_display! {
    GateOutcome {
        Passed => "passed",
        Failed => "failed",
    }
}

/// One failing verification step, attached to a failed [`GateResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailingStepDetail {
    pub project: String,
    pub step_type: String,
    pub reason: String,
}

/// Typed projection of the last gate outcome stored on a Story.
///
/// `error_kind` is set to `"verification_unavailable"` when the
/// VerificationEngine itself errored rather than reporting a normal
/// required-step failure (spec §4.7, §7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResult {
    pub verdict: GateOutcome,
    pub wave: crate::wave::Wave,
    pub summary: String,
    #[serde(default)]
    pub failing_steps: Vec<FailingStepDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl GateResult {
    pub fn passed(wave: crate::wave::Wave, summary: impl Into<String>) -> Self {
        Self { verdict: GateOutcome::Passed, wave, summary: summary.into(), failing_steps: Vec::new(), error_kind: None }
    }

    pub fn failed(
        wave: crate::wave::Wave,
        summary: impl Into<String>,
        failing_steps: Vec<FailingStepDetail>,
    ) -> Self {
        Self { verdict: GateOutcome::Failed, wave, summary: summary.into(), failing_steps, error_kind: None }
    }

    pub fn unavailable(wave: crate::wave::Wave, reason: impl Into<String>) -> Self {
        Self {
            verdict: GateOutcome::Failed,
            wave,
            summary: reason.into(),
            failing_steps: Vec::new(),
            error_kind: Some("verification_unavailable".to_string()),
        }
    }

    pub fn is_pass(&self) -> bool {
        self.verdict == GateOutcome::Passed
    }
}

/// Status of a single Step (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

crate::simple_display! {
    StepStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Skipped => "skipped",
    }
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped)
    }
}

/// Human decision on a Step awaiting approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepApproval {
    Approved,
    Rejected,
}

crate::simple_display! {
    StepApproval {
        Approved => "approved",
        Rejected => "rejected",
    }
}

/// A scheduled unit of execution within a Story (spec §3).
///
/// `wave` and `order` are fixed by the Decomposer and never change
/// afterward (invariant 6); only the fields below the divider may.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub story_id: StoryId,
    pub order: u32,
    pub wave: crate::wave::Wave,
    pub name: String,
    pub description: String,
    pub capability: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<StepId>,
    #[serde(default)]
    pub requires_confirmation: bool,

    // --- mutable fields (invariant 6) ---
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<StepApproval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_override: Option<String>,
    #[serde(default)]
    pub needs_rework: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_output: Option<serde_json::Value>,
}

impl Step {
    /// Mark the Step Running and bump its attempt counter (spec §4.6 step 3).
    pub fn begin_dispatch(&mut self, agent_id: impl Into<String>, now_ms: u64) {
        self.status = StepStatus::Running;
        self.started_at_ms = Some(now_ms);
        self.attempts += 1;
        self.assigned_agent_id = Some(agent_id.into());
    }

    /// Record a successful executor result (spec §4.6 step 5).
    pub fn complete(&mut self, output: serde_json::Value, now_ms: u64) {
        self.output = Some(output);
        self.error = None;
        self.status = StepStatus::Completed;
        self.completed_at_ms = Some(now_ms);
        self.assigned_agent_id = None;
    }

    /// Record a failed executor result (spec §4.6 step 6).
    pub fn fail(&mut self, error: impl Into<String>, now_ms: u64) {
        self.error = Some(error.into());
        self.status = StepStatus::Failed;
        self.completed_at_ms = Some(now_ms);
        self.assigned_agent_id = None;
    }

    /// Flag this (still-Pending) Step as needing rework because an
    /// upstream dependency was re-executed (spec §4.6 step 7).
    pub fn flag_needs_rework(&mut self) {
        self.needs_rework = true;
        self.previous_output = self.output.clone();
    }
}

/// The Story aggregate root (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub id: StoryId,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_path: Option<PathBuf>,
    pub status: StoryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzed_context: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_plan: Option<serde_json::Value>,
    #[serde(default)]
    pub current_wave: crate::wave::Wave,
    #[serde(default)]
    pub gate_mode: GateMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_result: Option<GateResult>,
    pub max_parallelism: u32,
    pub dispatch_target: String,
    #[serde(default)]
    pub automation_mode: AutomationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_url: Option<String>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Optimistic-concurrency version, bumped on every Store update.
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Story {
    pub fn default_max_parallelism() -> u32 {
        4
    }

    /// All Steps belonging to the given wave.
    pub fn steps_in_wave(&self, wave: crate::wave::Wave) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(move |s| s.wave == wave)
    }

    /// The highest wave number assigned by the Decomposer, or 0 if no
    /// Steps exist yet.
    pub fn last_wave(&self) -> crate::wave::Wave {
        self.steps.iter().map(|s| s.wave).max().unwrap_or(0)
    }

    /// Invariant 3: every Step of `wave` must be terminal before a Step
    /// of a later wave may leave Pending.
    pub fn wave_is_finished(&self, wave: crate::wave::Wave) -> bool {
        self.steps_in_wave(wave).all(|s| s.status.is_terminal())
    }

    /// Map of step id -> step, used when walking dependency chains.
    pub fn step_index(&self) -> HashMap<StepId, &Step> {
        self.steps.iter().map(|s| (s.id, s)).collect()
    }
}

crate::builder! {
    pub struct StepBuilder => Step {
        into {
            name: String = "do the thing",
            description: String = "do the thing, precisely",
            capability: String = "coding",
        }
        set {
            story_id: StoryId = StoryId::new(),
            order: u32 = 1,
            wave: crate::wave::Wave = 1,
            depends_on: Vec<StepId> = Vec::new(),
            requires_confirmation: bool = false,
            status: StepStatus = StepStatus::Pending,
            attempts: u32 = 0,
            needs_rework: bool = false,
        }
        option {
            language: String = None,
            approval: StepApproval = None,
            approval_feedback: String = None,
            error: String = None,
            assigned_agent_id: String = None,
            started_at_ms: u64 = None,
            completed_at_ms: u64 = None,
            executor_override: String = None,
        }
        computed {
            id: StepId = StepId::new(),
            input: Option<serde_json::Value> = None,
            output: Option<serde_json::Value> = None,
            previous_output: Option<serde_json::Value> = None,
        }
    }
}

crate::builder! {
    pub struct StoryBuilder => Story {
        into {
            title: String = "Add a README",
            description: String = "",
            dispatch_target: String = "default",
        }
        set {
            status: StoryStatus = StoryStatus::Created,
            current_wave: crate::wave::Wave = 0,
            gate_mode: GateMode = GateMode::AutoProceed,
            max_parallelism: u32 = 4,
            automation_mode: AutomationMode = AutomationMode::Assisted,
            created_at_ms: u64 = 1_000_000,
            updated_at_ms: u64 = 1_000_000,
            version: u64 = 0,
            steps: Vec<Step> = Vec::new(),
        }
        option {
            repository_path: PathBuf = None,
            worktree_path: PathBuf = None,
            git_branch: String = None,
            gate_result: GateResult = None,
            issue_url: String = None,
            completed_at_ms: u64 = None,
            pull_request_url: String = None,
            error: String = None,
        }
        computed {
            id: StoryId = StoryId::new(),
            analyzed_context: Option<serde_json::Value> = None,
            execution_plan: Option<serde_json::Value> = None,
        }
    }
}

#[cfg(test)]
#[path = "story_tests.rs"]
mod tests;

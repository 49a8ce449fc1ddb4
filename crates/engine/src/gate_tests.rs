// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use story_core::Story;
use tempfile::tempdir;

#[tokio::test]
async fn evaluate_passes_when_no_projects_are_detected() {
    let dir = tempdir().unwrap();
    let story = Story::builder().worktree_path(dir.path().to_path_buf()).build();
    let controller = GateController::new(VerificationEngine::new());
    let result = controller.evaluate(&story, 1).await;
    assert!(result.is_pass());
}

#[tokio::test]
async fn evaluate_reports_unavailable_without_a_worktree() {
    let story = Story::builder().build();
    let controller = GateController::new(VerificationEngine::new());
    let result = controller.evaluate(&story, 1).await;
    assert!(!result.is_pass());
    assert_eq!(result.error_kind.as_deref(), Some("verification_unavailable"));
}

#[tokio::test]
async fn evaluate_fails_when_a_required_step_fails() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("go.mod"), "module broken\n\ngo 1.21\n").unwrap();
    let story = Story::builder().worktree_path(dir.path().to_path_buf()).build();
    let controller = GateController::new(VerificationEngine::new());
    let result = controller.evaluate(&story, 1).await;
    // `go build` against a module with no source files fails, so the
    // required build step should fail the gate.
    assert!(!result.is_pass());
    assert_eq!(result.wave, 1);
}

#[tokio::test]
async fn evaluate_attributes_a_failing_step_to_its_own_project_only() {
    let dir = tempdir().unwrap();
    let broken = dir.path().join("broken");
    std::fs::create_dir(&broken).unwrap();
    std::fs::write(broken.join("go.mod"), "module broken\n\ngo 1.21\n").unwrap();

    let other = dir.path().join("other");
    std::fs::create_dir(&other).unwrap();
    std::fs::write(other.join("go.mod"), "module other\n\ngo 1.21\n").unwrap();
    std::fs::write(other.join("main.go"), "package main\n\nfunc main() {}\n").unwrap();

    let story = Story::builder().worktree_path(dir.path().to_path_buf()).build();
    let controller = GateController::new(VerificationEngine::new());
    let result = controller.evaluate(&story, 1).await;

    assert!(!result.is_pass());
    assert_eq!(result.failing_steps.len(), 1, "a failure in one project must not be attributed to every detected project");
    assert_eq!(result.failing_steps[0].project, "broken");
}

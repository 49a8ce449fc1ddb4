// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::analyzer::Analyzer;
use crate::decomposer::Decomposer;
use crate::dispatcher::Dispatcher;
use crate::finalizer::Finalizer;
use crate::gate::GateController;
use async_trait::async_trait;
use story_adapters::{ExecutionOutcome, ExecutionRequest, Executor, ExecutorError, ExecutorRegistry, FakeLlmProvider};
use story_core::FakeClock;
use story_storage::MemoryStore;
use tempfile::tempdir;

struct AlwaysSucceeds;

#[async_trait]
impl Executor for AlwaysSucceeds {
    async fn execute(&self, _request: ExecutionRequest, _cancel: tokio_util::sync::CancellationToken) -> Result<ExecutionOutcome, ExecutorError> {
        Ok(ExecutionOutcome::ok(serde_json::json!({"done": true}), "agent-1"))
    }
}

fn engine() -> Engine<FakeClock> {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let worktrees = Arc::new(WorktreeManager::new());
    let mut registry = ExecutorRegistry::new();
    registry.register("default", Arc::new(AlwaysSucceeds) as Arc<dyn Executor>);
    let llm = Arc::new(FakeLlmProvider::returning("{}"));
    let orchestrator = Orchestrator::new(
        store.clone(),
        worktrees.clone(),
        Arc::new(Analyzer::new(llm.clone(), None)),
        Arc::new(Decomposer::new(llm)),
        Arc::new(Dispatcher::new(Arc::new(registry), FakeClock::new())),
        Arc::new(GateController::new(VerificationEngine::new())),
        Arc::new(Finalizer::new()),
        FakeClock::new(),
    );
    Engine::new(store, worktrees, orchestrator, VerificationEngine::new())
}

#[tokio::test]
async fn create_get_list_and_delete_round_trip() {
    let engine = engine();
    let story = engine
        .create_story(CreateStoryRequest { title: "Add feature".to_string(), description: "desc".to_string(), ..Default::default() })
        .await
        .unwrap();

    let fetched = engine.get_story(story.id).await.unwrap();
    assert_eq!(fetched.id, story.id);

    let all = engine.list_stories(&StoryFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);

    engine.delete_story(story.id).await.unwrap();
    assert!(engine.get_story(story.id).await.is_err());
}

#[tokio::test]
async fn export_plan_renders_steps_grouped_by_wave() {
    let engine = engine();
    let mut story = engine
        .create_story(CreateStoryRequest { title: "Add feature".to_string(), ..Default::default() })
        .await
        .unwrap();
    story.steps.push(story_core::Step::builder().story_id(story.id).wave(1).name("write code").build());
    story.status = story_core::StoryStatus::Planned;
    let story = engine.store.update(story).await.unwrap();
    let _ = story;

    let dir = tempdir().unwrap();
    let outcome = engine.export_artifacts(story.id, Some(dir.path().to_path_buf()), &[ExportKind::Plan]).await.unwrap();

    assert_eq!(outcome.exported.len(), 1);
    let content = std::fs::read_to_string(&outcome.exported[0].path).unwrap();
    assert!(content.contains("Wave 1"));
    assert!(content.contains("write code"));
}

#[tokio::test]
async fn export_research_reports_missing_analysis() {
    let engine = engine();
    let story = engine
        .create_story(CreateStoryRequest { title: "Add feature".to_string(), ..Default::default() })
        .await
        .unwrap();

    let dir = tempdir().unwrap();
    let outcome = engine.export_artifacts(story.id, Some(dir.path().to_path_buf()), &[ExportKind::Research]).await.unwrap();
    let content = std::fs::read_to_string(&outcome.exported[0].path).unwrap();
    assert!(content.contains("No analysis has been recorded"));
}

#[tokio::test]
async fn verify_on_empty_directory_reports_no_projects() {
    let engine = engine();
    let dir = tempdir().unwrap();
    let result = engine.verify(dir.path()).await.unwrap();
    assert!(result.success);
    assert!(result.projects.is_empty());
}

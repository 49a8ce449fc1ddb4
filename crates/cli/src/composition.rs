// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds the `story_engine::Engine` composition root for one CLI
//! invocation: store, worktrees, executor registry, LLM provider, and
//! the Orchestrator that ties them together (spec §A.1).

use crate::config::{ExecutorKind, StoryConfig};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use story_adapters::{
    CliExecutor, CodeIndex, CompletionOptions, ExecutorRegistry, GrepCodeIndex, HttpLlmProvider, InProcessExecutor, LlmError, LlmProvider,
    WorktreeManager,
};
use story_core::SystemClock;
use story_engine::{Analyzer, Decomposer, Dispatcher, Engine, Finalizer, GateController, Orchestrator, VerificationEngine};
use story_storage::{FileStore, Store};

/// Stands in for an `LlmProvider` when no credentials are configured, so
/// that commands which never touch the LLM (`verify`, `list`, `show`, ...)
/// don't need one to be wired up, while `analyze`/`plan` still fail with a
/// clear transport error instead of panicking.
struct UnconfiguredLlmProvider;

#[async_trait]
impl LlmProvider for UnconfiguredLlmProvider {
    async fn complete(&self, _prompt: &str, _options: &CompletionOptions) -> Result<String, LlmError> {
        Err(LlmError::Transport(
            "no LLM provider configured: set STORY_LLM_BASE_URL and STORY_LLM_API_KEY".to_string(),
        ))
    }
}

fn llm_provider() -> Arc<dyn LlmProvider> {
    match (std::env::var("STORY_LLM_BASE_URL"), std::env::var("STORY_LLM_API_KEY")) {
        (Ok(base_url), Ok(api_key)) => Arc::new(HttpLlmProvider::new(base_url, api_key)),
        _ => Arc::new(UnconfiguredLlmProvider),
    }
}

fn executor_registry(config: &StoryConfig, provider: Arc<dyn LlmProvider>) -> ExecutorRegistry {
    let mut registry = ExecutorRegistry::new();
    if config.dispatch_targets.is_empty() {
        registry.register("default", Arc::new(InProcessExecutor::new(provider, CompletionOptions::default())));
        return registry;
    }
    for (name, target) in &config.dispatch_targets {
        let executor: Arc<dyn story_adapters::Executor> = match target.kind {
            ExecutorKind::InProcess => Arc::new(InProcessExecutor::new(provider.clone(), CompletionOptions::default())),
            ExecutorKind::Cli => {
                let program = target.program.clone().unwrap_or_else(|| name.clone());
                Arc::new(CliExecutor::new(program, target.args.clone(), target.timeout()))
            }
        };
        registry.register(name, executor);
    }
    registry
}

pub fn store_path(repo: &Path, override_path: Option<PathBuf>, config: &StoryConfig) -> PathBuf {
    override_path.or_else(|| config.store_path.clone()).unwrap_or_else(|| repo.join(".story"))
}

/// Builds the full `Engine`, rooted at `store_path`, using `config` for
/// executor wiring and an LLM provider read from the environment.
pub fn build_engine(store_path: PathBuf, config: &StoryConfig) -> Engine<SystemClock> {
    let store: Arc<dyn Store> = Arc::new(FileStore::new(store_path));
    let worktrees = Arc::new(WorktreeManager::new());
    let provider = llm_provider();
    let code_index: Option<Arc<dyn CodeIndex>> = Some(Arc::new(GrepCodeIndex::new()));
    let analyzer = Arc::new(Analyzer::new(provider.clone(), code_index));
    let decomposer = Arc::new(Decomposer::new(provider.clone()));
    let registry = Arc::new(executor_registry(config, provider));
    let dispatcher = Arc::new(Dispatcher::new(registry, SystemClock));
    let gate = Arc::new(GateController::new(VerificationEngine::new()));
    let finalizer = Arc::new(Finalizer::new());

    let orchestrator = Orchestrator::new(store.clone(), worktrees.clone(), analyzer, decomposer, dispatcher, gate, finalizer, SystemClock);

    Engine::new(store, worktrees, orchestrator, VerificationEngine::new())
}

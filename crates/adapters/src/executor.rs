// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Executor registry (spec §6.2): a map from `dispatchTarget` name to
//! an `Executor` implementation that performs a Step's actual work
//! inside a Story's worktree.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use story_core::{StepId, StoryId};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ExecutionContext {
    pub story_id: StoryId,
    pub step_id: StepId,
    pub capability: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// One dispatch request handed to an `Executor` (spec §4.6 step 4).
pub struct ExecutionRequest {
    pub working_directory: PathBuf,
    pub prompt: String,
    pub context: ExecutionContext,
}

/// Result of running an `Executor` to completion (spec §6.2).
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub agent_session_id: Option<String>,
}

impl ExecutionOutcome {
    pub fn ok(output: serde_json::Value, agent_session_id: impl Into<String>) -> Self {
        Self { success: true, output: Some(output), error: None, agent_session_id: Some(agent_session_id.into()) }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, output: None, error: Some(error.into()), agent_session_id: None }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("execution cancelled")]
    Cancelled,
    #[error("executor deadline exceeded")]
    Timeout,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("llm error: {0}")]
    Llm(#[from] crate::llm::LlmError),
    #[error("executor failure: {0}")]
    Other(String),
}

/// An Executor performs a Step's work inside a Story's worktree (spec §6.2).
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(
        &self,
        request: ExecutionRequest,
        cancel: CancellationToken,
    ) -> Result<ExecutionOutcome, ExecutorError>;
}

/// Map from `dispatchTarget` name to a registered Executor.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn Executor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, executor: Arc<dyn Executor>) -> &mut Self {
        self.executors.insert(name.into(), executor);
        self
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Executor>> {
        self.executors.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysSucceeds;

    #[async_trait]
    impl Executor for AlwaysSucceeds {
        async fn execute(
            &self,
            _request: ExecutionRequest,
            _cancel: CancellationToken,
        ) -> Result<ExecutionOutcome, ExecutorError> {
            Ok(ExecutionOutcome::ok(serde_json::json!({"ok": true}), "agent-1"))
        }
    }

    #[test]
    fn resolve_returns_none_for_unregistered_target() {
        let registry = ExecutorRegistry::new();
        assert!(registry.resolve("missing").is_none());
    }

    #[tokio::test]
    async fn resolve_returns_registered_executor() {
        let mut registry = ExecutorRegistry::new();
        registry.register("default", Arc::new(AlwaysSucceeds));
        let executor = registry.resolve("default").expect("registered");
        let outcome = executor
            .execute(
                ExecutionRequest {
                    working_directory: PathBuf::from("."),
                    prompt: "do it".to_string(),
                    context: ExecutionContext::default(),
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(outcome.success);
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process cooperative executor: dispatches a Step directly to an
//! `LlmProvider`, with no subprocess involved. Intended for capabilities
//! that are pure text generation (e.g. planning, documentation) rather
//! than ones that need to touch the filesystem via tool calls.

use crate::executor::{ExecutionOutcome, ExecutionRequest, Executor, ExecutorError};
use crate::llm::{CompletionOptions, LlmProvider};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct InProcessExecutor {
    provider: Arc<dyn LlmProvider>,
    options: CompletionOptions,
}

impl InProcessExecutor {
    pub fn new(provider: Arc<dyn LlmProvider>, options: CompletionOptions) -> Self {
        Self { provider, options }
    }
}

#[async_trait]
impl Executor for InProcessExecutor {
    async fn execute(&self, request: ExecutionRequest, cancel: CancellationToken) -> Result<ExecutionOutcome, ExecutorError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(ExecutorError::Cancelled),
            result = self.provider.complete(&request.prompt, &self.options) => {
                match result {
                    Ok(text) => Ok(ExecutionOutcome::ok(
                        serde_json::json!({ "response": text }),
                        request.context.step_id.to_string(),
                    )),
                    Err(err) => Err(ExecutorError::Llm(err)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutionContext;
    use crate::llm::FakeLlmProvider;
    use std::path::PathBuf;

    #[tokio::test]
    async fn execute_returns_provider_response_as_output() {
        let provider = Arc::new(FakeLlmProvider::returning("done"));
        let executor = InProcessExecutor::new(provider, CompletionOptions::default());
        let outcome = executor
            .execute(
                ExecutionRequest {
                    working_directory: PathBuf::from("."),
                    prompt: "do the thing".to_string(),
                    context: ExecutionContext::default(),
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.output.unwrap()["response"], "done");
    }

    #[tokio::test]
    async fn execute_surfaces_llm_error() {
        let provider = Arc::new(FakeLlmProvider::failing("down"));
        let executor = InProcessExecutor::new(provider, CompletionOptions::default());
        let err = executor
            .execute(
                ExecutionRequest {
                    working_directory: PathBuf::from("."),
                    prompt: "do the thing".to_string(),
                    context: ExecutionContext::default(),
                },
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Llm(_)));
    }

    #[tokio::test]
    async fn execute_respects_cancellation() {
        let provider = Arc::new(FakeLlmProvider::returning("done"));
        let executor = InProcessExecutor::new(provider, CompletionOptions::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = executor
            .execute(
                ExecutionRequest {
                    working_directory: PathBuf::from("."),
                    prompt: "do the thing".to_string(),
                    context: ExecutionContext::default(),
                },
                cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Cancelled));
    }
}

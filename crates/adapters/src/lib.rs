// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Boundary adapters: everything that talks to the outside world on a
//! Story's behalf — git worktrees, subprocesses, LLM providers, code
//! search, and the `Executor` registry that ties a `dispatchTarget`
//! name to one of those.

pub mod code_index;
pub mod executor;
pub mod executors;
pub mod llm;
pub mod subprocess;
pub mod worktree;

pub use code_index::{CodeIndex, CodeIndexError, GrepCodeIndex, SearchHit};
pub use executor::{ExecutionContext, ExecutionOutcome, ExecutionRequest, Executor, ExecutorError, ExecutorRegistry};
pub use executors::{CliExecutor, InProcessExecutor};
pub use llm::{CompletionOptions, HttpLlmProvider, LlmError, LlmProvider};
pub use subprocess::{run_with_timeout, RunError};
pub use worktree::{WorktreeError, WorktreeManager};

#[cfg(any(test, feature = "test-support"))]
pub use code_index::FakeCodeIndex;
#[cfg(any(test, feature = "test-support"))]
pub use llm::FakeLlmProvider;

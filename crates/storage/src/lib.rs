// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! story-storage: the Store contract (spec §4.1) and its implementations.
//!
//! `Store` is the durable mapping from Story id to Story (with its owned
//! Steps). Updates are atomic at Story granularity — a Story and its
//! Steps are written as one unit, never partially. [`MemoryStore`] is an
//! in-process implementation for tests and ephemeral runs; [`FileStore`]
//! persists one JSON file per Story under a root directory, with
//! atomic-rename writes and an optimistic `version` check.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use story_core::{Step, Story, StoryId, StoryStatus};
use thiserror::Error;

/// Errors surfaced by a [`Store`] implementation (spec §7).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("story not found: {0}")]
    NotFound(StoryId),
    #[error("story already exists: {0}")]
    Duplicate(StoryId),
    #[error("step not found: {0}")]
    StepNotFound(story_core::StepId),
    #[error("concurrent update: story {id} expected version {expected}, found {actual}")]
    ConcurrentUpdate { id: StoryId, expected: u64, actual: u64 },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Optional filters for [`Store::list`].
#[derive(Debug, Clone, Default)]
pub struct StoryFilter {
    pub status: Option<StoryStatus>,
    pub repository_path: Option<std::path::PathBuf>,
}

impl StoryFilter {
    pub fn matches(&self, story: &Story) -> bool {
        if let Some(status) = self.status {
            if story.status != status {
                return false;
            }
        }
        if let Some(ref path) = self.repository_path {
            if story.repository_path.as_ref() != Some(path) {
                return false;
            }
        }
        true
    }
}

/// Persistent mapping from Story id to Story, as specified in §4.1.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persist a brand-new Story, assigning it a fresh version. Fails if
    /// `story.id` is already present.
    async fn create(&self, story: Story) -> Result<Story, StoreError>;

    /// Fetch a Story's top-level fields. Implementations may omit Steps
    /// here for efficiency; use [`Store::get_by_id_with_steps`] when
    /// Steps are required.
    async fn get_by_id(&self, id: StoryId) -> Result<Story, StoreError>;

    /// Fetch a Story together with its full Step collection.
    async fn get_by_id_with_steps(&self, id: StoryId) -> Result<Story, StoreError>;

    /// List Stories matching `filter`, newest (`createdAt`) first.
    async fn list(&self, filter: &StoryFilter) -> Result<Vec<Story>, StoreError>;

    /// Replace a Story (and its Steps) atomically. Fails with
    /// `ConcurrentUpdate` if `story.version` doesn't match the stored
    /// version; otherwise persists with `version + 1`.
    async fn update(&self, story: Story) -> Result<Story, StoreError>;

    /// Replace a single Step within its owning Story, atomically
    /// rewriting the whole Story record.
    async fn update_step(&self, step: Step) -> Result<Step, StoreError>;

    /// Delete a Story and cascade-delete its Steps.
    async fn delete(&self, id: StoryId) -> Result<(), StoreError>;
}

#[cfg(test)]
mod contract_tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`Store`] implementation, used for tests and ephemeral runs.

use crate::{Store, StoreError, StoryFilter};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use story_core::{Step, Story, StoryId};

#[derive(Default)]
pub struct MemoryStore {
    stories: Mutex<HashMap<StoryId, Story>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create(&self, story: Story) -> Result<Story, StoreError> {
        let mut stories = self.stories.lock();
        if stories.contains_key(&story.id) {
            return Err(StoreError::Duplicate(story.id));
        }
        let mut story = story;
        story.version = 0;
        stories.insert(story.id, story.clone());
        Ok(story)
    }

    async fn get_by_id(&self, id: StoryId) -> Result<Story, StoreError> {
        self.stories.lock().get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn get_by_id_with_steps(&self, id: StoryId) -> Result<Story, StoreError> {
        self.get_by_id(id).await
    }

    async fn list(&self, filter: &StoryFilter) -> Result<Vec<Story>, StoreError> {
        let stories = self.stories.lock();
        let mut matching: Vec<Story> =
            stories.values().filter(|s| filter.matches(s)).cloned().collect();
        matching.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        Ok(matching)
    }

    async fn update(&self, story: Story) -> Result<Story, StoreError> {
        let mut stories = self.stories.lock();
        let existing = stories.get(&story.id).ok_or(StoreError::NotFound(story.id))?;
        if existing.version != story.version {
            return Err(StoreError::ConcurrentUpdate {
                id: story.id,
                expected: story.version,
                actual: existing.version,
            });
        }
        let mut story = story;
        story.version += 1;
        stories.insert(story.id, story.clone());
        Ok(story)
    }

    async fn update_step(&self, step: Step) -> Result<Step, StoreError> {
        let mut stories = self.stories.lock();
        let story = stories.get_mut(&step.story_id).ok_or(StoreError::NotFound(step.story_id))?;
        let slot = story
            .steps
            .iter_mut()
            .find(|s| s.id == step.id)
            .ok_or(StoreError::StepNotFound(step.id))?;
        *slot = step.clone();
        story.version += 1;
        Ok(step)
    }

    async fn delete(&self, id: StoryId) -> Result<(), StoreError> {
        let mut stories = self.stories.lock();
        stories.remove(&id).ok_or(StoreError::NotFound(id))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The same behavioral contract exercised against every `Store` impl, so
//! a new backend can't silently drift from spec §4.1's guarantees.

use crate::{FileStore, MemoryStore, Store, StoreError};
use std::sync::Arc;
use story_core::{Step, Story, StoryStatus};

async fn update_step_is_atomic_with_its_story(store: Arc<dyn Store>) {
    let mut story = Story::builder().status(StoryStatus::Planned).build();
    let step = Step::builder().story_id(story.id).build();
    story.steps.push(step.clone());
    store.create(story.clone()).await.unwrap();

    let mut completed = step.clone();
    completed.status = story_core::StepStatus::Completed;
    store.update_step(completed).await.unwrap();

    let fetched = store.get_by_id_with_steps(story.id).await.unwrap();
    assert_eq!(fetched.steps.len(), 1);
    assert_eq!(fetched.steps[0].status, story_core::StepStatus::Completed);
    // The Story's own fields (status) are untouched by a Step-only update.
    assert_eq!(fetched.status, StoryStatus::Planned);
}

async fn delete_then_get_is_not_found(store: Arc<dyn Store>) {
    let story = store.create(Story::builder().build()).await.unwrap();
    store.delete(story.id).await.unwrap();
    assert!(matches!(store.get_by_id(story.id).await, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn memory_store_satisfies_contract() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    update_step_is_atomic_with_its_story(store.clone()).await;
    delete_then_get_is_not_found(store).await;
}

#[tokio::test]
async fn file_store_satisfies_contract() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn Store> = Arc::new(FileStore::new(dir.path()));
    update_step_is_atomic_with_its_story(store.clone()).await;
    delete_then_get_is_not_found(store).await;
}

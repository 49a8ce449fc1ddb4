// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use story_core::{Step, Story};

#[tokio::test]
async fn create_then_get_round_trips() {
    let store = MemoryStore::new();
    let story = Story::builder().title("Add a README").build();
    let created = store.create(story.clone()).await.unwrap();
    let fetched = store.get_by_id(created.id).await.unwrap();
    assert_eq!(fetched.title, "Add a README");
    assert_eq!(fetched.version, 0);
}

#[tokio::test]
async fn create_duplicate_id_errors() {
    let store = MemoryStore::new();
    let story = Story::builder().build();
    store.create(story.clone()).await.unwrap();
    let err = store.create(story).await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)));
}

#[tokio::test]
async fn get_missing_errors_not_found() {
    let store = MemoryStore::new();
    let err = store.get_by_id(story_core::StoryId::new()).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn update_bumps_version() {
    let store = MemoryStore::new();
    let story = store.create(Story::builder().build()).await.unwrap();
    let mut updated = story.clone();
    updated.title = "renamed".to_string();
    let saved = store.update(updated).await.unwrap();
    assert_eq!(saved.version, 1);
    assert_eq!(saved.title, "renamed");
}

#[tokio::test]
async fn update_with_stale_version_errors() {
    let store = MemoryStore::new();
    let story = store.create(Story::builder().build()).await.unwrap();
    let mut stale = story.clone();
    stale.title = "first".to_string();
    store.update(stale.clone()).await.unwrap();

    // stale still carries version 0, but the store is now at version 1
    let err = store.update(stale).await.unwrap_err();
    assert!(matches!(err, StoreError::ConcurrentUpdate { .. }));
}

#[tokio::test]
async fn update_step_rewrites_owning_story() {
    let store = MemoryStore::new();
    let mut story = Story::builder().build();
    let step = Step::builder().story_id(story.id).name("write readme").build();
    story.steps.push(step.clone());
    store.create(story).await.unwrap();

    let mut updated_step = step.clone();
    updated_step.status = story_core::StepStatus::Completed;
    store.update_step(updated_step.clone()).await.unwrap();

    let fetched = store.get_by_id_with_steps(step.story_id).await.unwrap();
    assert_eq!(fetched.steps[0].status, story_core::StepStatus::Completed);
}

#[tokio::test]
async fn update_step_for_unknown_step_errors() {
    let store = MemoryStore::new();
    let story = store.create(Story::builder().build()).await.unwrap();
    let orphan = Step::builder().story_id(story.id).build();
    let err = store.update_step(orphan).await.unwrap_err();
    assert!(matches!(err, StoreError::StepNotFound(_)));
}

#[tokio::test]
async fn delete_cascades_and_then_not_found() {
    let store = MemoryStore::new();
    let story = store.create(Story::builder().build()).await.unwrap();
    store.delete(story.id).await.unwrap();
    let err = store.get_by_id(story.id).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn list_orders_by_created_at_desc() {
    let store = MemoryStore::new();
    let older = Story::builder().created_at_ms(1_000).build();
    let newer = Story::builder().created_at_ms(2_000).build();
    store.create(older.clone()).await.unwrap();
    store.create(newer.clone()).await.unwrap();

    let listed = store.list(&StoryFilter::default()).await.unwrap();
    assert_eq!(listed[0].id, newer.id);
    assert_eq!(listed[1].id, older.id);
}

#[tokio::test]
async fn list_filters_by_status() {
    let store = MemoryStore::new();
    let done = Story::builder().status(story_core::StoryStatus::Completed).build();
    let pending = Story::builder().status(story_core::StoryStatus::Created).build();
    store.create(done.clone()).await.unwrap();
    store.create(pending).await.unwrap();

    let filter = StoryFilter { status: Some(story_core::StoryStatus::Completed), ..Default::default() };
    let listed = store.list(&filter).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, done.id);
}

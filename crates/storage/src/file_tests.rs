// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use story_core::Story;
use tempfile::tempdir;

#[tokio::test]
async fn create_then_get_round_trips_through_disk() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let story = Story::builder().title("Add a README").build();
    store.create(story.clone()).await.unwrap();

    let fetched = store.get_by_id(story.id).await.unwrap();
    assert_eq!(fetched.title, "Add a README");
    assert!(dir.path().join("stories").join(format!("{}.json", story.id)).exists());
}

#[tokio::test]
async fn create_duplicate_errors_without_overwriting() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let story = Story::builder().title("first").build();
    store.create(story.clone()).await.unwrap();

    let mut dup = story.clone();
    dup.title = "second".to_string();
    let err = store.create(dup).await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)));

    let fetched = store.get_by_id(story.id).await.unwrap();
    assert_eq!(fetched.title, "first");
}

#[tokio::test]
async fn update_rejects_stale_version() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let story = store.create(Story::builder().build()).await.unwrap();

    let mut stale = story.clone();
    stale.title = "a".to_string();
    store.update(stale.clone()).await.unwrap();

    let err = store.update(stale).await.unwrap_err();
    assert!(matches!(err, StoreError::ConcurrentUpdate { .. }));
}

#[tokio::test]
async fn no_temp_file_left_behind_after_write() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let story = Story::builder().build();
    store.create(story.clone()).await.unwrap();

    let mut entries = tokio::fs::read_dir(dir.path().join("stories")).await.unwrap();
    let mut names = Vec::new();
    while let Some(e) = entries.next_entry().await.unwrap() {
        names.push(e.file_name().to_string_lossy().to_string());
    }
    assert_eq!(names, vec![format!("{}.json", story.id)]);
}

#[tokio::test]
async fn delete_removes_the_file() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let story = store.create(Story::builder().build()).await.unwrap();
    store.delete(story.id).await.unwrap();
    assert!(!dir.path().join("stories").join(format!("{}.json", story.id)).exists());
    let err = store.get_by_id(story.id).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn list_survives_empty_directory() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let listed = store.list(&StoryFilter::default()).await.unwrap();
    assert!(listed.is_empty());
}

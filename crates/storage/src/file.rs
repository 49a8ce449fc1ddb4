// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed [`Store`]: one JSON document per Story, written with a
//! temp-file-then-rename so a crash mid-write never leaves a partial
//! file in place (spec §4.1: "partial application is forbidden").

use crate::{Store, StoreError, StoryFilter};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use story_core::{Step, Story, StoryId};

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// `root` is typically `<repo>/.story`; Stories live under
    /// `root/stories/<id>.json`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn stories_dir(&self) -> PathBuf {
        self.root.join("stories")
    }

    fn path_for(&self, id: StoryId) -> PathBuf {
        self.stories_dir().join(format!("{id}.json"))
    }

    async fn ensure_dir(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(self.stories_dir()).await?;
        Ok(())
    }

    async fn read(&self, id: StoryId) -> Result<Story, StoreError> {
        let path = self.path_for(id);
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(id)
            } else {
                StoreError::Io(e)
            }
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Write `story` atomically by writing to a sibling temp file and
    /// renaming it into place (rename is atomic on the same filesystem).
    async fn write_atomic(&self, story: &Story) -> Result<(), StoreError> {
        self.ensure_dir().await?;
        let final_path = self.path_for(story.id);
        let tmp_path = self.stories_dir().join(format!("{}.json.tmp", story.id));
        let bytes = serde_json::to_vec_pretty(story)?;
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<StoryId>, StoreError> {
        self.ensure_dir().await?;
        let mut dir = tokio::fs::read_dir(self.stories_dir()).await?;
        let mut ids = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if let Some(stem) = file_stem_of_story_json(&path) {
                ids.push(StoryId::from_string(stem));
            }
        }
        Ok(ids)
    }
}

fn file_stem_of_story_json(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(".json").map(|s| s.to_string())
}

#[async_trait]
impl Store for FileStore {
    async fn create(&self, story: Story) -> Result<Story, StoreError> {
        self.ensure_dir().await?;
        if self.path_for(story.id).exists() {
            return Err(StoreError::Duplicate(story.id));
        }
        let mut story = story;
        story.version = 0;
        self.write_atomic(&story).await?;
        Ok(story)
    }

    async fn get_by_id(&self, id: StoryId) -> Result<Story, StoreError> {
        self.read(id).await
    }

    async fn get_by_id_with_steps(&self, id: StoryId) -> Result<Story, StoreError> {
        self.read(id).await
    }

    async fn list(&self, filter: &StoryFilter) -> Result<Vec<Story>, StoreError> {
        let mut stories = Vec::new();
        for id in self.list_ids().await? {
            match self.read(id).await {
                Ok(story) => {
                    if filter.matches(&story) {
                        stories.push(story);
                    }
                }
                Err(StoreError::NotFound(_)) => continue, // raced with a delete
                Err(e) => return Err(e),
            }
        }
        stories.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        Ok(stories)
    }

    async fn update(&self, story: Story) -> Result<Story, StoreError> {
        let existing = self.read(story.id).await?;
        if existing.version != story.version {
            return Err(StoreError::ConcurrentUpdate {
                id: story.id,
                expected: story.version,
                actual: existing.version,
            });
        }
        let mut story = story;
        story.version += 1;
        self.write_atomic(&story).await?;
        Ok(story)
    }

    async fn update_step(&self, step: Step) -> Result<Step, StoreError> {
        let mut story = self.read(step.story_id).await?;
        let slot = story
            .steps
            .iter_mut()
            .find(|s| s.id == step.id)
            .ok_or(StoreError::StepNotFound(step.id))?;
        *slot = step.clone();
        story.version += 1;
        self.write_atomic(&story).await?;
        Ok(step)
    }

    async fn delete(&self, id: StoryId) -> Result<(), StoreError> {
        let path = self.path_for(id);
        tokio::fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(id)
            } else {
                StoreError::Io(e)
            }
        })
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;

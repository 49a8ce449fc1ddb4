// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional `.story/config.toml`, covering defaults that a repository
//! wants to set once instead of passing on every invocation (spec §A.4).
//! CLI flags always win over file config; file config always wins over
//! the built-in defaults below.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
    InProcess,
    Cli,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchTargetConfig {
    pub kind: ExecutorKind,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    600
}

impl DispatchTargetConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoryConfig {
    pub max_parallelism: Option<u32>,
    pub gate_mode: Option<String>,
    pub automation_mode: Option<String>,
    pub store_path: Option<PathBuf>,
    pub dispatch_targets: HashMap<String, DispatchTargetConfig>,
}

impl StoryConfig {
    /// Loads `<repo>/.story/config.toml`; a missing file is not an error,
    /// it just means every setting falls back to its built-in default.
    pub fn load(repo: &Path) -> Result<Self, ConfigError> {
        let path = repo.join(".story").join("config.toml");
        match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source }),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }
}

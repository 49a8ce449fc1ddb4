// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turns an `AnalyzedContext` into Steps assigned to numbered waves
//! (spec §4.5): LLM-driven work-item generation, dependency validation,
//! topological sort, and iterative wave layering under a parallelism cap.

use crate::analyzer::AnalyzedContext;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use story_adapters::{CompletionOptions, LlmError, LlmProvider};
use story_core::{Step, StepId, StepStatus, Story};

#[derive(Debug, thiserror::Error)]
pub enum DecomposerError {
    #[error("llm unavailable: {0}")]
    LlmUnavailable(String),
    #[error("could not parse decomposer response: {0}")]
    ParseError(String),
    #[error("decomposition referenced an unknown or cyclic dependency: {0}")]
    InvalidDependencies(String),
    #[error("decomposition yielded no work items")]
    Empty,
}

impl From<LlmError> for DecomposerError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Transport(msg) => DecomposerError::LlmUnavailable(msg),
            LlmError::Parse(msg) => DecomposerError::ParseError(msg),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecomposeConfig {
    pub max_parallelism: u32,
    pub include_tests: bool,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkItemDraft {
    id: String,
    title: String,
    description: String,
    #[serde(default)]
    capability: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    depends_on: Vec<String>,
}

pub struct Decomposer {
    provider: Arc<dyn LlmProvider>,
}

impl Decomposer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub async fn decompose(&self, story: &Story, context: &AnalyzedContext, config: &DecomposeConfig) -> Result<Vec<Step>, DecomposerError> {
        let prompt = build_prompt(story, context, config);
        let drafts = self.request_drafts(&prompt).await?;
        let drafts = match validate(&drafts) {
            Ok(()) => drafts,
            Err(_) => {
                // Re-request once on a rejected response (spec §4.5 step 2).
                let drafts = self.request_drafts(&prompt).await?;
                validate(&drafts)?;
                drafts
            }
        };

        if drafts.is_empty() {
            return Err(DecomposerError::Empty);
        }

        let ordered = topological_sort(&drafts)?;
        let waves = layer_with_cap(&ordered, &drafts, config.max_parallelism);

        let mut id_map: HashMap<String, StepId> = HashMap::new();
        for draft_id in &ordered {
            id_map.insert(draft_id.clone(), StepId::new());
        }

        let draft_by_id: HashMap<&str, &WorkItemDraft> = drafts.iter().map(|d| (d.id.as_str(), d)).collect();

        let mut steps = Vec::with_capacity(ordered.len());
        for (index, draft_id) in ordered.iter().enumerate() {
            let draft = draft_by_id[draft_id.as_str()];
            let depends_on = draft.depends_on.iter().map(|dep| id_map[dep]).collect::<Vec<_>>();
            steps.push(Step {
                id: id_map[draft_id],
                story_id: story.id,
                order: (index + 1) as u32,
                wave: waves[draft_id.as_str()],
                name: draft.title.clone(),
                description: draft.description.clone(),
                capability: draft.capability.clone().unwrap_or_else(|| "coding".to_string()),
                language: draft.language.clone(),
                depends_on,
                requires_confirmation: false,
                status: StepStatus::Pending,
                approval: None,
                approval_feedback: None,
                input: None,
                output: None,
                error: None,
                attempts: 0,
                assigned_agent_id: None,
                started_at_ms: None,
                completed_at_ms: None,
                executor_override: None,
                needs_rework: false,
                previous_output: None,
            });
        }

        Ok(steps)
    }

    async fn request_drafts(&self, prompt: &str) -> Result<Vec<WorkItemDraft>, DecomposerError> {
        let response = self.provider.complete(prompt, &CompletionOptions::default()).await?;
        serde_json::from_str(response.trim()).map_err(|e| DecomposerError::ParseError(e.to_string()))
    }
}

fn build_prompt(story: &Story, context: &AnalyzedContext, config: &DecomposeConfig) -> String {
    format!(
        "Decompose the following story into a JSON array of work items, each \
         {{id, title, description, capability?, language?, dependsOn[]}}. Every \
         dependsOn entry must reference an earlier item's id. maxParallelism={}, \
         includeTests={}.\n\nTitle: {}\nSummary: {}\nSuggested approach: {}\n",
        config.max_parallelism, config.include_tests, story.title, context.summary, context.suggested_approach
    )
}

fn validate(drafts: &[WorkItemDraft]) -> Result<(), DecomposerError> {
    let mut seen = HashSet::new();
    for draft in drafts {
        for dep in &draft.depends_on {
            if !seen.contains(dep) {
                return Err(DecomposerError::InvalidDependencies(format!(
                    "{} depends on {} which has not appeared earlier",
                    draft.id, dep
                )));
            }
        }
        seen.insert(draft.id.clone());
    }
    Ok(())
}

/// Topological sort with ties broken by original order (spec §4.5 step 3).
/// `validate` has already guaranteed every `dependsOn` points to an earlier
/// id in the original response order, so a single left-to-right pass that
/// defers an item until its dependencies are placed is sufficient.
fn topological_sort(drafts: &[WorkItemDraft]) -> Result<Vec<String>, DecomposerError> {
    let mut placed: HashSet<String> = HashSet::new();
    let mut ordered = Vec::with_capacity(drafts.len());
    let mut remaining: Vec<&WorkItemDraft> = drafts.iter().collect();

    while !remaining.is_empty() {
        let mut progressed = false;
        let mut next_remaining = Vec::new();
        for draft in remaining {
            if draft.depends_on.iter().all(|d| placed.contains(d)) {
                placed.insert(draft.id.clone());
                ordered.push(draft.id.clone());
                progressed = true;
            } else {
                next_remaining.push(draft);
            }
        }
        if !progressed {
            return Err(DecomposerError::InvalidDependencies("cycle detected in dependsOn graph".to_string()));
        }
        remaining = next_remaining;
    }
    Ok(ordered)
}

/// Longest-path layering with an iterative parallelism-cap re-layering
/// pass (spec §4.5 steps 4–5).
fn layer_with_cap(ordered: &[String], drafts: &[WorkItemDraft], max_parallelism: u32) -> HashMap<String, u32> {
    let draft_by_id: HashMap<&str, &WorkItemDraft> = drafts.iter().map(|d| (d.id.as_str(), d)).collect();
    let mut wave: HashMap<String, u32> = HashMap::new();

    for id in ordered {
        let draft = draft_by_id[id.as_str()];
        let w = draft.depends_on.iter().map(|dep| wave[dep]).max().map(|m| m + 1).unwrap_or(1);
        wave.insert(id.clone(), w);
    }

    if max_parallelism == 0 {
        return wave;
    }

    loop {
        let mut by_wave: HashMap<u32, Vec<&String>> = HashMap::new();
        for id in ordered {
            by_wave.entry(wave[id]).or_default().push(id);
        }

        let mut overflowed = false;
        let max_wave = by_wave.keys().copied().max().unwrap_or(0);
        for w in 1..=max_wave {
            let Some(members) = by_wave.get(&w) else { continue };
            if members.len() as u32 > max_parallelism {
                overflowed = true;
                // Push the lowest-original-order surplus members to the next wave.
                let keep = max_parallelism as usize;
                for id in members.iter().skip(keep) {
                    // `id` came from `ordered`, which was used to build `wave` above.
                    #[allow(clippy::expect_used)]
                    let entry = wave.get_mut(id.as_str()).expect("id present");
                    *entry += 1;
                }
            }
        }

        // Re-run the layering: any item pushed out must still satisfy
        // wave(t) > wave(dep) for every dependency once waves shifted.
        for id in ordered {
            let draft = draft_by_id[id.as_str()];
            let min_required = draft.depends_on.iter().map(|dep| wave[dep] + 1).max().unwrap_or(1);
            if wave[id] < min_required {
                wave.insert(id.clone(), min_required);
                overflowed = true;
            }
        }

        if !overflowed {
            break;
        }
    }

    wave
}

#[cfg(test)]
#[path = "decomposer_tests.rs"]
mod tests;

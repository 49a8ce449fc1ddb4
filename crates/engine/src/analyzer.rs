// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Produces an `AnalyzedContext` from a Story's title/description, an
//! optional code-index retrieval, and the LLM provider (spec §4.4).

use std::sync::Arc;
use story_adapters::{CodeIndex, CompletionOptions, LlmError, LlmProvider};
use story_core::Story;

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("llm unavailable: {0}")]
    LlmUnavailable(String),
    #[error("could not parse analyzer response: {0}")]
    ParseError(String),
}

impl From<LlmError> for AnalyzerError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Transport(msg) => AnalyzerError::LlmUnavailable(msg),
            LlmError::Parse(msg) => AnalyzerError::ParseError(msg),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedContext {
    pub summary: String,
    #[serde(default)]
    pub core_requirements: Vec<String>,
    #[serde(default)]
    pub technical_constraints: Vec<String>,
    #[serde(default)]
    pub affected_files: Vec<String>,
    pub suggested_approach: String,
}

pub struct Analyzer {
    provider: Arc<dyn LlmProvider>,
    code_index: Option<Arc<dyn CodeIndex>>,
}

impl Analyzer {
    pub fn new(provider: Arc<dyn LlmProvider>, code_index: Option<Arc<dyn CodeIndex>>) -> Self {
        Self { provider, code_index }
    }

    pub async fn analyze(&self, story: &Story) -> Result<AnalyzedContext, AnalyzerError> {
        let retrieval = self.retrieve(story).await;
        let prompt = build_prompt(story, &retrieval);

        let response = self.provider.complete(&prompt, &CompletionOptions::default()).await?;
        let context: AnalyzedContext = serde_json::from_str(response.trim())
            .map_err(|e| AnalyzerError::ParseError(e.to_string()))?;
        Ok(context)
    }

    async fn retrieve(&self, story: &Story) -> Vec<String> {
        let (Some(index), Some(repo)) = (&self.code_index, &story.repository_path) else {
            return Vec::new();
        };
        match index.search(repo, &story.title, 5).await {
            Ok(hits) => hits.into_iter().map(|h| format!("{}:{}: {}", h.path, h.line, h.snippet)).collect(),
            Err(err) => {
                tracing::warn!(story_id = %story.id, error = %err, "code index search failed, proceeding without retrieval");
                Vec::new()
            }
        }
    }
}

fn build_prompt(story: &Story, retrieval: &[String]) -> String {
    let mut prompt = format!(
        "Analyze the following story and respond with a single JSON object matching \
         {{summary, coreRequirements[], technicalConstraints[], affectedFiles[], suggestedApproach}}.\n\n\
         Title: {}\nDescription: {}\n",
        story.title, story.description
    );
    if !retrieval.is_empty() {
        prompt.push_str("\nRelevant code context:\n");
        for hit in retrieval {
            prompt.push_str("- ");
            prompt.push_str(hit);
            prompt.push('\n');
        }
    }
    prompt
}

#[cfg(test)]
#[path = "analyzer_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The LLM provider interface (spec §6.1), used by the Analyzer and
//! Decomposer. Transport errors (the request never got a response) are
//! surfaced distinctly from parse errors (a response came back but
//! wasn't usable), per spec.

use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self { model: "default".to_string(), temperature: 0.2, max_tokens: 4096, timeout: Duration::from_secs(120) }
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String, LlmError>;
}

/// HTTP-backed provider speaking an OpenAI-style chat-completions API.
pub struct HttpLlmProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpLlmProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into(), api_key: api_key.into() }
    }
}

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(serde::Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(serde::Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &options.model,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            messages: vec![ChatMessage { role: "user", content: prompt }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LlmError::Transport(format!("provider returned status {}", response.status())));
        }

        let body: ChatResponse = response.json().await.map_err(|e| LlmError::Parse(e.to_string()))?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Parse("empty choices array".to_string()))
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct FakeLlmProvider {
    pub response: parking_lot::Mutex<Result<String, String>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeLlmProvider {
    pub fn returning(response: impl Into<String>) -> Self {
        Self { response: parking_lot::Mutex::new(Ok(response.into())) }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self { response: parking_lot::Mutex::new(Err(message.into())) }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl LlmProvider for FakeLlmProvider {
    async fn complete(&self, _prompt: &str, _options: &CompletionOptions) -> Result<String, LlmError> {
        match &*self.response.lock() {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(LlmError::Transport(message.clone())),
        }
    }
}

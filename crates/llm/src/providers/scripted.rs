//! Scripted LLM provider.
//!
//! Answers from a list of prompt-matching rules instead of a model. Every
//! request is recorded so callers can inspect exactly what was sent. Used for
//! offline dry runs (the final answer echoes the assembled prompt) and by the
//! test suites of the pipeline crates.

use crate::client::{simulate_stream, LlmClient, LlmRequest, LlmResponse, LlmStream, LlmUsage};
use ragoon_core::{AppError, AppResult};
use std::sync::Mutex;

/// How the scripted client answers a matching request.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this text
    Text(String),
    /// Return the prompt itself
    Echo,
    /// Fail with an LLM error carrying this message
    Fail(String),
}

/// Deterministic in-process LLM client.
#[derive(Debug)]
pub struct ScriptedClient {
    rules: Vec<(String, ScriptedReply)>,
    fallback: ScriptedReply,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedClient {
    /// A client with no rules that echoes every prompt.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            fallback: ScriptedReply::Echo,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Client used by the `scripted` provider: classifies every query as basic
    /// and echoes the final prompt, so a run shows what would be sent.
    pub fn offline() -> Self {
        Self::new().when("exactly one word", "True")
    }

    /// Reply with `text` when the prompt contains `needle`. First match wins.
    pub fn when(self, needle: impl Into<String>, text: impl Into<String>) -> Self {
        self.rule(needle, ScriptedReply::Text(text.into()))
    }

    /// Fail when the prompt contains `needle`.
    pub fn failing_when(self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.rule(needle, ScriptedReply::Fail(message.into()))
    }

    pub fn rule(mut self, needle: impl Into<String>, reply: ScriptedReply) -> Self {
        self.rules.push((needle.into(), reply));
        self
    }

    /// Reply used when no rule matches.
    pub fn otherwise(mut self, reply: ScriptedReply) -> Self {
        self.fallback = reply;
        self
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.lock().clone()
    }

    /// Prompts received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.lock().iter().map(|r| r.prompt.clone()).collect()
    }

    /// Number of received prompts containing `needle`.
    pub fn count_matching(&self, needle: &str) -> usize {
        self.lock()
            .iter()
            .filter(|r| r.prompt.contains(needle))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LlmRequest>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn reply_for(&self, prompt: &str) -> &ScriptedReply {
        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply)
            .unwrap_or(&self.fallback)
    }
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.lock().push(request.clone());

        let content = match self.reply_for(&request.prompt) {
            ScriptedReply::Text(text) => text.clone(),
            ScriptedReply::Echo => request.prompt.clone(),
            ScriptedReply::Fail(message) => return Err(AppError::Llm(message.clone())),
        };

        let usage = LlmUsage::new(
            request.prompt.split_whitespace().count() as u32,
            content.split_whitespace().count() as u32,
        );

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage,
            done: true,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        let response = self.complete(request).await?;
        Ok(simulate_stream(response))
    }
}

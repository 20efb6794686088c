//! Hugging Face inference provider.
//!
//! Uses the OpenAI-compatible chat completions route of the Hugging Face
//! inference router. Streaming is simulated: the full completion is fetched
//! and then re-emitted character by character.

use crate::client::{
    simulate_stream, ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmStream, LlmUsage,
};
use ragoon_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://router.huggingface.co";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Hugging Face chat completion client.
pub struct HuggingFaceClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl HuggingFaceClient {
    /// Create a client against the public inference router.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    /// Create a client against a custom (e.g. dedicated endpoint) base URL.
    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn to_chat_request(&self, request: &LlmRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: request.model.clone(),
            messages: request.messages(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        }
    }

    fn convert_response(
        &self,
        response: ChatCompletionResponse,
        requested_model: &str,
    ) -> AppResult<LlmResponse> {
        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Llm("Hugging Face response has no choices".to_string()))?
            .message
            .content
            .unwrap_or_default();

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: response
                .model
                .unwrap_or_else(|| requested_model.to_string()),
            usage,
            done: true,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for HuggingFaceClient {
    fn provider_name(&self) -> &str {
        "huggingface"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(
            "Sending completion request to Hugging Face (model: {})",
            request.model
        );

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&self.to_chat_request(request))
            .send()
            .await
            .map_err(|e| {
                AppError::Llm(format!("Failed to send request to Hugging Face: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Hugging Face API error ({}): {}",
                status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            AppError::Llm(format!("Failed to parse Hugging Face response: {}", e))
        })?;

        let converted = self.convert_response(completion, &request.model)?;
        tracing::debug!(
            "Received completion from Hugging Face ({} tokens)",
            converted.usage.total_tokens
        );
        Ok(converted)
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        let response = self.complete(request).await?;
        Ok(simulate_stream(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_conversion() {
        let client = HuggingFaceClient::new("hf_test");
        let request = LlmRequest::new("Visa rules for Vietnam?", "meta-llama/Llama-3.2-3B-Instruct")
            .with_max_tokens(256)
            .with_streaming();

        let body = client.to_chat_request(&request);
        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.max_tokens, Some(256));
        assert!(!body.stream);

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("temperature").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_convert_response() {
        let client = HuggingFaceClient::with_base_url("http://localhost:8080/", "hf_test");
        assert_eq!(client.base_url, "http://localhost:8080");

        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": "Try bun cha."}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4}
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        let response = client.convert_response(parsed, "m").unwrap();

        assert_eq!(response.content, "Try bun cha.");
        assert_eq!(response.model, "m");
        assert_eq!(response.usage.total_tokens, 16);
    }

    #[test]
    fn test_convert_response_without_choices() {
        let client = HuggingFaceClient::new("hf_test");
        let parsed: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(client.convert_response(parsed, "m").is_err());
    }
}

//! Complete command handler.
//!
//! Sends a prompt straight to the configured model, without retrieval.

use super::{load_history, print_fragment};
use clap::Args;
use futures::StreamExt;
use ragoon_core::{config::AppConfig, AppResult};
use ragoon_llm::{create_client, LlmClient, LlmRequest};
use std::path::PathBuf;

/// Plain completion without retrieval
#[derive(Args, Debug)]
pub struct CompleteCommand {
    /// The prompt text
    pub prompt: String,

    /// Stream the response
    #[arg(long)]
    pub stream: bool,

    /// Maximum tokens in response
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Temperature for response generation (0.0-2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// System prompt sent ahead of the conversation
    #[arg(long)]
    pub system: Option<String>,

    /// Conversation history file (JSON array of {role, content})
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, conflicts_with = "stream")]
    pub json: bool,
}

impl CompleteCommand {
    /// Execute the complete command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing complete command");
        tracing::debug!("Complete command options: {:?}", self);

        let api_key = config.resolve_api_key(&config.provider);
        let endpoint = config.resolve_endpoint(&config.provider);
        let client = create_client(&config.provider, endpoint.as_deref(), api_key.as_deref())?;

        let request = self.request(config)?;

        if self.stream {
            self.handle_streaming(client.as_ref(), &request.with_streaming())
                .await
        } else {
            self.handle_non_streaming(client.as_ref(), &request, config)
                .await
        }
    }

    /// Build the request; history and system prompt travel as chat turns.
    fn request(&self, config: &AppConfig) -> AppResult<LlmRequest> {
        let mut request = LlmRequest::new(self.prompt.clone(), config.model.clone())
            .with_max_tokens(self.max_tokens.unwrap_or(config.max_tokens));
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(ref system) = self.system {
            request = request.with_system(system.clone());
        }
        if let Some(ref path) = self.history {
            request = request.with_history(load_history(path)?);
        }
        Ok(request)
    }

    async fn handle_non_streaming(
        &self,
        client: &dyn LlmClient,
        request: &LlmRequest,
        config: &AppConfig,
    ) -> AppResult<()> {
        let response = client.complete(request).await?;

        if self.json {
            let output = serde_json::json!({
                "text": response.content,
                "model": response.model,
                "provider": config.provider,
                "usage": {
                    "promptTokens": response.usage.prompt_tokens,
                    "completionTokens": response.usage.completion_tokens,
                    "totalTokens": response.usage.total_tokens
                }
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", response.content);
        }

        tracing::debug!(
            "Token usage - Prompt: {}, Completion: {}, Total: {}",
            response.usage.prompt_tokens,
            response.usage.completion_tokens,
            response.usage.total_tokens
        );

        Ok(())
    }

    async fn handle_streaming(&self, client: &dyn LlmClient, request: &LlmRequest) -> AppResult<()> {
        let mut stream = client.stream(request).await?;

        while let Some(result) = stream.next().await {
            let chunk = result?;
            if !chunk.content.is_empty() {
                print_fragment(&chunk.content);
            }
            if chunk.done {
                if let Some(usage) = chunk.usage {
                    tracing::debug!("Token usage - Total: {}", usage.total_tokens);
                }
                break;
            }
        }
        println!();

        Ok(())
    }
}

//! LLM provider factory.
//!
//! Builds the completion client named by the configuration, injecting the
//! endpoint and API key resolved by `ragoon_core::AppConfig`.

use crate::client::LlmClient;
use crate::providers::{HuggingFaceClient, OllamaClient, ScriptedClient};
use crate::types::ProviderType;
use ragoon_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("huggingface", "ollama", "scripted")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by hosted providers
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required key is
/// missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    if provider_type.requires_api_key() && api_key.is_none() {
        return Err(AppError::Config(format!(
            "{} provider requires API key",
            provider_type.as_str()
        )));
    }

    let client: Arc<dyn LlmClient> = match provider_type {
        ProviderType::HuggingFace => {
            let token = api_key.unwrap_or_default();
            let client = match endpoint {
                Some(url) => HuggingFaceClient::with_base_url(url, token),
                None => HuggingFaceClient::new(token),
            };
            Arc::new(client)
        }
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or("http://localhost:11434");
            Arc::new(OllamaClient::with_base_url(base_url))
        }
        ProviderType::Scripted => Arc::new(ScriptedClient::offline()),
    };

    tracing::debug!("Created LLM client for provider '{}'", client.provider_name());
    Ok(client)
}

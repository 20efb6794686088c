//! Prompt execution against the completion client.
//!
//! Every model call of the pipeline goes through [`PromptRunner`]: render a
//! library prompt, send it with the prompt's temperature, return the text.

use ragoon_core::AppResult;
use ragoon_llm::{LlmClient, LlmRequest};
use ragoon_prompt::PromptLibrary;
use std::collections::HashMap;
use std::sync::Arc;

/// Renders prompts and sends them to the configured model.
pub struct PromptRunner {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    model: String,
    max_tokens: u32,
}

impl PromptRunner {
    pub fn new(
        client: Arc<dyn LlmClient>,
        prompts: Arc<PromptLibrary>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            prompts,
            model: model.into(),
            max_tokens,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn client(&self) -> &Arc<dyn LlmClient> {
        &self.client
    }

    /// Build the request for a library prompt without sending it.
    pub fn request(
        &self,
        prompt_id: &str,
        variables: &HashMap<String, String>,
    ) -> AppResult<LlmRequest> {
        let rendered = self.prompts.render(prompt_id, variables)?;

        let mut request =
            LlmRequest::new(rendered.text, self.model.clone()).with_max_tokens(self.max_tokens);
        if let Some(temperature) = rendered.temperature {
            request = request.with_temperature(temperature);
        }
        Ok(request)
    }

    /// Render a library prompt, send it, return the generated text.
    pub async fn run(
        &self,
        prompt_id: &str,
        variables: &HashMap<String, String>,
    ) -> AppResult<String> {
        let request = self.request(prompt_id, variables)?;
        tracing::debug!(
            "Sending '{}' to {} ({} chars)",
            prompt_id,
            self.client.provider_name(),
            request.prompt.len()
        );

        let response = self.client.complete(&request).await?;
        Ok(response.content)
    }
}

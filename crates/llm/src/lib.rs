//! LLM integration crate for Ragoon.
//!
//! Provider-agnostic access to text-completion models. Every RAG stage
//! (controller gate, query transformers, answer generation) goes through the
//! [`LlmClient`] trait.
//!
//! # Providers
//! - **Hugging Face**: hosted inference, OpenAI-compatible chat completions (default)
//! - **Ollama**: local LLM runtime
//! - **Scripted**: deterministic in-process replies for offline runs and tests
//!
//! # Example
//! ```no_run
//! use ragoon_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Best time to visit Hoi An?", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{
    simulate_stream, ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk,
    LlmUsage, Role,
};
pub use factory::create_client;
pub use providers::{HuggingFaceClient, OllamaClient, ScriptedClient};
pub use types::ProviderType;

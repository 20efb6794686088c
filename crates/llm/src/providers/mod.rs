//! LLM provider implementations.

pub mod huggingface;
pub mod ollama;
pub mod scripted;

pub use huggingface::HuggingFaceClient;
pub use ollama::OllamaClient;
pub use scripted::ScriptedClient;

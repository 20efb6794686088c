//! Result types of the RAG orchestrator.

use chrono::{DateTime, Utc};
use futures::Stream;
use ragoon_llm::ChatMessage;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Structured result of one RAG request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    /// Generated answer, or `"Error: <message>"` when `failed`
    pub text: String,

    /// Model that produced the answer
    pub model: String,

    /// The user's question as answered
    pub question: String,

    /// Retrieval units after transformation
    pub units: Vec<Vec<String>>,

    /// Context snippets given to the model, in unit order
    pub contexts: Vec<String>,

    /// Whether the controller classified the query as basic
    pub basic: bool,

    /// Whether the pipeline failed
    pub failed: bool,

    /// Correlates with the `rag_request` log span
    #[serde(rename = "requestId")]
    pub request_id: String,

    pub timestamp: DateTime<Utc>,
}

/// Result of [`crate::Rag::chat`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,

    /// Caller's history with the user and assistant turns appended
    #[serde(rename = "updatedHistory")]
    pub updated_history: Vec<ChatMessage>,
}

/// One chunk of a simulated answer stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagStreamChunk {
    /// Answer text accumulated so far
    pub text: String,

    /// Text added by this chunk
    pub delta: String,

    /// Set on the single chunk emitted for a failed request
    pub failed: bool,
}

/// Stream of answer chunks.
pub type RagStream = Pin<Box<dyn Stream<Item = RagStreamChunk> + Send>>;

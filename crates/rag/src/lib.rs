//! Retrieval-augmented generation for the Ragoon travel assistant.
//!
//! This crate provides:
//! - The query model (retrieval units and their one-time shape coercion)
//! - The basic-query controller gate
//! - Query transformer stages (HyDE, multi-step decomposition, reranking)
//!   and the registry that resolves them by key
//! - The retriever boundary (Snowflake Cortex Search, local JSON-lines)
//! - The orchestrator tying them to answer generation
//!
//! # Example
//! ```no_run
//! use ragoon_core::AppConfig;
//! use ragoon_rag::Rag;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! let rag = Rag::from_config(&config)?;
//! println!("{}", rag.complete("Where should I eat in Hanoi?", None).await);
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod orchestrator;
pub mod query;
pub mod retriever;
pub mod runner;
pub mod similarity;
pub mod transform;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export main types
pub use controller::Controller;
pub use orchestrator::{Rag, RagBuilder};
pub use query::{NormalizedQuery, QueryInput, RetrievalUnit, RetrievalUnits};
pub use retriever::{
    create_retriever, CortexSearchRetriever, LocalRetriever, Retriever, SearchRecord,
};
pub use runner::PromptRunner;
pub use transform::{
    HydeTransformer, MultiStepTransformer, QueryTransformer, RelevanceScorer, Reranker,
    StageContext, TransformerRegistry, TrigramScorer,
};
pub use types::{ChatReply, RagAnswer, RagStream, RagStreamChunk};

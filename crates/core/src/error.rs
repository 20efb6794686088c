//! Error types for Ragoon.
//!
//! A single error enum covers every failure category of the assistant:
//! configuration, the RAG pipeline stages (controller, transformers,
//! retrieval, generation), the LLM boundary and the prompt system.

use thiserror::Error;

/// Unified error type for Ragoon.
///
/// Library functions return `Result<T, AppError>`. The RAG orchestrator is the
/// only place that turns an `AppError` into user-facing text; everything below
/// it propagates.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing credentials, invalid settings, unknown transformer keys
    #[error("Configuration error: {0}")]
    Config(String),

    /// The controller gate answered with something other than its two literals
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A query transformer stage failed
    #[error("Transform error: {0}")]
    Transform(String),

    /// The search service failed
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// The final answer generation failed
    #[error("Generation error: {0}")]
    Generation(String),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// The request carried no usable query
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// The inner message without the category prefix.
    pub fn message(&self) -> String {
        match self {
            AppError::Config(msg)
            | AppError::Protocol(msg)
            | AppError::Transform(msg)
            | AppError::Retrieval(msg)
            | AppError::Generation(msg)
            | AppError::Llm(msg)
            | AppError::Prompt(msg)
            | AppError::InvalidQuery(msg)
            | AppError::Serialization(msg)
            | AppError::Other(msg) => msg.clone(),
            AppError::Io(err) => err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

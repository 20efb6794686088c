//! Ragoon Core Library
//!
//! This crate provides the foundational utilities shared by every Ragoon crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management (LLM provider, RAG pipeline, search service)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

//! Prompt system for Ragoon.
//!
//! This crate provides:
//! - YAML prompt definitions, built in and overridable per workspace
//! - Handlebars rendering with strict variable checking
//! - The four prompts of the RAG pipeline (answer, controller, HyDE, decomposition)

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{vars, PromptLibrary};
pub use loader::{list_prompts, load_builtin, load_prompt};
pub use types::{PromptDefinition, PromptListing, PromptSource, RenderedPrompt};

//! Prompt types for Ragoon.

use serde::{Deserialize, Serialize};

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier (e.g. "rag.answer")
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Variables the template requires
    #[serde(default)]
    pub variables: Vec<String>,

    /// Sampling temperature the prompt is designed for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Template string with Handlebars syntax
    pub template: String,
}

/// Where a prompt definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptSource {
    /// Compiled into the binary
    Builtin,
    /// `.ragoon/prompts/<id>.yml` in the workspace
    Workspace,
}

/// Entry returned by prompt listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptListing {
    pub id: String,
    pub title: String,
    pub source: PromptSource,
}

/// A rendered prompt ready for LLM execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedPrompt {
    /// Source prompt ID
    #[serde(rename = "promptId")]
    pub prompt_id: String,

    /// Rendered text
    pub text: String,

    /// Temperature declared by the definition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

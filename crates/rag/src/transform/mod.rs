//! Query transformer stages.
//!
//! A stage maps retrieval units to retrieval units. Stages are looked up by
//! key in a [`TransformerRegistry`] that the caller builds and hands to the
//! orchestrator builder; there is no global registry.

pub mod hyde;
pub mod multistep;
pub mod rerank;

pub use hyde::HydeTransformer;
pub use multistep::MultiStepTransformer;
pub use rerank::{RelevanceScorer, Reranker, TrigramScorer};

use crate::query::RetrievalUnits;
use crate::runner::PromptRunner;
use ragoon_core::config::RagSettings;
use ragoon_core::{AppError, AppResult};
use std::sync::Arc;

/// Registry key of the hypothetical-document stage.
pub const HYDE: &str = "HyDE";
/// Registry key of the decomposition stage.
pub const MULTI_STEP: &str = "MultiStep";
/// Registry key of the reranking stage.
pub const RERANK: &str = "Rerank";

/// Per-request data handed to every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageContext {
    /// The user's text, before any transformation
    pub original_query: String,
}

impl StageContext {
    pub fn new(original_query: impl Into<String>) -> Self {
        Self {
            original_query: original_query.into(),
        }
    }
}

/// One stage of the transformer chain.
#[async_trait::async_trait]
pub trait QueryTransformer: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Transform the units. Must not return an empty list for non-empty input.
    async fn transform(
        &self,
        units: RetrievalUnits,
        ctx: &StageContext,
    ) -> AppResult<RetrievalUnits>;
}

/// Stage key to transformer mapping.
#[derive(Default, Clone)]
pub struct TransformerRegistry {
    entries: Vec<(String, Arc<dyn QueryTransformer>)>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the three built-in stages configured from `settings`.
    pub fn standard(runner: Arc<PromptRunner>, settings: &RagSettings) -> Self {
        Self::new()
            .with(
                HYDE,
                Arc::new(HydeTransformer::new(runner.clone(), &settings.hyde)),
            )
            .with(
                MULTI_STEP,
                Arc::new(MultiStepTransformer::new(runner, settings.max_subqueries)),
            )
            .with(
                RERANK,
                Arc::new(Reranker::new(
                    Arc::new(TrigramScorer),
                    settings.rerank.top_n,
                    settings.rerank.min_score,
                )),
            )
    }

    /// Register a stage, replacing any stage with the same key.
    pub fn register(&mut self, key: impl Into<String>, transformer: Arc<dyn QueryTransformer>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = transformer,
            None => self.entries.push((key, transformer)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, transformer: Arc<dyn QueryTransformer>) -> Self {
        self.register(key, transformer);
        self
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn QueryTransformer>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, t)| t.clone())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Resolve an ordered stage list.
    ///
    /// # Errors
    /// Returns `AppError::Config` naming the first unknown key.
    pub fn resolve(&self, stages: &[String]) -> AppResult<Vec<Arc<dyn QueryTransformer>>> {
        stages
            .iter()
            .map(|key| {
                self.get(key).ok_or_else(|| {
                    AppError::Config(format!(
                        "Unknown transformer stage '{}'. Registered: {}",
                        key,
                        self.keys().collect::<Vec<_>>().join(", ")
                    ))
                })
            })
            .collect()
    }
}

//! Hypothetical document expansion (HyDE).
//!
//! Replaces each unit with a model-written travel-guide passage answering the
//! unit's query. A passage reads more like the indexed records than a short
//! question does, so it retrieves better.

use super::{QueryTransformer, StageContext};
use crate::query::{unit_query, RetrievalUnit, RetrievalUnits};
use crate::runner::PromptRunner;
use ragoon_core::config::HydeSettings;
use ragoon_core::{AppError, AppResult};
use ragoon_prompt::{builtin, vars};
use std::sync::Arc;

pub struct HydeTransformer {
    runner: Arc<PromptRunner>,
    include_original: bool,
    trim_query_echo: bool,
}

impl HydeTransformer {
    pub fn new(runner: Arc<PromptRunner>, settings: &HydeSettings) -> Self {
        Self {
            runner,
            include_original: settings.include_original,
            trim_query_echo: settings.trim_query_echo,
        }
    }

    /// Passage for a single query, trimmed. May be empty.
    pub async fn generate_passage(&self, query: &str) -> AppResult<String> {
        let passage = self
            .runner
            .run(builtin::HYDE, &vars([("query", query.to_string())]))
            .await
            .map_err(|e| {
                AppError::Transform(format!("HyDE generation failed for {:?}: {}", query, e))
            })?;

        Ok(passage.trim().to_string())
    }

    async fn expand(&self, unit: RetrievalUnit) -> AppResult<RetrievalUnit> {
        let Some(query) = unit_query(&unit).map(str::to_string) else {
            return Ok(unit);
        };

        let passage = self.generate_passage(&query).await?;
        if passage.is_empty() {
            tracing::warn!("HyDE returned a blank passage for {:?}; keeping the unit", query);
            return Ok(unit);
        }

        tracing::debug!("HyDE passage for {:?}: {} chars", query, passage.len());

        let mut expanded = vec![passage];
        if self.include_original {
            expanded.push(query.clone());
        }
        if self.trim_query_echo {
            trim_query_echo(&mut expanded, &query);
        }
        Ok(expanded)
    }
}

/// Remove the trailing element when, and only when, it equals `query` and
/// something else remains.
pub fn trim_query_echo(unit: &mut RetrievalUnit, query: &str) {
    if unit.len() > 1 && unit.last().map(String::as_str) == Some(query) {
        unit.pop();
    }
}

#[async_trait::async_trait]
impl QueryTransformer for HydeTransformer {
    fn name(&self) -> &str {
        "HyDE"
    }

    async fn transform(
        &self,
        units: RetrievalUnits,
        _ctx: &StageContext,
    ) -> AppResult<RetrievalUnits> {
        let mut expanded = Vec::with_capacity(units.len());
        for unit in units {
            expanded.push(self.expand(unit).await?);
        }
        Ok(RetrievalUnits::from_units(expanded))
    }
}

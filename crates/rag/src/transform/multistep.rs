//! Multi-step query decomposition.
//!
//! Asks the model to split a compound question into sub-queries and fans
//! each unit out into one unit per sub-query.

use super::{QueryTransformer, StageContext};
use crate::query::{unit_query, RetrievalUnit, RetrievalUnits};
use crate::runner::PromptRunner;
use ragoon_core::{AppError, AppResult};
use ragoon_prompt::{builtin, vars};
use std::sync::Arc;

pub struct MultiStepTransformer {
    runner: Arc<PromptRunner>,
    max_subqueries: usize,
}

impl MultiStepTransformer {
    pub fn new(runner: Arc<PromptRunner>, max_subqueries: usize) -> Self {
        Self {
            runner,
            max_subqueries,
        }
    }

    /// Sub-queries of `query`, at most `max_subqueries` of them.
    ///
    /// # Errors
    /// Returns `AppError::Transform` when the completion call fails.
    pub async fn decompose(&self, query: &str, max_subqueries: usize) -> AppResult<Vec<String>> {
        let reply = self
            .runner
            .run(
                builtin::DECOMPOSE,
                &vars([
                    ("query", query.to_string()),
                    ("max_subqueries", max_subqueries.to_string()),
                ]),
            )
            .await
            .map_err(|e| {
                AppError::Transform(format!("Decomposition failed for {:?}: {}", query, e))
            })?;

        Ok(parse_subqueries(&reply, max_subqueries))
    }

    async fn fan_out(&self, unit: RetrievalUnit) -> AppResult<Vec<RetrievalUnit>> {
        let Some(query) = unit_query(&unit) else {
            return Ok(vec![unit]);
        };

        let subqueries = self.decompose(query, self.max_subqueries).await?;
        if subqueries.is_empty() {
            tracing::debug!("No sub-queries for {:?}; passing through", query);
            return Ok(vec![unit]);
        }

        tracing::debug!("Decomposed {:?} into {:?}", query, subqueries);
        Ok(subqueries.into_iter().map(|q| vec![q]).collect())
    }
}

/// Parse a decomposition reply.
///
/// Lines are trimmed and blank ones dropped. The first remaining line echoes
/// the instruction and is discarded. List markers are stripped and the result
/// is capped at `max`.
pub fn parse_subqueries(reply: &str, max: usize) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .skip(1)
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .take(max)
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix(['-', '*', '•']) {
        return rest.trim_start();
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(['.', ')']) {
            // "1.5-day" is a query, "1. Hue" is a list item
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return rest.trim_start();
            }
        }
    }

    line
}

#[async_trait::async_trait]
impl QueryTransformer for MultiStepTransformer {
    fn name(&self) -> &str {
        "MultiStep"
    }

    async fn transform(
        &self,
        units: RetrievalUnits,
        _ctx: &StageContext,
    ) -> AppResult<RetrievalUnits> {
        let mut out = Vec::new();
        for unit in units {
            out.extend(self.fan_out(unit).await?);
        }
        Ok(RetrievalUnits::from_units(out))
    }
}

//! Unit reranking.
//!
//! Orders retrieval units by how relevant their query is to the user's
//! original text, and keeps the best few.

use super::{QueryTransformer, StageContext};
use crate::query::{unit_query, RetrievalUnits};
use crate::similarity::text_similarity;
use ragoon_core::AppResult;
use std::cmp::Ordering;
use std::sync::Arc;

/// Scores a candidate query against a reference query (higher = more relevant).
pub trait RelevanceScorer: Send + Sync {
    fn score(&self, reference: &str, candidate: &str) -> f32;
}

/// Character-trigram cosine similarity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrigramScorer;

impl RelevanceScorer for TrigramScorer {
    fn score(&self, reference: &str, candidate: &str) -> f32 {
        text_similarity(reference, candidate)
    }
}

pub struct Reranker {
    scorer: Arc<dyn RelevanceScorer>,
    top_n: usize,
    min_score: f32,
}

impl Reranker {
    pub fn new(scorer: Arc<dyn RelevanceScorer>, top_n: usize, min_score: f32) -> Self {
        Self {
            scorer,
            top_n: top_n.max(1),
            min_score,
        }
    }

    /// Rerank `units` against `reference`.
    ///
    /// Stable descending sort by score, units below `min_score` dropped, at
    /// most `top_n` kept. The best unit survives even if it scores below the
    /// threshold.
    pub fn rerank(&self, units: RetrievalUnits, reference: &str) -> RetrievalUnits {
        let mut scored: Vec<(f32, Vec<String>)> = units
            .into_iter()
            .map(|unit| {
                let score = unit_query(&unit)
                    .map(|q| self.scorer.score(reference, q))
                    .unwrap_or(0.0);
                (score, unit)
            })
            .collect();

        // Vec::sort_by is stable, ties keep their input order
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        for (score, unit) in &scored {
            tracing::debug!("Rerank score {:.3} for {:?}", score, unit_query(unit));
        }

        let kept: Vec<Vec<String>> = scored
            .iter()
            .enumerate()
            .filter(|(rank, (score, _))| *rank == 0 || *score >= self.min_score)
            .take(self.top_n)
            .map(|(_, (_, unit))| unit.clone())
            .collect();

        RetrievalUnits::from_units(kept)
    }
}

#[async_trait::async_trait]
impl QueryTransformer for Reranker {
    fn name(&self) -> &str {
        "Rerank"
    }

    async fn transform(
        &self,
        units: RetrievalUnits,
        ctx: &StageContext,
    ) -> AppResult<RetrievalUnits> {
        Ok(self.rerank(units, &ctx.original_query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scores from a fixed lookup table.
    struct Fixed(Vec<(&'static str, f32)>);

    impl RelevanceScorer for Fixed {
        fn score(&self, _reference: &str, candidate: &str) -> f32 {
            self.0
                .iter()
                .find(|(q, _)| *q == candidate)
                .map(|(_, s)| *s)
                .unwrap_or(0.0)
        }
    }

    #[test]
    fn test_sorted_descending_and_capped() {
        let reranker = Reranker::new(
            Arc::new(Fixed(vec![("a", 0.1), ("b", 0.9), ("c", 0.5)])),
            2,
            0.0,
        );
        let out = reranker.rerank(RetrievalUnits::from_queries(["a", "b", "c"]), "ref");
        assert_eq!(out.queries(), vec!["b", "c"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let reranker = Reranker::new(
            Arc::new(Fixed(vec![("x", 0.5), ("y", 0.5), ("z", 0.5)])),
            3,
            0.0,
        );
        let out = reranker.rerank(RetrievalUnits::from_queries(["y", "x", "z"]), "ref");
        assert_eq!(out.queries(), vec!["y", "x", "z"]);
    }

    #[test]
    fn test_min_score_never_empties_result() {
        let reranker = Reranker::new(
            Arc::new(Fixed(vec![("a", 0.1), ("b", 0.2)])),
            3,
            0.8,
        );
        let out = reranker.rerank(RetrievalUnits::from_queries(["a", "b"]), "ref");
        assert_eq!(out.queries(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_trigram_scorer_uses_original_query() {
        let reranker = Reranker::new(Arc::new(TrigramScorer), 1, 0.0);
        let units = RetrievalUnits::from_queries([
            "Ski resorts in the Swiss Alps",
            "Best street food stalls in Hanoi",
        ]);

        let out = reranker
            .transform(units, &StageContext::new("Where to eat street food in Hanoi?"))
            .await
            .unwrap();
        assert_eq!(out.queries(), vec!["Best street food stalls in Hanoi"]);
    }

    #[test]
    fn test_whole_units_move_together() {
        let reranker = Reranker::new(Arc::new(Fixed(vec![("q2", 1.0)])), 2, 0.0);
        let units = RetrievalUnits::from_units(vec![
            vec!["q1".to_string(), "extra1".to_string()],
            vec!["q2".to_string(), "extra2".to_string()],
        ]);
        let out = reranker.rerank(units, "ref").into_inner();
        assert_eq!(out[0], vec!["q2", "extra2"]);
        assert_eq!(out[1], vec!["q1", "extra1"]);
    }
}

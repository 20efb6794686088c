//! Offline retriever over a JSON-lines records file.
//!
//! Each non-blank line is one JSON object, e.g.
//! `{"NAME": "Pho Thin", "INFORMATION": "Beef pho on Lo Duc street"}`.
//! Records are ranked by trigram similarity between the query and the
//! requested columns.

use super::{record_text, Retriever, SearchRecord};
use crate::similarity::{cosine_similarity, trigram_vector, DEFAULT_DIMENSIONS};
use ragoon_core::{AppError, AppResult};
use serde_json::Value;
use std::cmp::Ordering;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct LocalRetriever {
    records: Vec<SearchRecord>,
}

impl LocalRetriever {
    pub fn from_records(records: Vec<SearchRecord>) -> Self {
        Self { records }
    }

    /// Load records from a JSON-lines file.
    pub fn open(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read search records {:?}: {}", path, e))
        })?;

        let records = parse_records(&contents)
            .map_err(|e| AppError::Config(format!("{:?}: {}", path, e.message())))?;

        tracing::debug!("Loaded {} search records from {:?}", records.len(), path);
        Ok(Self::from_records(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_records(contents: &str) -> AppResult<Vec<SearchRecord>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(record)) => Ok(record),
            Ok(_) => Err(AppError::Serialization(format!(
                "line {}: expected a JSON object",
                index + 1
            ))),
            Err(e) => Err(AppError::Serialization(format!("line {}: {}", index + 1, e))),
        })
        .collect()
}

fn project(record: &SearchRecord, columns: &[String]) -> SearchRecord {
    columns
        .iter()
        .filter_map(|column| record.get(column).map(|v| (column.clone(), v.clone())))
        .collect()
}

#[async_trait::async_trait]
impl Retriever for LocalRetriever {
    fn name(&self) -> &str {
        "local"
    }

    async fn search(
        &self,
        query: &str,
        columns: &[String],
        limit: usize,
    ) -> AppResult<Vec<SearchRecord>> {
        let query_vector = trigram_vector(query, DEFAULT_DIMENSIONS);

        let mut scored: Vec<(f32, &SearchRecord)> = self
            .records
            .iter()
            .filter_map(|record| {
                let text = columns
                    .iter()
                    .filter_map(|column| record_text(record, column))
                    .collect::<Vec<_>>()
                    .join(" ");
                let score =
                    cosine_similarity(&query_vector, &trigram_vector(&text, DEFAULT_DIMENSIONS));
                (score > 0.0).then_some((score, record))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, record)| project(record, columns))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORDS: &str = r#"
{"NAME": "Pho Thin", "INFORMATION": "Beef pho on Lo Duc street in Hanoi", "CITY": "Hanoi"}
{"NAME": "Bun Cha Huong Lien", "INFORMATION": "Grilled pork and noodles in Hanoi", "CITY": "Hanoi"}

{"NAME": "Imperial City", "INFORMATION": "Citadel of the Nguyen dynasty in Hue", "CITY": "Hue"}
"#;

    fn columns() -> Vec<String> {
        vec!["NAME".to_string(), "INFORMATION".to_string()]
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        assert_eq!(parse_records(RECORDS).unwrap().len(), 3);
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        let err = parse_records("{\"NAME\":\"a\"}\n[1,2]\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[tokio::test]
    async fn test_search_ranks_and_limits() {
        let retriever = LocalRetriever::from_records(parse_records(RECORDS).unwrap());
        let results = retriever
            .search("Hanoi pho noodles", &columns(), 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| record_text(r, "INFORMATION").unwrap().contains("Hanoi")));
    }

    #[tokio::test]
    async fn test_search_projects_columns() {
        let retriever = LocalRetriever::from_records(parse_records(RECORDS).unwrap());
        let results = retriever.search("Hue citadel", &columns(), 1).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(record_text(&results[0], "NAME").as_deref(), Some("Imperial City"));
        assert!(!results[0].contains_key("CITY"));
    }

    #[tokio::test]
    async fn test_no_overlap_returns_nothing() {
        let retriever = LocalRetriever::from_records(parse_records(RECORDS).unwrap());
        let results = retriever.search("is it the", &columns(), 4).await.unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_open_missing_file() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(LocalRetriever::open(&temp.path().join("nope.jsonl")).is_err());
    }
}

//! Retriever boundary.
//!
//! The pipeline only needs "give me up to `limit` records for this query".
//! Records are JSON objects keyed by column name; the orchestrator picks the
//! content and source columns out of them.

pub mod cortex;
pub mod local;

pub use cortex::CortexSearchRetriever;
pub use local::LocalRetriever;

use ragoon_core::config::{AppConfig, SearchBackend};
use ragoon_core::{AppError, AppResult};
use serde_json::{Map, Value};
use std::sync::Arc;

/// One search hit: column name to value.
pub type SearchRecord = Map<String, Value>;

/// Trait for document search services.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Search for `query`, returning at most `limit` records restricted to
    /// `columns`, best first.
    async fn search(
        &self,
        query: &str,
        columns: &[String],
        limit: usize,
    ) -> AppResult<Vec<SearchRecord>>;
}

/// Text of a record column. Non-string scalars are rendered; null and
/// missing columns yield `None`.
pub fn record_text(record: &SearchRecord, column: &str) -> Option<String> {
    match record.get(column)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Build the retriever selected by `config.search.backend`.
///
/// # Errors
/// Returns `AppError::Config` when required settings are missing, or the
/// local records file cannot be loaded.
pub fn create_retriever(config: &AppConfig) -> AppResult<Arc<dyn Retriever>> {
    let search = &config.search;

    let retriever: Arc<dyn Retriever> = match search.backend {
        SearchBackend::Cortex => {
            let token = config.resolve_search_token().ok_or_else(|| {
                AppError::Config(format!(
                    "Search token not found in environment variable: {}",
                    search.token_env
                ))
            })?;
            Arc::new(CortexSearchRetriever::from_settings(search, token)?)
        }
        SearchBackend::Local => {
            let path = config.local_search_path().ok_or_else(|| {
                AppError::Config("Local search backend requires search.localPath".to_string())
            })?;
            Arc::new(LocalRetriever::open(&path)?)
        }
    };

    tracing::info!("Using {} retriever", retriever.name());
    Ok(retriever)
}

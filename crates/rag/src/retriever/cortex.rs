//! Snowflake Cortex Search REST retriever.

use super::{Retriever, SearchRecord};
use ragoon_core::config::SearchSettings;
use ragoon_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    columns: &'a [String],
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<SearchRecord>,
}

/// Client for one Cortex Search service.
pub struct CortexSearchRetriever {
    url: String,
    token: String,
    client: reqwest::Client,
}

impl CortexSearchRetriever {
    /// `account` is either a full URL or a Snowflake account identifier
    /// (`xy12345.eu-west-1`), expanded to `https://<account>.snowflakecomputing.com`.
    pub fn new(
        account: &str,
        database: &str,
        schema: &str,
        service: &str,
        token: impl Into<String>,
    ) -> Self {
        let base = if account.starts_with("http://") || account.starts_with("https://") {
            account.trim_end_matches('/').to_string()
        } else {
            format!("https://{}.snowflakecomputing.com", account)
        };

        Self {
            url: format!(
                "{}/api/v2/databases/{}/schemas/{}/cortex-search-services/{}:query",
                base, database, schema, service
            ),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_settings(settings: &SearchSettings, token: impl Into<String>) -> AppResult<Self> {
        let require = |value: &Option<String>, var: &str| {
            value
                .clone()
                .ok_or_else(|| AppError::Config(format!("Cortex search requires {}", var)))
        };

        Ok(Self::new(
            &require(&settings.account, "SNOWFLAKE_ACCOUNT")?,
            &require(&settings.database, "SNOWFLAKE_DATABASE")?,
            &require(&settings.schema, "SNOWFLAKE_SCHEMA")?,
            &require(&settings.service, "SNOWFLAKE_CORTEX_SEARCH_SERVICE")?,
            token,
        ))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl Retriever for CortexSearchRetriever {
    fn name(&self) -> &str {
        "cortex"
    }

    async fn search(
        &self,
        query: &str,
        columns: &[String],
        limit: usize,
    ) -> AppResult<Vec<SearchRecord>> {
        tracing::debug!("Cortex search (limit {}): {}", limit, query);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .json(&QueryRequest {
                query,
                columns,
                limit,
            })
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Cortex search request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Retrieval(format!(
                "Cortex search error ({}): {}",
                status, error_text
            )));
        }

        let body: QueryResponse = response.json().await.map_err(|e| {
            AppError::Retrieval(format!("Failed to parse Cortex search response: {}", e))
        })?;

        tracing::debug!("Cortex search returned {} results", body.results.len());
        Ok(body.results)
    }
}

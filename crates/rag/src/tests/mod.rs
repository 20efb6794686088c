//! Pipeline scenario tests and their fixtures.

mod pipeline;

use crate::query::RetrievalUnits;
use crate::retriever::{Retriever, SearchRecord};
use crate::transform::{QueryTransformer, StageContext};
use ragoon_core::{AppError, AppResult};
use ragoon_llm::{LlmClient, LlmRequest, LlmResponse, LlmStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A `{NAME, INFORMATION}` record.
pub(crate) fn record(name: &str, information: &str) -> SearchRecord {
    let mut record = SearchRecord::new();
    record.insert("NAME".to_string(), name.into());
    record.insert("INFORMATION".to_string(), information.into());
    record
}

/// One call received by [`FakeRetriever`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SearchCall {
    pub query: String,
    pub columns: Vec<String>,
    pub limit: usize,
}

/// Retriever answering from canned records and recording every call.
///
/// Returns every record of the first rule whose needle occurs in the query,
/// ignoring `limit`, so truncation by the orchestrator is observable.
#[derive(Default)]
pub(crate) struct FakeRetriever {
    rules: Vec<(String, Vec<SearchRecord>)>,
    failure: Option<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<SearchCall>>,
}

impl FakeRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn when(mut self, needle: &str, records: Vec<SearchRecord>) -> Self {
        self.rules.push((needle.to_string(), records));
        self
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Sleep this long before answering.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<SearchCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Retriever for FakeRetriever {
    fn name(&self) -> &str {
        "fake"
    }

    async fn search(
        &self,
        query: &str,
        columns: &[String],
        limit: usize,
    ) -> AppResult<Vec<SearchRecord>> {
        self.calls.lock().unwrap().push(SearchCall {
            query: query.to_string(),
            columns: columns.to_vec(),
            limit,
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(ref message) = self.failure {
            return Err(AppError::Retrieval(message.clone()));
        }

        Ok(self
            .rules
            .iter()
            .find(|(needle, _)| query.contains(needle.as_str()))
            .map(|(_, records)| records.clone())
            .unwrap_or_default())
    }
}

/// Pass-through stage counting its invocations.
#[derive(Default)]
pub(crate) struct CountingStage {
    calls: AtomicUsize,
}

impl CountingStage {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl QueryTransformer for CountingStage {
    fn name(&self) -> &str {
        "counting"
    }

    async fn transform(
        &self,
        units: RetrievalUnits,
        _ctx: &StageContext,
    ) -> AppResult<RetrievalUnits> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(units)
    }
}

/// Stage that sleeps before passing its units through.
pub(crate) struct SlowStage(pub Duration);

#[async_trait::async_trait]
impl QueryTransformer for SlowStage {
    fn name(&self) -> &str {
        "slow"
    }

    async fn transform(
        &self,
        units: RetrievalUnits,
        _ctx: &StageContext,
    ) -> AppResult<RetrievalUnits> {
        tokio::time::sleep(self.0).await;
        Ok(units)
    }
}

/// Model that never answers in time.
pub(crate) struct StalledClient(pub Duration);

#[async_trait::async_trait]
impl LlmClient for StalledClient {
    fn provider_name(&self) -> &str {
        "stalled"
    }

    async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
        tokio::time::sleep(self.0).await;
        Err(AppError::Llm("no reply".to_string()))
    }

    async fn stream(&self, _request: &LlmRequest) -> AppResult<LlmStream> {
        tokio::time::sleep(self.0).await;
        Err(AppError::Llm("no reply".to_string()))
    }
}

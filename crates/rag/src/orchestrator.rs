//! RAG orchestration.
//!
//! One request runs, strictly in sequence:
//! 1. normalize the query into retrieval units
//! 2. ask the controller whether the query is basic
//! 3. run the configured transformer stages (skipped for basic queries)
//! 4. retrieve context for every unit
//! 5. generate the answer from the `rag.answer` prompt
//!
//! Failures never escape: [`Rag::complete`] returns `"Error: <message>"`
//! instead, and retrieval failures degrade to an empty context.

use crate::controller::Controller;
use crate::query::{unit_query, QueryInput, RetrievalUnits};
use crate::retriever::{create_retriever, record_text, Retriever};
use crate::runner::PromptRunner;
use crate::transform::{QueryTransformer, StageContext, TransformerRegistry};
use crate::types::{ChatReply, RagAnswer, RagStream, RagStreamChunk};
use chrono::Utc;
use ragoon_core::config::{AppConfig, RagSettings, SearchSettings, TimeoutSettings};
use ragoon_core::{AppError, AppResult};
use ragoon_llm::{create_client, ChatMessage, LlmClient};
use ragoon_prompt::{builtin, vars, PromptLibrary};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

/// Context placeholder when retrieval found nothing.
const NO_CONTEXT: &str = "None";

/// The RAG orchestrator.
///
/// Holds read-only state only and is safe to share between concurrent
/// requests. Conversation history belongs to the caller.
pub struct Rag {
    runner: Arc<PromptRunner>,
    controller: Controller,
    stages: Vec<(String, Arc<dyn QueryTransformer>)>,
    retriever: Arc<dyn Retriever>,
    search: SearchSettings,
    limit: usize,
    timeouts: TimeoutSettings,
}

/// Builder for [`Rag`].
pub struct RagBuilder {
    client: Arc<dyn LlmClient>,
    retriever: Arc<dyn Retriever>,
    prompts: Option<Arc<PromptLibrary>>,
    registry: Option<TransformerRegistry>,
    settings: RagSettings,
    search: SearchSettings,
    model: String,
    max_tokens: u32,
}

impl RagBuilder {
    pub fn new(client: Arc<dyn LlmClient>, retriever: Arc<dyn Retriever>) -> Self {
        let defaults = AppConfig::default();
        Self {
            client,
            retriever,
            prompts: None,
            registry: None,
            settings: defaults.rag,
            search: defaults.search,
            model: defaults.model,
            max_tokens: defaults.max_tokens,
        }
    }

    /// Prompt library; the built-in prompts when not set.
    pub fn prompts(mut self, prompts: Arc<PromptLibrary>) -> Self {
        self.prompts = Some(prompts);
        self
    }

    /// Transformer registry; [`TransformerRegistry::standard`] when not set.
    pub fn registry(mut self, registry: TransformerRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn settings(mut self, settings: RagSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn search(mut self, search: SearchSettings) -> Self {
        self.search = search;
        self
    }

    pub fn model(mut self, model: impl Into<String>, max_tokens: u32) -> Self {
        self.model = model.into();
        self.max_tokens = max_tokens;
        self
    }

    /// Build the orchestrator, resolving the stage list.
    ///
    /// # Errors
    /// Returns `AppError::Config` for an unknown stage key or a zero timeout.
    pub fn build(self) -> AppResult<Rag> {
        self.settings.timeouts.validate()?;

        let prompts = match self.prompts {
            Some(prompts) => prompts,
            None => Arc::new(PromptLibrary::builtin()?),
        };
        let runner = Arc::new(PromptRunner::new(
            self.client,
            prompts,
            self.model,
            self.max_tokens,
        ));

        let registry = self
            .registry
            .unwrap_or_else(|| TransformerRegistry::standard(runner.clone(), &self.settings));
        let stages = registry
            .resolve(&self.settings.stages)?
            .into_iter()
            .zip(self.settings.stages.iter().cloned())
            .map(|(stage, key)| (key, stage))
            .collect();

        Ok(Rag {
            controller: Controller::new(runner.clone(), self.settings.controller.on_unexpected),
            runner,
            stages,
            retriever: self.retriever,
            search: self.search,
            limit: self.settings.limit_to_retrieve,
            timeouts: self.settings.timeouts,
        })
    }
}

/// What a successful pipeline run produced.
struct Outcome {
    text: String,
    units: RetrievalUnits,
    contexts: Vec<String>,
    basic: bool,
}

impl Rag {
    pub fn builder(client: Arc<dyn LlmClient>, retriever: Arc<dyn Retriever>) -> RagBuilder {
        RagBuilder::new(client, retriever)
    }

    /// Build the orchestrator from application configuration: LLM client
    /// from the provider settings, retriever from the search settings,
    /// prompts with workspace overrides.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let api_key = config.resolve_api_key(&config.provider);
        let endpoint = config.resolve_endpoint(&config.provider);
        let client = create_client(&config.provider, endpoint.as_deref(), api_key.as_deref())?;
        let retriever = create_retriever(config)?;
        let prompts = Arc::new(PromptLibrary::load(&config.workspace)?);

        Self::builder(client, retriever)
            .prompts(prompts)
            .settings(config.rag.clone())
            .search(config.search.clone())
            .model(config.model.clone(), config.max_tokens)
            .build()
    }

    pub fn model(&self) -> &str {
        self.runner.model()
    }

    /// Stage keys in execution order.
    pub fn stage_keys(&self) -> Vec<&str> {
        self.stages.iter().map(|(key, _)| key.as_str()).collect()
    }

    /// Answer `prompt`, returning the text or `"Error: <message>"`.
    pub async fn complete(
        &self,
        prompt: impl Into<QueryInput>,
        history: Option<&[ChatMessage]>,
    ) -> String {
        self.answer(prompt, history).await.text
    }

    /// Answer `prompt` and return `history` with both turns appended.
    pub async fn chat(&self, prompt: &str, mut history: Vec<ChatMessage>) -> ChatReply {
        let response = self.complete(prompt, Some(&history)).await;

        history.push(ChatMessage::user(prompt));
        history.push(ChatMessage::assistant(response.clone()));

        ChatReply {
            response,
            updated_history: history,
        }
    }

    /// Answer `prompt` with the full pipeline record.
    pub async fn answer(
        &self,
        prompt: impl Into<QueryInput>,
        history: Option<&[ChatMessage]>,
    ) -> RagAnswer {
        let query = prompt.into();
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("rag_request", request_id = %request_id);

        async move {
            let question = match query.normalize() {
                Ok(normalized) => normalized.original_query,
                Err(_) => String::new(),
            };

            let result = self.run(query, history.unwrap_or_default()).await;
            let (text, units, contexts, basic, failed) = match result {
                Ok(outcome) => (
                    outcome.text,
                    outcome.units.into_inner(),
                    outcome.contexts,
                    outcome.basic,
                    false,
                ),
                Err(e) => {
                    tracing::error!("RAG request failed: {}", e);
                    (format!("Error: {}", e.message()), Vec::new(), Vec::new(), false, true)
                }
            };

            RagAnswer {
                text,
                model: self.model().to_string(),
                question,
                units,
                contexts,
                basic,
                failed,
                request_id: request_id.clone(),
                timestamp: Utc::now(),
            }
        }
        .instrument(span)
        .await
    }

    /// Simulated streaming: the answer is computed in full, then re-emitted
    /// one character at a time. A failed request yields exactly one chunk
    /// with `failed` set.
    pub async fn stream_complete(
        &self,
        prompt: impl Into<QueryInput>,
        history: Option<&[ChatMessage]>,
    ) -> RagStream {
        let answer = self.answer(prompt, history).await;

        let chunks = if answer.failed {
            vec![RagStreamChunk {
                delta: answer.text.clone(),
                text: answer.text,
                failed: true,
            }]
        } else {
            let mut text = String::new();
            answer
                .text
                .chars()
                .map(|c| {
                    text.push(c);
                    RagStreamChunk {
                        text: text.clone(),
                        delta: c.to_string(),
                        failed: false,
                    }
                })
                .collect()
        };

        Box::pin(futures::stream::iter(chunks))
    }

    async fn run(&self, query: QueryInput, history: &[ChatMessage]) -> AppResult<Outcome> {
        let normalized = query.normalize()?;
        let original_query = normalized.original_query;
        tracing::info!("RAG request: {}", original_query);

        let basic = with_timeout(
            self.timeouts.controller_secs,
            "controller",
            self.controller.is_basic_query(&original_query),
            AppError::Llm,
        )
        .await?;
        tracing::info!("Controller classified query as {}", if basic { "basic" } else { "complex" });

        let units = if basic {
            RetrievalUnits::single(original_query.clone())
        } else {
            self.transform(normalized.units, &StageContext::new(original_query.clone()))
                .await?
        };

        let contexts = self.retrieve_all(&units).await;
        let text = self.generate(&original_query, &contexts, history).await?;

        Ok(Outcome {
            text,
            units,
            contexts,
            basic,
        })
    }

    async fn transform(
        &self,
        mut units: RetrievalUnits,
        ctx: &StageContext,
    ) -> AppResult<RetrievalUnits> {
        for (key, stage) in &self.stages {
            tracing::info!("Running stage {} on {} unit(s)", key, units.len());

            units = with_timeout(
                self.timeouts.stage_secs,
                stage.name(),
                stage.transform(units, ctx),
                AppError::Transform,
            )
            .await?;

            if units.is_empty() {
                return Err(AppError::Transform(format!("stage {} produced no units", key)));
            }
            tracing::debug!("Units after {}: {:?}", key, units.queries());
        }
        Ok(units)
    }

    async fn retrieve_all(&self, units: &RetrievalUnits) -> Vec<String> {
        let mut contexts = Vec::new();
        for unit in units {
            if let Some(query) = unit_query(unit) {
                contexts.extend(self.retrieve(query).await);
            }
        }
        tracing::info!("Retrieved {} context snippet(s)", contexts.len());
        contexts
    }

    /// Snippets for one unit query. Failures degrade to no snippets.
    async fn retrieve(&self, query: &str) -> Vec<String> {
        let result = with_timeout(
            self.timeouts.retrieval_secs,
            "retrieval",
            self.retriever.search(query, &self.search.columns, self.limit),
            AppError::Retrieval,
        )
        .await;

        let records = match result {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Retrieval failed for {:?}, continuing without context: {}", query, e);
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        records
            .iter()
            .take(self.limit)
            .filter_map(|record| {
                let content = record_text(record, &self.search.content_column)?;
                if content.trim().is_empty() {
                    return None;
                }
                let source = self
                    .search
                    .source_column
                    .as_deref()
                    .and_then(|column| record_text(record, column))
                    .unwrap_or_else(|| content.clone());
                seen.insert(source).then_some(content)
            })
            .collect()
    }

    async fn generate(
        &self,
        question: &str,
        contexts: &[String],
        history: &[ChatMessage],
    ) -> AppResult<String> {
        let context = if contexts.is_empty() {
            NO_CONTEXT.to_string()
        } else {
            contexts.join("\n\n")
        };

        let request = self.runner.request(
            builtin::ANSWER,
            &vars([
                ("history", serialize_history(history)),
                ("context", context),
                ("question", question.to_string()),
            ]),
        )?;

        let response = with_timeout(
            self.timeouts.generation_secs,
            "generation",
            self.runner.client().complete(&request),
            AppError::Generation,
        )
        .await
        .map_err(|e| match e {
            AppError::Generation(_) => e,
            other => AppError::Generation(other.message()),
        })?;

        Ok(response.content)
    }
}

/// `role: content` per turn, one per line; empty without history.
fn serialize_history(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|turn| format!("{}: {}", turn.role.as_str(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Await `future`, failing with `on_timeout` after `secs` seconds.
async fn with_timeout<T, F>(
    secs: u64,
    what: &str,
    future: F,
    on_timeout: fn(String) -> AppError,
) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(Duration::from_secs(secs), future).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(format!("{} timed out after {}s", what, secs))),
    }
}

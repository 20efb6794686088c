//! Configuration management for Ragoon.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - Config file (`.ragoon/config.yaml` in the workspace, or `RAGOON_CONFIG`)
//! - Environment variables (`RAGOON_*`, `HF_TOKEN`, `SNOWFLAKE_*`)
//! - Command-line flags (applied by the CLI through [`AppConfig::with_overrides`])
//!
//! Everything here is read-only once the orchestrator is built.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the LLM factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 3] = ["huggingface", "ollama", "scripted"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .ragoon/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active LLM provider ("huggingface", "ollama", "scripted")
    pub provider: String,

    /// Model identifier passed to the provider
    pub model: String,

    /// Maximum tokens per completion
    pub max_tokens: u32,

    /// Explicit API key (RAGOON_API_KEY), wins over provider-specific env vars
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Per-provider settings from config.yaml
    pub llm: Option<LlmConfig>,

    /// RAG pipeline settings
    pub rag: RagSettings,

    /// Search service settings
    pub search: SearchSettings,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    HuggingFace {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    pub fn model(&self) -> &str {
        match self {
            Self::HuggingFace { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::HuggingFace { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint),
        }
    }
}

/// RAG pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RagSettings {
    /// Ordered transformer stage keys, resolved against the registry
    pub stages: Vec<String>,

    /// Maximum records requested from the search service per retrieval unit
    pub limit_to_retrieve: usize,

    /// Upper bound on sub-queries produced by decomposition
    pub max_subqueries: usize,

    pub hyde: HydeSettings,
    pub rerank: RerankSettings,
    pub controller: ControllerSettings,
    pub timeouts: TimeoutSettings,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            stages: vec![
                "MultiStep".to_string(),
                "Rerank".to_string(),
                "HyDE".to_string(),
            ],
            limit_to_retrieve: 4,
            max_subqueries: 5,
            hyde: HydeSettings::default(),
            rerank: RerankSettings::default(),
            controller: ControllerSettings::default(),
            timeouts: TimeoutSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HydeSettings {
    /// Append the unit query after the hypothetical passage
    pub include_original: bool,

    /// Remove a trailing element equal to the unit query
    pub trim_query_echo: bool,
}

impl Default for HydeSettings {
    fn default() -> Self {
        Self {
            include_original: true,
            trim_query_echo: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RerankSettings {
    /// Units kept after reranking
    pub top_n: usize,

    /// Units scoring below this are dropped (the best unit always survives)
    pub min_score: f32,
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self {
            top_n: 3,
            min_score: 0.0,
        }
    }
}

/// What the controller does when the model answers with neither literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerFallback {
    /// Fail the request with a protocol error
    #[default]
    Fail,
    /// Treat the query as non-basic and run the transformer chain
    Transform,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ControllerSettings {
    pub on_unexpected: ControllerFallback,
}

/// Per-stage timeouts in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeoutSettings {
    pub controller_secs: u64,
    pub stage_secs: u64,
    pub retrieval_secs: u64,
    pub generation_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            controller_secs: 30,
            stage_secs: 60,
            retrieval_secs: 15,
            generation_secs: 120,
        }
    }
}

impl TimeoutSettings {
    /// A zero deadline fails every call that awaits anything.
    pub fn validate(&self) -> AppResult<()> {
        let timeouts = [
            ("controllerSecs", self.controller_secs),
            ("stageSecs", self.stage_secs),
            ("retrievalSecs", self.retrieval_secs),
            ("generationSecs", self.generation_secs),
        ];
        match timeouts.iter().find(|(_, secs)| *secs == 0) {
            Some((name, _)) => Err(AppError::Config(format!(
                "rag.timeouts.{} must be at least 1",
                name
            ))),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    /// Snowflake Cortex Search REST service
    #[default]
    Cortex,
    /// JSON-lines file searched in-process
    Local,
}

/// Search service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchSettings {
    pub backend: SearchBackend,

    /// Account URL or identifier (e.g. "xy12345.eu-west-1")
    pub account: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub service: Option<String>,

    /// Environment variable holding the bearer token
    pub token_env: String,

    /// Columns returned by the search service
    pub columns: Vec<String>,

    /// Column whose value becomes the context snippet
    pub content_column: String,

    /// Column used to deduplicate snippets of one retrieval unit
    pub source_column: Option<String>,

    /// Records file for the local backend
    pub local_path: Option<PathBuf>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            backend: SearchBackend::Cortex,
            account: None,
            database: None,
            schema: None,
            service: None,
            token_env: "SNOWFLAKE_TOKEN".to_string(),
            columns: vec!["NAME".to_string(), "INFORMATION".to_string()],
            content_column: "INFORMATION".to_string(),
            source_column: Some("NAME".to_string()),
            local_path: None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    rag: Option<RagSettings>,
    search: Option<SearchSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "huggingface".to_string(),
            model: "meta-llama/Llama-3.2-3B-Instruct".to_string(),
            max_tokens: 256,
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            rag: RagSettings::default(),
            search: SearchSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration for the current directory (or `RAGOON_WORKSPACE`).
    ///
    /// # Example
    /// ```no_run
    /// use ragoon_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Stages: {:?}", config.rag.stages);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Load configuration for an explicit workspace and/or config file.
    ///
    /// Environment variables:
    /// - `RAGOON_WORKSPACE`, `RAGOON_CONFIG`: used when no explicit path is given
    /// - `RAGOON_PROVIDER`, `RAGOON_MODEL`, `RAGOON_API_KEY`
    /// - `SNOWFLAKE_ACCOUNT`, `SNOWFLAKE_DATABASE`, `SNOWFLAKE_SCHEMA`,
    ///   `SNOWFLAKE_CORTEX_SEARCH_SERVICE`
    /// - `RUST_LOG`, `NO_COLOR`
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("RAGOON_WORKSPACE")) {
            config.workspace = workspace;
        }
        config.config_file = config_file.or_else(|| env_path("RAGOON_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.ragoon_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        config.apply_env();

        Ok(config)
    }

    /// Environment variables override YAML config.
    fn apply_env(&mut self) {
        if let Ok(provider) = std::env::var("RAGOON_PROVIDER") {
            self.provider = provider;
        }
        if let Ok(model) = std::env::var("RAGOON_MODEL") {
            self.model = model;
        }
        if let Ok(key) = std::env::var("RAGOON_API_KEY") {
            self.api_key = Some(key);
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }
        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }

        let search = &mut self.search;
        for (var, slot) in [
            ("SNOWFLAKE_ACCOUNT", &mut search.account),
            ("SNOWFLAKE_DATABASE", &mut search.database),
            ("SNOWFLAKE_SCHEMA", &mut search.schema),
            ("SNOWFLAKE_CORTEX_SEARCH_SERVICE", &mut search.service),
        ] {
            if let Ok(value) = std::env::var(var) {
                *slot = Some(value);
            }
        }
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.merge(config_file))
    }

    fn merge(&self, config_file: ConfigFile) -> Self {
        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        if let Some(rag) = config_file.rag {
            result.rag = rag;
        }

        if let Some(search) = config_file.search {
            result.search = search;
        }

        result
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .ragoon directory.
    pub fn ragoon_dir(&self) -> PathBuf {
        self.workspace.join(".ragoon")
    }

    /// Get the configuration of a provider, if the config file declares one.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Endpoint override for a provider.
    pub fn resolve_endpoint(&self, provider: &str) -> Option<String> {
        self.get_provider_config(provider)
            .and_then(|pc| pc.endpoint())
            .map(str::to_string)
    }

    /// Resolve the API key for a provider.
    ///
    /// `RAGOON_API_KEY` wins; otherwise the provider's `apiKeyEnv` (default
    /// `HF_TOKEN` for Hugging Face) is read from the environment.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let env_var = match self.get_provider_config(provider) {
            Some(ProviderConfig::HuggingFace { api_key_env, .. }) => Some(api_key_env.as_str()),
            Some(ProviderConfig::Ollama { .. }) => None,
            None if provider == "huggingface" => Some("HF_TOKEN"),
            None => None,
        };

        env_var.and_then(|var| std::env::var(var).ok())
    }

    /// Records file of the local search backend, resolved against the workspace.
    pub fn local_search_path(&self) -> Option<PathBuf> {
        self.search.local_path.as_ref().map(|path| {
            if path.is_relative() {
                self.workspace.join(path)
            } else {
                path.clone()
            }
        })
    }

    /// Resolve the search service bearer token.
    pub fn resolve_search_token(&self) -> Option<String> {
        std::env::var(&self.search.token_env).ok()
    }

    /// Validate configuration before building the pipeline.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.provider == "huggingface" && self.resolve_api_key(&self.provider).is_none() {
            return Err(AppError::Config(
                "Hugging Face provider requires an API key (HF_TOKEN or RAGOON_API_KEY)"
                    .to_string(),
            ));
        }

        let rag = &self.rag;
        if rag.limit_to_retrieve == 0 {
            return Err(AppError::Config("limitToRetrieve must be at least 1".to_string()));
        }
        if rag.max_subqueries == 0 {
            return Err(AppError::Config("maxSubqueries must be at least 1".to_string()));
        }
        if rag.rerank.top_n == 0 {
            return Err(AppError::Config("rerank.topN must be at least 1".to_string()));
        }
        rag.timeouts.validate()?;
        // Unknown keys are caught when the registry resolves the stage list
        if rag.stages.iter().any(|stage| stage.trim().is_empty()) {
            return Err(AppError::Config("rag.stages contains a blank entry".to_string()));
        }

        self.validate_search()
    }

    fn validate_search(&self) -> AppResult<()> {
        let search = &self.search;

        if search.columns.is_empty() {
            return Err(AppError::Config("search.columns cannot be empty".to_string()));
        }
        if !search.columns.contains(&search.content_column) {
            return Err(AppError::Config(format!(
                "search.contentColumn '{}' is not one of the searchable columns",
                search.content_column
            )));
        }

        match search.backend {
            SearchBackend::Cortex => {
                let missing: Vec<&str> = [
                    ("SNOWFLAKE_ACCOUNT", &search.account),
                    ("SNOWFLAKE_DATABASE", &search.database),
                    ("SNOWFLAKE_SCHEMA", &search.schema),
                    ("SNOWFLAKE_CORTEX_SEARCH_SERVICE", &search.service),
                ]
                .into_iter()
                .filter(|(_, value)| value.is_none())
                .map(|(name, _)| name)
                .collect();

                if !missing.is_empty() {
                    return Err(AppError::Config(format!(
                        "Cortex search is missing settings: {}",
                        missing.join(", ")
                    )));
                }
                if self.resolve_search_token().is_none() {
                    return Err(AppError::Config(format!(
                        "Search token not found in environment variable: {}",
                        search.token_env
                    )));
                }
            }
            SearchBackend::Local => match self.local_search_path() {
                Some(ref path) if path.exists() => {}
                Some(ref path) => {
                    return Err(AppError::Config(format!(
                        "Local search records not found: {:?}",
                        path
                    )));
                }
                None => {
                    return Err(AppError::Config(
                        "Local search backend requires search.localPath".to_string(),
                    ));
                }
            },
        }

        Ok(())
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var(var).ok().map(PathBuf::from)
}

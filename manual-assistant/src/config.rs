//! Service configuration.
//!
//! Values come from an optional `config` file (any format the `config` crate
//! understands) overlaid with `MANUAL_ASSISTANT__*` environment variables, e.g.
//! `MANUAL_ASSISTANT__ASSISTANT__API_KEY` or `MANUAL_ASSISTANT__SEARCH__TOP_K`.
//! Configuration is read once at startup and is read-only afterwards.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};

/// Complete service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    pub auth: AuthConfig,

    pub assistant: AssistantConfig,

    pub search: SearchConfig,

    #[serde(default = "default_polling")]
    pub polling: PollingConfig,

    #[serde(default)]
    pub personas: PersonasConfig,

    #[serde(default)]
    pub topic_gate: TopicGateConfig,

    /// Locale for user-facing text (`es` or `en`)
    #[serde(default = "default_locale")]
    pub locale: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Inbound authentication
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared key every protected route expects in the `api-key` header
    pub api_key: String,
}

/// Remote Assistants API (Azure OpenAI) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: String,

    pub api_key: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Deployment used when assistants have to be created at startup
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_assistant_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl AssistantConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Document search provider (Azure AI Search) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Full URL of the index `docs/search` endpoint
    pub endpoint: String,

    pub api_key: String,

    /// Number of documents requested from the provider and kept in the summary
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Count hint for extractive answers
    #[serde(default = "default_answers_count")]
    pub answers_count: u32,

    #[serde(default = "default_semantic_configuration")]
    pub semantic_configuration: String,

    #[serde(default = "default_query_language")]
    pub query_language: String,

    #[serde(default = "default_search_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Where the last normalized result list is written for diagnostics.
    /// Unset disables the snapshot.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: Option<PathBuf>,
}

impl SearchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Run polling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Run retrievals before a run is reported as stalled
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Wait between run retrievals in milliseconds
    #[serde(default = "default_interval_millis")]
    pub interval_millis: u64,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_millis)
    }
}

/// Assistant personas served by the gateway
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonasConfig {
    #[serde(default)]
    pub mechanic: PersonaConfig,

    #[serde(default)]
    pub basic: PersonaConfig,
}

/// One persona: a remote assistant plus local behaviour.
///
/// Every field is optional so a single environment variable can override
/// one setting; unset fields fall back to per-persona defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonaConfig {
    /// Existing assistant id. When unset, an assistant is created at startup.
    #[serde(default)]
    pub assistant_id: Option<String>,

    /// Name used when the assistant is created at startup
    #[serde(default)]
    pub name: Option<String>,

    /// Instructions override; the built-in prompt is used when unset
    #[serde(default)]
    pub instructions: Option<String>,

    /// Send the instructions with every run as an override (default: true)
    #[serde(default)]
    pub override_run_instructions: Option<bool>,

    /// Only forward messages that pass the topic gate (default: basic persona only)
    #[serde(default)]
    pub topic_gated: Option<bool>,
}

/// Keyword allow-list for topic-gated personas
#[derive(Debug, Clone, Deserialize)]
pub struct TopicGateConfig {
    #[serde(default = "default_topic_keywords")]
    pub keywords: Vec<String>,
}

impl Default for TopicGateConfig {
    fn default() -> Self {
        Self {
            keywords: default_topic_keywords(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the optional `config` file and environment variables
    pub fn load() -> ServiceResult<Self> {
        let config: AppConfig = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("MANUAL_ASSISTANT")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("topic_gate.keywords")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to build config: {}", e),
            })?
            .try_deserialize()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to deserialize config: {}", e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> ServiceResult<()> {
        let invalid = |message: &str| {
            Err(ServiceError::Config {
                message: message.to_string(),
            })
        };

        if self.auth.api_key.trim().is_empty() {
            return invalid("auth.api_key must not be empty");
        }
        if self.assistant.endpoint.trim().is_empty() {
            return invalid("assistant.endpoint must not be empty");
        }
        if self.search.endpoint.trim().is_empty() {
            return invalid("search.endpoint must not be empty");
        }
        if self.search.top_k == 0 {
            return invalid("search.top_k must be at least 1");
        }
        if self.polling.max_steps == 0 {
            return invalid("polling.max_steps must be at least 1");
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// ==================== Default Value Functions ====================

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_locale() -> String {
    "es".to_string()
}

fn default_api_version() -> String {
    "2024-05-01-preview".to_string()
}

fn default_assistant_timeout_secs() -> u64 {
    60
}

fn default_top_k() -> usize {
    2
}

fn default_answers_count() -> u32 {
    3
}

fn default_semantic_configuration() -> String {
    "my-semantic-config".to_string()
}

fn default_query_language() -> String {
    "en-US".to_string()
}

fn default_search_timeout_secs() -> u64 {
    30
}

fn default_snapshot_path() -> Option<PathBuf> {
    Some(PathBuf::from("output.json"))
}

fn default_polling() -> PollingConfig {
    PollingConfig {
        max_steps: default_max_steps(),
        interval_millis: default_interval_millis(),
    }
}

fn default_max_steps() -> u32 {
    10
}

fn default_interval_millis() -> u64 {
    3_000
}

fn default_topic_keywords() -> Vec<String> {
    crate::service::DEFAULT_TOPIC_KEYWORDS
        .iter()
        .map(|k| k.to_string())
        .collect()
}

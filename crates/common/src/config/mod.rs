//! Configuration management for AnswerForge services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Knowledge store configuration
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Language model configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Answer resolution thresholds and limits
    #[serde(default)]
    pub resolution: ResolutionConfig,

    /// Conversation session configuration
    #[serde(default)]
    pub sessions: SessionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KnowledgeConfig {
    /// Path to the JSON embeddings store
    #[serde(default = "default_knowledge_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_upstream_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Language model provider: openai, mock
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Chat completions endpoint
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// API key
    pub api_key: Option<String>,

    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_upstream_retries")]
    pub max_retries: u32,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolutionConfig {
    /// Number of ranked candidates kept per request
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Questions at or below this many characters merge with the previous turn
    #[serde(default = "default_short_utterance_max_chars")]
    pub short_utterance_max_chars: usize,

    /// Minimum score for a candidate to appear in a multi-match answer
    #[serde(default = "default_multi_match_min_score")]
    pub multi_match_min_score: f32,

    /// Best scores below this are low confidence
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Top-two score gaps below this are ambiguous
    #[serde(default = "default_ambiguity_gap")]
    pub ambiguity_gap: f32,

    /// Score accepted without model arbitration when the model is unavailable
    #[serde(default = "default_trust_score")]
    pub trust_score: f32,

    /// Weight of lexical token overlap blended into the cosine score
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f32,

    /// Maximum number of cached query embeddings
    #[serde(default = "default_embedding_cache_capacity")]
    pub embedding_cache_capacity: usize,

    /// Timeout applied to each external call in milliseconds
    #[serde(default = "default_stage_timeout_ms")]
    pub stage_timeout_ms: u64,

    /// Text returned whenever no answer can be given
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,

    /// Groups of words the meaning arbiter treats as equivalent
    #[serde(default = "default_synonyms")]
    pub synonyms: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Maximum number of live sessions
    #[serde(default = "default_session_capacity")]
    pub capacity: usize,

    /// Idle time after which a session is discarded
    #[serde(default = "default_session_ttl")]
    pub idle_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (global)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 60 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_knowledge_path() -> String { "data/embeddings.json".to_string() }
fn default_embedding_provider() -> String { "openai".to_string() }
fn default_embedding_model() -> String { "text-embedding-3-small".to_string() }
fn default_embedding_dimension() -> usize { 1536 }
fn default_upstream_timeout() -> u64 { 15 }
fn default_upstream_retries() -> u32 { 2 }
fn default_llm_provider() -> String { "openai".to_string() }
fn default_llm_endpoint() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_llm_model() -> String { "gpt-4o-mini".to_string() }
fn default_top_k() -> usize { 5 }
fn default_short_utterance_max_chars() -> usize { 4 }
fn default_multi_match_min_score() -> f32 { 0.08 }
fn default_min_score() -> f32 { 0.11 }
fn default_ambiguity_gap() -> f32 { 0.06 }
fn default_trust_score() -> f32 { 0.55 }
fn default_lexical_weight() -> f32 { 0.1 }
fn default_embedding_cache_capacity() -> usize { 1024 }
fn default_stage_timeout_ms() -> u64 { 8000 }
fn default_session_capacity() -> usize { 10_000 }
fn default_session_ttl() -> u64 { 1800 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_rate_limit() -> u32 { 50 }
fn default_burst() -> u32 { 100 }
fn default_enabled() -> bool { true }

fn default_fallback_message() -> String {
    "Sorry, I don't have enough information to answer that. \
     Please check the official website or contact the office directly for accurate details."
        .to_string()
}

fn default_synonyms() -> Vec<Vec<String>> {
    [
        &["fee", "fees", "cost", "price", "charges"][..],
        &["hostel", "dorm", "dormitory", "accommodation"][..],
        &["admission", "enrollment", "enrolment", "joining"][..],
        &["timing", "timings", "schedule", "hours"][..],
    ]
    .iter()
    .map(|group| group.iter().map(|w| w.to_string()).collect())
    .collect()
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__RESOLUTION__TOP_K=8
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

impl ResolutionConfig {
    /// Timeout applied to each external call
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }
}

impl SessionConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            path: default_knowledge_path(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_upstream_timeout(),
            max_retries: default_upstream_retries(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            endpoint: default_llm_endpoint(),
            api_key: None,
            model: default_llm_model(),
            timeout_secs: default_upstream_timeout(),
            max_retries: default_upstream_retries(),
            temperature: 0.0,
        }
    }
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            short_utterance_max_chars: default_short_utterance_max_chars(),
            multi_match_min_score: default_multi_match_min_score(),
            min_score: default_min_score(),
            ambiguity_gap: default_ambiguity_gap(),
            trust_score: default_trust_score(),
            lexical_weight: default_lexical_weight(),
            embedding_cache_capacity: default_embedding_cache_capacity(),
            stage_timeout_ms: default_stage_timeout_ms(),
            fallback_message: default_fallback_message(),
            synonyms: default_synonyms(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: default_session_capacity(),
            idle_ttl_secs: default_session_ttl(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            knowledge: KnowledgeConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            resolution: ResolutionConfig::default(),
            sessions: SessionConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

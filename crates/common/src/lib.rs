//! AnswerForge Common Library
//!
//! Shared code for the AnswerForge services including:
//! - Knowledge base loading and hot reload
//! - Embedding and language model client abstractions
//! - Answer resolution pipeline
//! - Intent routing for panoramas and projects
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod cache;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod knowledge;
pub mod llm;
pub mod metrics;
pub mod refine;
pub mod resilience;
pub mod resolution;
pub mod routing;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use knowledge::KnowledgeBase;
pub use resolution::{AnswerResolver, ConversationMemory, Resolution, Via};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Answer Resolution Pipeline
//!
//! Resolves a free-form question against the knowledge base:
//! - Conversation memory merge for short follow-ups
//! - Spelling correction and meaning normalization
//! - Cached query embedding
//! - Semantic ranking with a lexical overlap boost
//! - Multi-match answers for single-word queries
//! - Confidence arbitration with language-model tie-breaking
//! - Tagged fallbacks when no answer can be trusted

mod arbiter;
mod fallback;
mod llm_arbiter;
mod matcher;
mod memory;
mod observer;
mod pipeline;

pub use arbiter::{Assessment, ConfidenceArbiter, Settlement};
pub use fallback::FallbackGenerator;
pub use llm_arbiter::{parse_verdict, LlmArbiter, MeaningVerdict};
pub use matcher::{cosine_similarity, MatchCandidate, SemanticMatcher};
pub use memory::ConversationMemory;
pub use observer::{ResolutionObserver, Stage, StageOutcome, TracingObserver};
pub use pipeline::AnswerResolver;

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an answer was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Via {
    /// Several answers for an ambiguous single-word query
    MultiMatch,
    /// Confident semantic match
    Semantic,
    /// Match confirmed by the language model
    LlmValidated,
    /// Strong score accepted while the language model was unavailable
    SemanticLlmUnavailable,
    NoVector,
    NoMatch,
    LlmReject,
    LlmUnavailable,
    Error,
}

impl Via {
    pub fn as_str(&self) -> &'static str {
        match self {
            Via::MultiMatch => "multi-match",
            Via::Semantic => "semantic",
            Via::LlmValidated => "llm-validated",
            Via::SemanticLlmUnavailable => "semantic-llm-unavailable",
            Via::NoVector => "no-vector",
            Via::NoMatch => "no-match",
            Via::LlmReject => "llm-reject",
            Via::LlmUnavailable => "llm-unavailable",
            Via::Error => "error",
        }
    }

    /// Whether this tag marks a fallback answer
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            Via::NoVector | Via::NoMatch | Via::LlmReject | Via::LlmUnavailable | Via::Error
        )
    }
}

impl fmt::Display for Via {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the fallback message was returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The query could not be embedded
    NoVector,
    /// The knowledge base produced no candidate
    NoMatch,
    /// The language model said the best candidate means something else
    LlmReject,
    /// Arbitration was needed but the language model could not be trusted
    LlmUnavailable,
    /// Unexpected internal fault
    Error,
}

impl From<FallbackReason> for Via {
    fn from(reason: FallbackReason) -> Self {
        match reason {
            FallbackReason::NoVector => Via::NoVector,
            FallbackReason::NoMatch => Via::NoMatch,
            FallbackReason::LlmReject => Via::LlmReject,
            FallbackReason::LlmUnavailable => Via::LlmUnavailable,
            FallbackReason::Error => Via::Error,
        }
    }
}

/// Final answer for one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub answer: String,
    pub via: Via,
}

impl Resolution {
    pub fn new(answer: impl Into<String>, via: Via) -> Self {
        Self {
            answer: answer.into(),
            via,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_via_serialization_matches_tags() {
        for via in [
            Via::MultiMatch,
            Via::Semantic,
            Via::LlmValidated,
            Via::SemanticLlmUnavailable,
            Via::NoVector,
            Via::NoMatch,
            Via::LlmReject,
            Via::LlmUnavailable,
            Via::Error,
        ] {
            let json = serde_json::to_value(via).unwrap();
            assert_eq!(json, serde_json::Value::String(via.as_str().to_string()));
        }
    }

    #[test]
    fn test_fallback_tags() {
        assert!(Via::from(FallbackReason::LlmReject).is_fallback());
        assert!(!Via::SemanticLlmUnavailable.is_fallback());
        assert_eq!(Via::from(FallbackReason::Error).to_string(), "error");
    }
}

//! Query refinement: spelling correction and meaning normalization

use crate::errors::Result;
use crate::llm::{Completion, LanguageModel};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for the two text refinement stages run before embedding
#[async_trait]
pub trait QueryRefiner: Send + Sync {
    /// Fix spelling mistakes while keeping the wording
    async fn correct_spelling(&self, text: &str) -> Result<String>;

    /// Rewrite text into a short canonical form of its meaning
    async fn normalize_to_meaning(&self, text: &str) -> Result<String>;
}

const SPELLING_SYSTEM: &str = "You correct spelling mistakes in short user questions. \
Reply with the corrected question only. Do not answer it, rephrase it, or add punctuation.";

const NORMALIZE_SYSTEM: &str = "You rewrite user questions into a canonical search form. \
Use lowercase, drop greetings, filler words and punctuation, keep the key nouns and verbs. \
Reply with the rewritten text only. Reply with nothing if the text carries no question.";

/// Refiner backed by a language model
pub struct LlmQueryRefiner {
    model: Arc<dyn LanguageModel>,
}

impl LlmQueryRefiner {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

/// Strip whitespace and wrapping quotes models like to add
fn clean_reply(reply: &str) -> String {
    reply
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim()
        .to_string()
}

#[async_trait]
impl QueryRefiner for LlmQueryRefiner {
    async fn correct_spelling(&self, text: &str) -> Result<String> {
        match self.model.complete(SPELLING_SYSTEM, text).await? {
            Completion::Text(reply) => {
                let corrected = clean_reply(&reply);
                if corrected.is_empty() {
                    Ok(text.to_string())
                } else {
                    Ok(corrected)
                }
            }
            Completion::Degraded { reason } => {
                tracing::debug!(%reason, "Spelling correction degraded, keeping input");
                Ok(text.to_string())
            }
        }
    }

    async fn normalize_to_meaning(&self, text: &str) -> Result<String> {
        match self.model.complete(NORMALIZE_SYSTEM, text).await? {
            Completion::Text(reply) => Ok(clean_reply(&reply)),
            Completion::Degraded { reason } => {
                tracing::debug!(%reason, "Meaning normalization degraded, keeping input");
                Ok(text.to_string())
            }
        }
    }
}

/// Refiner that leaves text untouched apart from case and spacing
pub struct PassthroughRefiner;

#[async_trait]
impl QueryRefiner for PassthroughRefiner {
    async fn correct_spelling(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }

    async fn normalize_to_meaning(&self, text: &str) -> Result<String> {
        Ok(text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::OfflineLanguageModel;

    struct FixedModel(&'static str);

    #[async_trait]
    impl LanguageModel for FixedModel {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<Completion> {
            Ok(Completion::Text(self.0.to_string()))
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_degraded_model_keeps_input() {
        let refiner = LlmQueryRefiner::new(Arc::new(OfflineLanguageModel));
        assert_eq!(refiner.correct_spelling("wat is speling").await.unwrap(), "wat is speling");
        assert_eq!(refiner.normalize_to_meaning("Hostel Fees?").await.unwrap(), "Hostel Fees?");
    }

    #[tokio::test]
    async fn test_reply_is_cleaned() {
        let refiner = LlmQueryRefiner::new(Arc::new(FixedModel("  \"what is spelling\"\n")));
        assert_eq!(refiner.correct_spelling("wat is speling").await.unwrap(), "what is spelling");
    }

    #[tokio::test]
    async fn test_empty_reply() {
        let refiner = LlmQueryRefiner::new(Arc::new(FixedModel("   ")));
        // An empty correction keeps the input; an empty normalization is meaningful.
        assert_eq!(refiner.correct_spelling("hmm").await.unwrap(), "hmm");
        assert_eq!(refiner.normalize_to_meaning("hmm").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_passthrough_refiner() {
        let refiner = PassthroughRefiner;
        assert_eq!(refiner.normalize_to_meaning("  School   FEES ").await.unwrap(), "school fees");
    }
}

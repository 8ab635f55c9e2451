//! LLM arbiter: asks a language model whether two questions mean the same thing

use crate::errors::Result;
use crate::llm::{Completion, LanguageModel};
use std::sync::Arc;

/// Tri-state arbitration result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeaningVerdict {
    Match,
    NoMatch,
    /// The model could not be trusted this turn
    Unknown,
}

impl MeaningVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeaningVerdict::Match => "match",
            MeaningVerdict::NoMatch => "no_match",
            MeaningVerdict::Unknown => "unknown",
        }
    }
}

/// Map a model reply to a verdict; only a bare yes or no counts
pub fn parse_verdict(reply: &str) -> MeaningVerdict {
    let reply = reply.trim();
    if reply.eq_ignore_ascii_case("yes") {
        MeaningVerdict::Match
    } else if reply.eq_ignore_ascii_case("no") {
        MeaningVerdict::NoMatch
    } else {
        MeaningVerdict::Unknown
    }
}

const SYSTEM_PROMPT: &str = "You compare two questions and decide whether they ask for the same thing. \
Ignore grammar, word order, spelling mistakes and letter case. \
Reply with exactly one word: yes or no.";

pub struct LlmArbiter {
    model: Arc<dyn LanguageModel>,
    synonyms: Vec<Vec<String>>,
}

impl LlmArbiter {
    pub fn new(model: Arc<dyn LanguageModel>, synonyms: Vec<Vec<String>>) -> Self {
        Self { model, synonyms }
    }

    fn build_prompt(&self, query: &str, candidate_question: &str) -> String {
        let mut prompt = String::from("Do these two questions mean the same thing?\n");

        let groups: Vec<String> = self
            .synonyms
            .iter()
            .filter(|group| group.len() > 1)
            .map(|group| group.join(" = "))
            .collect();
        if !groups.is_empty() {
            prompt.push_str("Treat these words as equivalent:\n");
            for group in groups {
                prompt.push_str("- ");
                prompt.push_str(&group);
                prompt.push('\n');
            }
        }

        prompt.push_str(&format!(
            "\nQuestion 1: {}\nQuestion 2: {}\n\nAnswer yes or no.",
            query, candidate_question
        ));
        prompt
    }

    /// Compare `query` with `candidate_question`
    ///
    /// A degraded completion or a reply other than yes/no is `Unknown`.
    /// Transport errors are returned; callers treat them as `Unknown`.
    pub async fn meaning_match(&self, query: &str, candidate_question: &str) -> Result<MeaningVerdict> {
        let prompt = self.build_prompt(query, candidate_question);

        match self.model.complete(SYSTEM_PROMPT, &prompt).await? {
            Completion::Text(reply) => {
                let verdict = parse_verdict(&reply);
                if verdict == MeaningVerdict::Unknown {
                    tracing::debug!(reply = %reply, "Unparseable arbitration reply");
                }
                Ok(verdict)
            }
            Completion::Degraded { reason } => {
                tracing::debug!(%reason, "Arbitration completion degraded");
                Ok(MeaningVerdict::Unknown)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingModel {
        reply: Result<Completion>,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingModel {
        fn new(reply: Result<Completion>) -> Self {
            Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        async fn complete(&self, _system: &str, prompt: &str) -> Result<Completion> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(c) => Ok(c.clone()),
                Err(e) => Err(AppError::LanguageModel { message: e.to_string() }),
            }
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    #[test]
    fn test_parse_verdict() {
        assert_eq!(parse_verdict("yes"), MeaningVerdict::Match);
        assert_eq!(parse_verdict("  YES \n"), MeaningVerdict::Match);
        assert_eq!(parse_verdict("No"), MeaningVerdict::NoMatch);
        assert_eq!(parse_verdict("yes, they match"), MeaningVerdict::Unknown);
        assert_eq!(parse_verdict("Sorry, I don't have enough information."), MeaningVerdict::Unknown);
        assert_eq!(parse_verdict(""), MeaningVerdict::Unknown);
    }

    #[tokio::test]
    async fn test_prompt_includes_questions_and_synonyms() {
        let model = Arc::new(RecordingModel::new(Ok(Completion::Text("yes".into()))));
        let arbiter = LlmArbiter::new(
            model.clone(),
            vec![vec!["fee".into(), "cost".into()], vec!["lonely".into()]],
        );

        let verdict = arbiter.meaning_match("hostel cost", "hostel fee").await.unwrap();
        assert_eq!(verdict, MeaningVerdict::Match);

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("Question 1: hostel cost"));
        assert!(prompts[0].contains("Question 2: hostel fee"));
        assert!(prompts[0].contains("fee = cost"));
        assert!(!prompts[0].contains("lonely"));
    }

    #[tokio::test]
    async fn test_degraded_is_unknown() {
        let model = Arc::new(RecordingModel::new(Ok(Completion::Degraded {
            reason: "rate limited".into(),
        })));
        let arbiter = LlmArbiter::new(model, Vec::new());
        assert_eq!(arbiter.meaning_match("a", "b").await.unwrap(), MeaningVerdict::Unknown);
    }

    #[tokio::test]
    async fn test_transport_error_is_returned() {
        let model = Arc::new(RecordingModel::new(Err(AppError::LanguageModel {
            message: "connection reset".into(),
        })));
        let arbiter = LlmArbiter::new(model, Vec::new());
        assert!(arbiter.meaning_match("a", "b").await.is_err());
    }
}

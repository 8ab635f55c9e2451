//! Confidence arbiter: accept, escalate, or fall back from the score distribution

use super::llm_arbiter::MeaningVerdict;
use super::{FallbackReason, Via};
use crate::config::ResolutionConfig;

/// Slack for the top-two gap, which is a difference of two rounded scores
const GAP_TOLERANCE: f32 = 1e-7;

/// Outcome of the score check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    /// Best candidate is confident and clearly ahead
    Accept,
    /// The language model has to confirm the best candidate
    Escalate { low: bool, ambiguous: bool },
}

/// Outcome after language model arbitration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Accept(Via),
    Fallback(FallbackReason),
}

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceArbiter {
    min_score: f32,
    ambiguity_gap: f32,
    trust_score: f32,
}

impl ConfidenceArbiter {
    pub fn new(min_score: f32, ambiguity_gap: f32, trust_score: f32) -> Self {
        Self {
            min_score,
            ambiguity_gap,
            trust_score,
        }
    }

    pub fn from_config(config: &ResolutionConfig) -> Self {
        Self::new(config.min_score, config.ambiguity_gap, config.trust_score)
    }

    /// Best score is below the absolute minimum
    pub fn is_low(&self, best: f32) -> bool {
        best < self.min_score
    }

    /// Best and second scores are too close to tell apart
    pub fn is_ambiguous(&self, best: f32, second: Option<f32>) -> bool {
        match second {
            Some(second) => (best - second).abs() < self.ambiguity_gap - GAP_TOLERANCE,
            None => false,
        }
    }

    pub fn assess(&self, best: f32, second: Option<f32>) -> Assessment {
        let low = self.is_low(best);
        let ambiguous = self.is_ambiguous(best, second);

        if low || ambiguous {
            Assessment::Escalate { low, ambiguous }
        } else {
            Assessment::Accept
        }
    }

    /// Apply the arbitration verdict for an escalated candidate
    pub fn settle(&self, verdict: MeaningVerdict, low: bool, best: f32) -> Settlement {
        match verdict {
            MeaningVerdict::Match => Settlement::Accept(Via::LlmValidated),
            MeaningVerdict::NoMatch => Settlement::Fallback(FallbackReason::LlmReject),
            MeaningVerdict::Unknown if !low && best >= self.trust_score => {
                Settlement::Accept(Via::SemanticLlmUnavailable)
            }
            MeaningVerdict::Unknown => Settlement::Fallback(FallbackReason::LlmUnavailable),
        }
    }
}

impl Default for ConfidenceArbiter {
    fn default() -> Self {
        Self::from_config(&ResolutionConfig::default())
    }
}

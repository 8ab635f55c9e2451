//! Observability hooks for the resolution pipeline

use super::llm_arbiter::MeaningVerdict;
use super::matcher::MatchCandidate;
use super::Resolution;
use crate::metrics;
use std::time::Duration;
use tracing::{debug, info, warn};

/// External pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SpellCorrect,
    Normalize,
    Embed,
    Arbitrate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::SpellCorrect => "spell_correct",
            Stage::Normalize => "normalize",
            Stage::Embed => "embed",
            Stage::Arbitrate => "arbitrate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    Failed,
    TimedOut,
}

/// Event sink injected into the resolver
///
/// All hooks default to no-ops.
pub trait ResolutionObserver: Send + Sync {
    fn on_stage(&self, _stage: Stage, _elapsed: Duration, _outcome: StageOutcome) {}

    fn on_normalized(&self, _effective: &str, _normalized: &str) {}

    fn on_cache(&self, _hit: bool) {}

    fn on_ranked(&self, _candidates: &[MatchCandidate<'_>]) {}

    fn on_verdict(&self, _verdict: MeaningVerdict) {}

    fn on_outcome(&self, _resolution: &Resolution, _elapsed: Duration) {}
}

/// Observer that writes tracing events and Prometheus metrics
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ResolutionObserver for TracingObserver {
    fn on_stage(&self, stage: Stage, elapsed: Duration, outcome: StageOutcome) {
        let success = outcome == StageOutcome::Completed;
        metrics::record_stage(elapsed.as_secs_f64(), stage.as_str(), success);

        if success {
            debug!(stage = stage.as_str(), latency_ms = elapsed.as_millis() as u64, "Stage completed");
        } else {
            warn!(
                stage = stage.as_str(),
                outcome = ?outcome,
                latency_ms = elapsed.as_millis() as u64,
                "Stage degraded"
            );
        }
    }

    fn on_normalized(&self, effective: &str, normalized: &str) {
        debug!(effective, normalized, "Query normalized");
    }

    fn on_cache(&self, hit: bool) {
        debug!(hit, "Embedding lookup");
    }

    fn on_ranked(&self, candidates: &[MatchCandidate<'_>]) {
        let best = candidates.first().map(|c| c.score);
        let second = candidates.get(1).map(|c| c.score);
        debug!(
            candidates = candidates.len(),
            best_score = ?best,
            second_score = ?second,
            "Candidates ranked"
        );
    }

    fn on_verdict(&self, verdict: MeaningVerdict) {
        metrics::record_verdict(verdict.as_str());
        debug!(verdict = verdict.as_str(), "Arbitration verdict");
    }

    fn on_outcome(&self, resolution: &Resolution, elapsed: Duration) {
        metrics::record_resolution(elapsed.as_secs_f64(), resolution.via.as_str());
        info!(
            via = resolution.via.as_str(),
            latency_ms = elapsed.as_millis() as u64,
            "Question resolved"
        );
    }
}

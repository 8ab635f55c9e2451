//! Answer resolver: runs the full pipeline for one question

use super::arbiter::{Assessment, ConfidenceArbiter, Settlement};
use super::fallback::FallbackGenerator;
use super::llm_arbiter::{LlmArbiter, MeaningVerdict};
use super::matcher::{MatchCandidate, SemanticMatcher};
use super::memory::ConversationMemory;
use super::observer::{ResolutionObserver, Stage, StageOutcome, TracingObserver};
use super::{FallbackReason, Resolution, Via};
use crate::cache::EmbeddingCache;
use crate::config::ResolutionConfig;
use crate::embeddings::Embedder;
use crate::errors::Result;
use crate::knowledge::KnowledgeBase;
use crate::llm::LanguageModel;
use crate::refine::QueryRefiner;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

const BULLET: &str = "• ";

/// Resolves questions against a knowledge base
///
/// Never fails: every collaborator error, timeout or internal fault ends in
/// a tagged fallback answer.
pub struct AnswerResolver {
    knowledge: Arc<KnowledgeBase>,
    cache: Arc<EmbeddingCache>,
    embedder: Arc<dyn Embedder>,
    refiner: Arc<dyn QueryRefiner>,
    llm_arbiter: LlmArbiter,
    matcher: SemanticMatcher,
    confidence: ConfidenceArbiter,
    fallback: FallbackGenerator,
    observer: Arc<dyn ResolutionObserver>,
    top_k: usize,
    short_utterance_max_chars: usize,
    multi_match_min_score: f32,
    stage_timeout: Duration,
}

impl AnswerResolver {
    pub fn new(
        config: &ResolutionConfig,
        knowledge: Arc<KnowledgeBase>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
        refiner: Arc<dyn QueryRefiner>,
    ) -> Self {
        Self {
            knowledge,
            cache: Arc::new(EmbeddingCache::new(config.embedding_cache_capacity)),
            embedder,
            refiner,
            llm_arbiter: LlmArbiter::new(model, config.synonyms.clone()),
            matcher: SemanticMatcher::new(config.lexical_weight),
            confidence: ConfidenceArbiter::from_config(config),
            fallback: FallbackGenerator::new(config.fallback_message.clone()),
            observer: Arc::new(TracingObserver),
            top_k: config.top_k,
            short_utterance_max_chars: config.short_utterance_max_chars,
            multi_match_min_score: config.multi_match_min_score,
            stage_timeout: config.stage_timeout(),
        }
    }

    /// Replace the default tracing observer
    pub fn with_observer(mut self, observer: Arc<dyn ResolutionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }

    /// Resolve `question` within the conversation held by `memory`
    ///
    /// `memory` is updated with `question` before anything else runs.
    pub async fn resolve(&self, question: &str, memory: &mut ConversationMemory) -> Resolution {
        let started = Instant::now();
        let effective = memory.merge_and_record(question, self.short_utterance_max_chars);

        let resolution = match AssertUnwindSafe(self.resolve_effective(&effective))
            .catch_unwind()
            .await
        {
            Ok(resolution) => resolution,
            Err(_) => {
                error!("Answer resolution panicked");
                self.fallback.generate(FallbackReason::Error)
            }
        };

        self.observer.on_outcome(&resolution, started.elapsed());
        resolution
    }

    async fn resolve_effective(&self, effective: &str) -> Resolution {
        let normalized = self.normalize(effective).await;
        self.observer.on_normalized(effective, &normalized);

        if normalized.is_empty() {
            return self.fallback.generate(FallbackReason::NoVector);
        }

        let vector = match self
            .bounded(
                Stage::Embed,
                self.cache.get_or_compute(&normalized, self.embedder.as_ref()),
            )
            .await
        {
            Some(cached) => {
                self.observer.on_cache(cached.hit);
                cached.vector
            }
            None => Arc::new(Vec::new()),
        };

        if vector.is_empty() {
            return self.fallback.generate(FallbackReason::NoVector);
        }

        let entries = self.knowledge.snapshot();
        let ranked = self.matcher.rank(&vector, &entries, &normalized, self.top_k);
        self.observer.on_ranked(&ranked);

        if normalized.split_whitespace().count() == 1 {
            if let Some(answer) = self.multi_match(&ranked) {
                return Resolution::new(answer, Via::MultiMatch);
            }
        }

        let Some(best) = ranked.first() else {
            return self.fallback.generate(FallbackReason::NoMatch);
        };
        let second = ranked.get(1).map(|c| c.score);

        match self.confidence.assess(best.score, second) {
            Assessment::Accept => Resolution::new(best.entry.answer.clone(), Via::Semantic),
            Assessment::Escalate { low, .. } => {
                let verdict = self
                    .bounded(
                        Stage::Arbitrate,
                        self.llm_arbiter.meaning_match(&normalized, &best.entry.question),
                    )
                    .await
                    .unwrap_or(MeaningVerdict::Unknown);
                self.observer.on_verdict(verdict);

                match self.confidence.settle(verdict, low, best.score) {
                    Settlement::Accept(via) => Resolution::new(best.entry.answer.clone(), via),
                    Settlement::Fallback(reason) => self.fallback.generate(reason),
                }
            }
        }
    }

    /// Spell-correct then meaning-normalize; each stage degrades to its input
    async fn normalize(&self, effective: &str) -> String {
        let spelled = self
            .bounded(Stage::SpellCorrect, self.refiner.correct_spelling(effective))
            .await
            .unwrap_or_else(|| effective.to_string());

        let normalized = self
            .bounded(Stage::Normalize, self.refiner.normalize_to_meaning(&spelled))
            .await
            .unwrap_or(spelled);

        normalized.trim().to_string()
    }

    /// Bulleted answers of every candidate at or above the multi-match score
    fn multi_match(&self, ranked: &[MatchCandidate<'_>]) -> Option<String> {
        let joined = ranked
            .iter()
            .filter(|c| c.score >= self.multi_match_min_score)
            .map(|c| format!("{}{}", BULLET, c.entry.answer))
            .collect::<Vec<_>>()
            .join("\n\n");

        if joined.trim().is_empty() {
            None
        } else {
            Some(joined)
        }
    }

    /// Run one external call under the stage timeout; failures become `None`
    async fn bounded<T, F>(&self, stage: Stage, call: F) -> Option<T>
    where
        F: Future<Output = Result<T>>,
    {
        let started = Instant::now();

        let (value, outcome) = match tokio::time::timeout(self.stage_timeout, call).await {
            Ok(Ok(value)) => (Some(value), StageOutcome::Completed),
            Ok(Err(e)) => {
                debug!(stage = stage.as_str(), error = %e, "Stage error");
                (None, StageOutcome::Failed)
            }
            Err(_) => (None, StageOutcome::TimedOut),
        };

        self.observer.on_stage(stage, started.elapsed(), outcome);
        value
    }
}

//! Semantic matcher: ranks knowledge entries against a query vector

use crate::knowledge::KnowledgeEntry;
use std::collections::HashSet;

/// A knowledge entry scored for one request
///
/// Scores are only comparable with candidates from the same `rank` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchCandidate<'a> {
    pub entry: &'a KnowledgeEntry,
    pub score: f32,
}

/// Cosine similarity; 0 for mismatched dimensions or zero-norm vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

fn token_set(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Fraction of distinct query tokens that also appear in `question`
fn token_overlap(query_tokens: &HashSet<String>, question: &str) -> f32 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let question_tokens = token_set(question);
    let shared = query_tokens
        .iter()
        .filter(|t| question_tokens.contains(*t))
        .count();
    shared as f32 / query_tokens.len() as f32
}

/// Blends cosine similarity with a lexical overlap boost
#[derive(Debug, Clone, Copy)]
pub struct SemanticMatcher {
    lexical_weight: f32,
}

impl SemanticMatcher {
    pub fn new(lexical_weight: f32) -> Self {
        Self {
            lexical_weight: lexical_weight.max(0.0),
        }
    }

    /// Score of one entry, clamped to `[0, 1]`
    pub fn score(
        &self,
        query_vector: &[f32],
        query_tokens: &HashSet<String>,
        entry: &KnowledgeEntry,
    ) -> f32 {
        let cosine = cosine_similarity(query_vector, &entry.embedding);
        let boost = self.lexical_weight * token_overlap(query_tokens, &entry.question);
        let score = cosine + boost;
        if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        }
    }

    /// Top `k` entries by descending score
    ///
    /// Ties keep knowledge-store order, so identical input ranks identically.
    pub fn rank<'a>(
        &self,
        query_vector: &[f32],
        entries: &'a [KnowledgeEntry],
        normalized_text: &str,
        k: usize,
    ) -> Vec<MatchCandidate<'a>> {
        if entries.is_empty() || k == 0 {
            return Vec::new();
        }

        let query_tokens = token_set(normalized_text);

        let mut candidates: Vec<MatchCandidate<'a>> = entries
            .iter()
            .map(|entry| MatchCandidate {
                entry,
                score: self.score(query_vector, &query_tokens, entry),
            })
            .collect();

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(k);
        candidates
    }
}

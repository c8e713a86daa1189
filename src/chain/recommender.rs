//! Chain recommender
//!
//! Ranks chains against free text and usage history. Scoring:
//! - +3 per trigger phrase found in the lower-cased text
//! - +2 when the text carries a keyword of the chain's category
//! - +0.5 per usage record mentioning the chain's name or id
//!
//! A chain must match a trigger phrase or its category to be considered at
//! all; usage only reorders matches. Chains scoring 1 or less are dropped.
//! Ties fall back to usage count, then catalog order.

use crate::domain::{ToolChain, UsageRecord};

const TRIGGER_WEIGHT: f64 = 3.0;
const CATEGORY_WEIGHT: f64 = 2.0;
const USAGE_WEIGHT: f64 = 0.5;
const MIN_SCORE: f64 = 1.0;

/// A chain with the score that ranked it
#[derive(Debug, Clone)]
pub struct ScoredChain<'a> {
    pub chain: &'a ToolChain,
    pub score: f64,
    pub usage_count: usize,
    pub trigger_hits: usize,
    pub category_hit: bool,
}

impl ScoredChain<'_> {
    fn matched(&self) -> bool {
        self.trigger_hits > 0 || self.category_hit
    }
}

#[derive(Debug, Clone)]
pub struct ChainRecommender {
    limit: usize,
}

impl ChainRecommender {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Chains worth running for `text`, best first
    pub fn recommend<'a>(
        &self,
        text: &str,
        chains: &'a [ToolChain],
        history: &[UsageRecord],
    ) -> Vec<ScoredChain<'a>> {
        let text = text.to_lowercase();

        let mut scored: Vec<ScoredChain<'a>> = chains
            .iter()
            .map(|chain| score(chain, &text, history))
            .filter(|s| s.matched() && s.score > MIN_SCORE)
            .collect();

        // sort_by is stable, so equal keys keep catalog order
        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.usage_count.cmp(&a.usage_count))
        });
        scored.truncate(self.limit);

        tracing::debug!(
            candidates = scored.len(),
            top = scored.first().map(|s| s.chain.id.as_str()).unwrap_or("-"),
            "Ranked chains"
        );
        scored
    }
}

impl Default for ChainRecommender {
    fn default() -> Self {
        Self::new(5)
    }
}

fn score<'a>(chain: &'a ToolChain, text: &str, history: &[UsageRecord]) -> ScoredChain<'a> {
    let trigger_hits = chain
        .trigger_phrases
        .iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty() && text.contains(p.as_str()))
        .count();

    let category_hit = chain
        .category
        .keywords()
        .iter()
        .any(|k| text.contains(k));

    let usage_count = history
        .iter()
        .filter(|r| r.mentions(&chain.id) || r.mentions(&chain.name))
        .count();

    let mut score = TRIGGER_WEIGHT * trigger_hits as f64 + USAGE_WEIGHT * usage_count as f64;
    if category_hit {
        score += CATEGORY_WEIGHT;
    }

    ScoredChain {
        chain,
        score,
        usage_count,
        trigger_hits,
        category_hit,
    }
}

//! Agent selector
//!
//! Scores every registered agent against a task:
//! `40 * match_fraction + 30 * confidence + elite_bonus + 10 * alignment`
//! and keeps the top `min(max_agents, ceil(complexity / 3))`.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::domain::{Capability, CapabilityKind, PreferenceSignal};

const MATCH_WEIGHT: f64 = 40.0;
const CONFIDENCE_WEIGHT: f64 = 30.0;
const ELITE_BONUS: f64 = 20.0;
const PREFERENCE_WEIGHT: f64 = 10.0;
/// Complexity above which elite agents get the bonus
const ELITE_COMPLEXITY: u8 = 7;

pub const MIN_COMPLEXITY: u8 = 1;
pub const MAX_COMPLEXITY: u8 = 10;

/// Score breakdown for one agent
#[derive(Debug, Clone, Serialize)]
pub struct AgentScore {
    pub capability_id: String,
    pub score: f64,
    pub match_fraction: f64,
    pub elite_bonus: f64,
    pub alignment: f64,
}

/// Shortlist plus the reasoning that produced it
#[derive(Debug, Clone, Serialize)]
pub struct AgentSelection {
    pub agents: Vec<String>,
    /// Scores of every candidate, best first
    pub scores: Vec<AgentScore>,
    pub rationale: String,
}

#[derive(Debug, Clone)]
pub struct AgentSelector {
    max_agents: usize,
}

impl AgentSelector {
    pub fn new(max_agents: usize) -> Self {
        Self { max_agents }
    }

    /// Shortlist size for a complexity level
    pub fn shortlist_size(&self, complexity: u8) -> usize {
        let complexity = clamp_complexity(complexity) as usize;
        self.max_agents.min(complexity.div_ceil(3))
    }

    /// Rank the agents in `catalog` and keep the shortlist.
    ///
    /// Non-agent capabilities are ignored. Ties keep catalog order.
    pub async fn select(
        &self,
        description: &str,
        complexity: u8,
        required: &BTreeSet<String>,
        catalog: &[Capability],
        preferences: &dyn PreferenceSignal,
    ) -> AgentSelection {
        let complexity = clamp_complexity(complexity);
        let required: BTreeSet<String> = required.iter().map(|r| r.trim().to_lowercase()).collect();

        let mut scores = Vec::new();
        for agent in catalog.iter().filter(|c| c.kind == CapabilityKind::Agent) {
            let alignment = preferences
                .alignment(&agent.id, description)
                .await
                .clamp(0.0, 1.0);
            scores.push(score_agent(agent, complexity, &required, alignment));
        }

        scores.sort_by(|a, b| b.score.total_cmp(&a.score));

        let size = self.shortlist_size(complexity).min(scores.len());
        let agents: Vec<String> = scores[..size]
            .iter()
            .map(|s| s.capability_id.clone())
            .collect();
        let rationale = rationale(&scores[..size], complexity, &required);

        tracing::info!(
            agents = ?agents,
            complexity,
            candidates = scores.len(),
            "Selected agents"
        );

        AgentSelection {
            agents,
            scores,
            rationale,
        }
    }
}

impl Default for AgentSelector {
    fn default() -> Self {
        Self::new(3)
    }
}

fn clamp_complexity(complexity: u8) -> u8 {
    let clamped = complexity.clamp(MIN_COMPLEXITY, MAX_COMPLEXITY);
    if clamped != complexity {
        tracing::warn!(requested = complexity, used = clamped, "Complexity out of range, clamped");
    }
    clamped
}

fn score_agent(
    agent: &Capability,
    complexity: u8,
    required: &BTreeSet<String>,
    alignment: f64,
) -> AgentScore {
    let match_fraction = if required.is_empty() {
        1.0
    } else {
        let tags: BTreeSet<String> = agent.expertise_tags.iter().map(|t| t.to_lowercase()).collect();
        required.intersection(&tags).count() as f64 / required.len() as f64
    };

    let elite_bonus = if complexity > ELITE_COMPLEXITY && agent.is_elite() {
        ELITE_BONUS
    } else {
        0.0
    };

    let score = MATCH_WEIGHT * match_fraction
        + CONFIDENCE_WEIGHT * agent.confidence
        + elite_bonus
        + PREFERENCE_WEIGHT * alignment;

    AgentScore {
        capability_id: agent.id.clone(),
        score,
        match_fraction,
        elite_bonus,
        alignment,
    }
}

fn rationale(chosen: &[AgentScore], complexity: u8, required: &BTreeSet<String>) -> String {
    if chosen.is_empty() {
        return "No agents are registered".to_string();
    }

    let picks: Vec<String> = chosen
        .iter()
        .map(|s| {
            format!(
                "{} (score {:.1}, {:.0}% match{})",
                s.capability_id,
                s.score,
                s.match_fraction * 100.0,
                if s.elite_bonus > 0.0 { ", elite" } else { "" }
            )
        })
        .collect();

    let needs = if required.is_empty() {
        "no specific expertise".to_string()
    } else {
        required.iter().cloned().collect::<Vec<_>>().join(", ")
    };

    format!(
        "Selected {} for a complexity {} task requiring {}",
        picks.join(", "),
        complexity,
        needs
    )
}

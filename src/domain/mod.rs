//! Domain types and ports for the orchestration core
//!
//! Plain data structures plus the traits the core consumes from its host:
//! capability handlers, usage history, preference signals and the decision log.

mod analysis;
mod capability;
mod chain;
mod context;
mod task;

pub use analysis::*;
pub use capability::*;
pub use chain::*;
pub use context::*;
pub use task::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CapabilityResult, EngineResult};

/// Handler contract every tool and agent implements
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    async fn invoke(&self, input: Map<String, Value>) -> CapabilityResult<Map<String, Value>>;
}

/// Prior invocation as seen by the scoring functions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Chain or agent identifier the record is about
    pub subject: String,
    /// Free text describing the invocation
    pub content: String,
}

impl UsageRecord {
    /// Case-insensitive whole-word check for the identifier or name in the record
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        contains_word(&self.subject.to_lowercase(), &needle)
            || contains_word(&self.content.to_lowercase(), &needle)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `needle` occurs in `haystack` with no word character on either side
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

/// Read-only access to historical usage
#[async_trait]
pub trait UsageHistory: Send + Sync {
    async fn records(&self) -> Vec<UsageRecord>;
}

/// Per-agent preference in [0, 1] for a given task description
#[async_trait]
pub trait PreferenceSignal: Send + Sync {
    async fn alignment(&self, agent_id: &str, task_description: &str) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    ChainRun,
    AgentSelection,
    CollaborativeRun,
}

impl std::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionKind::ChainRun => write!(f, "chain_run"),
            DecisionKind::AgentSelection => write!(f, "agent_selection"),
            DecisionKind::CollaborativeRun => write!(f, "collaborative_run"),
        }
    }
}

/// One human-readable audit line emitted by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub kind: DecisionKind,
    /// Chain id, or comma-separated agent ids
    pub subject: String,
    pub summary: String,
    pub recorded_at: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn new(kind: DecisionKind, subject: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            summary: summary.into(),
            recorded_at: Utc::now(),
        }
    }

    pub fn to_line(&self) -> String {
        format!(
            "[{}] {} {}: {}",
            self.recorded_at.to_rfc3339(),
            self.kind,
            self.subject,
            self.summary
        )
    }
}

impl From<&DecisionRecord> for UsageRecord {
    fn from(record: &DecisionRecord) -> Self {
        UsageRecord {
            subject: record.subject.clone(),
            content: record.summary.clone(),
        }
    }
}

/// Sink for audit lines; the host decides how to persist them
#[async_trait]
pub trait DecisionLog: Send + Sync {
    async fn record(&self, record: DecisionRecord) -> EngineResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(subject: &str, content: &str) -> UsageRecord {
        UsageRecord {
            subject: subject.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_mentions_whole_words_only() {
        let run = record("quarterly_digest", "Quarterly Digest (reporting): 2 of 2 steps attempted, succeeded");
        assert!(!run.mentions("report"));
        assert!(run.mentions("reporting"));
        assert!(run.mentions("Quarterly Digest"));
        assert!(run.mentions("quarterly_digest"));
        assert!(!run.mentions("quarterly_dig"));
    }

    #[test]
    fn test_mentions_agent_lists() {
        let selection = record("valuation,risk", "Selected valuation");
        assert!(selection.mentions("risk"));
        assert!(!selection.mentions("ris"));
        assert!(!selection.mentions("  "));
    }
}

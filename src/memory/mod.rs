//! Decision log and preference backends
//!
//! Provides the host-side collaborators the engine consumes:
//! - In-memory decision log (default, lost on restart)
//! - File-based decision log (JSON lines, persisted to disk)
//! - Tracing decision log (audit lines on the `audit` target only)
//! - Static per-agent preferences from configuration

mod file;
mod in_memory;

pub use file::FileDecisionLog;
pub use in_memory::InMemoryDecisionLog;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{DecisionLogBackend, DecisionLogSettings};
use crate::domain::{DecisionLog, DecisionRecord, PreferenceSignal, UsageHistory, UsageRecord};
use crate::error::EngineResult;

/// Writes audit lines to the `audit` tracing target and keeps nothing
pub struct TracingDecisionLog;

#[async_trait]
impl DecisionLog for TracingDecisionLog {
    async fn record(&self, record: DecisionRecord) -> EngineResult<()> {
        tracing::info!(target: "audit", kind = %record.kind, "{}", record.to_line());
        Ok(())
    }
}

#[async_trait]
impl UsageHistory for TracingDecisionLog {
    async fn records(&self) -> Vec<UsageRecord> {
        Vec::new()
    }
}

/// Fixed alignment per agent id, regardless of the task
#[derive(Debug, Clone, Default)]
pub struct StaticPreferences {
    alignments: HashMap<String, f64>,
}

impl StaticPreferences {
    pub fn new(alignments: HashMap<String, f64>) -> Self {
        Self { alignments }
    }
}

#[async_trait]
impl PreferenceSignal for StaticPreferences {
    async fn alignment(&self, agent_id: &str, _task_description: &str) -> f64 {
        self.alignments.get(agent_id).copied().unwrap_or(0.0)
    }
}

/// No preference for any agent
pub struct NeutralPreferences;

#[async_trait]
impl PreferenceSignal for NeutralPreferences {
    async fn alignment(&self, _agent_id: &str, _task_description: &str) -> f64 {
        0.0
    }
}

/// Create the decision log and the usage history it feeds from configuration
pub fn create_decision_log(
    config: &DecisionLogSettings,
) -> EngineResult<(Arc<dyn DecisionLog>, Arc<dyn UsageHistory>)> {
    match config.backend {
        DecisionLogBackend::InMemory => {
            Ok(split(Arc::new(InMemoryDecisionLog::new(config.max_records))))
        }
        DecisionLogBackend::File => {
            let path = config
                .file_path
                .clone()
                .unwrap_or_else(|| "data/decisions.jsonl".to_string());
            Ok(split(Arc::new(FileDecisionLog::new(path)?)))
        }
        DecisionLogBackend::Tracing => {
            Ok(split(Arc::new(TracingDecisionLog)))
        }
    }
}

fn split<T>(store: Arc<T>) -> (Arc<dyn DecisionLog>, Arc<dyn UsageHistory>)
where
    T: DecisionLog + UsageHistory + 'static,
{
    let history: Arc<dyn UsageHistory> = store.clone();
    let log: Arc<dyn DecisionLog> = store;
    (log, history)
}

//! In-memory decision log

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{DecisionLog, DecisionRecord, UsageHistory, UsageRecord};
use crate::error::EngineResult;

/// Bounded in-memory decision log; oldest records are dropped first
pub struct InMemoryDecisionLog {
    records: Arc<RwLock<VecDeque<DecisionRecord>>>,
    max_records: usize,
}

impl InMemoryDecisionLog {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: Arc::new(RwLock::new(VecDeque::new())),
            max_records: max_records.max(1),
        }
    }

    /// Copy of everything recorded so far, oldest first
    pub async fn entries(&self) -> Vec<DecisionRecord> {
        self.records.read().await.iter().cloned().collect()
    }
}

impl Default for InMemoryDecisionLog {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl DecisionLog for InMemoryDecisionLog {
    async fn record(&self, record: DecisionRecord) -> EngineResult<()> {
        let mut records = self.records.write().await;
        if records.len() >= self.max_records {
            records.pop_front();
        }
        records.push_back(record);
        Ok(())
    }
}

#[async_trait]
impl UsageHistory for InMemoryDecisionLog {
    async fn records(&self) -> Vec<UsageRecord> {
        self.records
            .read()
            .await
            .iter()
            .map(UsageRecord::from)
            .collect()
    }
}

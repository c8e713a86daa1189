//! File-based decision log (one JSON record per line)

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::{DecisionLog, DecisionRecord, UsageHistory, UsageRecord};
use crate::error::{EngineResult, OrchestrationError};

pub struct FileDecisionLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileDecisionLog {
    /// Open (or prepare) a JSON-lines log at `path`
    pub fn new(path: impl Into<PathBuf>) -> EngineResult<Self> {
        let path = path.into();

        // Create parent directory if needed (sync for constructor)
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                OrchestrationError::Io(format!("Failed to create log directory: {}", e))
            })?;
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// All parseable records in the file, oldest first
    pub async fn entries(&self) -> EngineResult<Vec<DecisionRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            OrchestrationError::Io(format!("Failed to read decision log: {}", e))
        })?;

        let mut records = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<DecisionRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    line = line_no + 1,
                    error = %e,
                    "Skipping unreadable decision record"
                ),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl DecisionLog for FileDecisionLog {
    async fn record(&self, record: DecisionRecord) -> EngineResult<()> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| OrchestrationError::Io(format!("Failed to open decision log: {}", e)))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| OrchestrationError::Io(format!("Failed to write decision log: {}", e)))?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl UsageHistory for FileDecisionLog {
    async fn records(&self) -> Vec<UsageRecord> {
        match self.entries().await {
            Ok(entries) => entries.iter().map(UsageRecord::from).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Decision log unavailable, using empty history");
                Vec::new()
            }
        }
    }
}

//! Collaborative task types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};

use crate::error::OrchestrationError;

/// Lifecycle of a collaborative task; only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Planning,
    Executing,
    Reviewing,
    Completed,
}

impl TaskStatus {
    fn next(self) -> Option<TaskStatus> {
        match self {
            TaskStatus::Planning => Some(TaskStatus::Executing),
            TaskStatus::Executing => Some(TaskStatus::Reviewing),
            TaskStatus::Reviewing => Some(TaskStatus::Completed),
            TaskStatus::Completed => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Planning => write!(f, "planning"),
            TaskStatus::Executing => write!(f, "executing"),
            TaskStatus::Reviewing => write!(f, "reviewing"),
            TaskStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Result of one agent's run against the shared payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub capability_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Map<String, Value>>,
    pub confidence: f64,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.output.is_some()
    }
}

/// Caller-supplied description of a collaborative request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub task_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
    pub complexity: u8,
    #[serde(default)]
    pub required_capabilities: BTreeSet<String>,
}

/// One collaborative request as it moves through its lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborativeTask {
    pub id: String,
    pub task_type: String,
    pub complexity: u8,
    pub required_capabilities: BTreeSet<String>,
    pub assigned_agents: Vec<String>,
    pub status: TaskStatus,
    pub results_by_agent: HashMap<String, AgentOutcome>,
}

impl CollaborativeTask {
    pub fn new(
        task_type: impl Into<String>,
        complexity: u8,
        required_capabilities: BTreeSet<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_type: task_type.into(),
            complexity,
            required_capabilities,
            assigned_agents: Vec::new(),
            status: TaskStatus::Planning,
            results_by_agent: HashMap::new(),
        }
    }

    /// Move to the next status. Skipping ahead or going back is refused.
    pub fn advance(&mut self, to: TaskStatus) -> Result<(), OrchestrationError> {
        if self.status.next() != Some(to) {
            return Err(OrchestrationError::InvalidTask(format!(
                "task {} cannot move from {} to {}",
                self.id, self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }

    /// Store an agent's outcome; only allowed while executing or reviewing
    pub fn record_outcome(&mut self, outcome: AgentOutcome) -> Result<(), OrchestrationError> {
        if !matches!(self.status, TaskStatus::Executing | TaskStatus::Reviewing) {
            return Err(OrchestrationError::InvalidTask(format!(
                "task {} cannot record outcomes while {}",
                self.id, self.status
            )));
        }
        self.results_by_agent
            .insert(outcome.capability_id.clone(), outcome);
        Ok(())
    }

    /// Outcomes in assignment order
    pub fn ordered_outcomes(&self) -> Vec<&AgentOutcome> {
        self.assigned_agents
            .iter()
            .filter_map(|id| self.results_by_agent.get(id))
            .collect()
    }
}

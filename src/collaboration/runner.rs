//! Collaborative task runner
//!
//! Drives one task through `planning -> executing -> reviewing -> completed`.
//! Every assigned agent is invoked once with the same payload; agents run
//! concurrently and their outcomes are collected back in selection order.

use futures::future::join_all;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

use super::selector::{AgentSelection, AgentSelector};
use crate::adapters::metrics_handler::MetricsCollector;
use crate::domain::{
    AgentOutcome, CollaborativeTask, PreferenceSignal, TaskRequest, TaskStatus,
};
use crate::error::{CapabilityError, EngineResult, OrchestrationError};
use crate::registry::CapabilityRegistry;
use crate::synthesis::output_confidence;

/// A completed task together with the selection that staffed it
#[derive(Debug, Clone)]
pub struct CollaborativeRun {
    pub task: CollaborativeTask,
    pub selection: AgentSelection,
}

impl CollaborativeRun {
    /// Outcomes in assignment order
    pub fn outcomes(&self) -> Vec<&AgentOutcome> {
        self.task.ordered_outcomes()
    }
}

pub struct CollaborativeTaskRunner {
    selector: AgentSelector,
    metrics: Option<Arc<MetricsCollector>>,
}

impl CollaborativeTaskRunner {
    pub fn new(selector: AgentSelector) -> Self {
        Self {
            selector,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Plan, execute and review one collaborative request.
    ///
    /// Agent failures are recorded as outcomes; only an invalid request is
    /// reported as an error.
    pub async fn run(
        &self,
        request: &TaskRequest,
        registry: &CapabilityRegistry,
        preferences: &dyn PreferenceSignal,
    ) -> EngineResult<CollaborativeRun> {
        if request.task_type.trim().is_empty() {
            return Err(OrchestrationError::InvalidTask(
                "task_type must not be empty".to_string(),
            ));
        }

        // Planning
        let catalog = registry.snapshot().await;
        let selection = self
            .selector
            .select(
                &request.description,
                request.complexity,
                &request.required_capabilities,
                &catalog,
                preferences,
            )
            .await;

        let mut task = CollaborativeTask::new(
            request.task_type.clone(),
            request.complexity.clamp(1, 10),
            request.required_capabilities.clone(),
        );
        task.assigned_agents = selection.agents.clone();

        tracing::info!(
            task = %task.id,
            task_type = %task.task_type,
            agents = ?task.assigned_agents,
            "Task planned"
        );

        // Executing
        task.advance(TaskStatus::Executing)?;
        let futures: Vec<_> = task
            .assigned_agents
            .iter()
            .map(|agent_id| {
                let fallback_confidence = catalog
                    .iter()
                    .find(|c| &c.id == agent_id)
                    .map(|c| c.confidence)
                    .unwrap_or_default();
                self.run_agent(agent_id, &request.payload, registry, fallback_confidence)
            })
            .collect();
        let outcomes: Vec<AgentOutcome> = join_all(futures).await;

        for outcome in outcomes {
            task.record_outcome(outcome)?;
        }

        // Reviewing
        task.advance(TaskStatus::Reviewing)?;
        let failed = task
            .results_by_agent
            .values()
            .filter(|o| !o.succeeded())
            .count();
        if failed > 0 {
            tracing::warn!(task = %task.id, failed, total = task.assigned_agents.len(), "Some agents failed");
        }

        task.advance(TaskStatus::Completed)?;
        if let Some(metrics) = &self.metrics {
            metrics
                .collaborative_tasks
                .with_label_values(&[task.task_type.as_str()])
                .inc();
        }

        tracing::info!(task = %task.id, status = %task.status, "Task completed");
        Ok(CollaborativeRun { task, selection })
    }

    async fn run_agent(
        &self,
        agent_id: &str,
        payload: &Map<String, Value>,
        registry: &CapabilityRegistry,
        fallback_confidence: f64,
    ) -> AgentOutcome {
        let started = Instant::now();
        let result = match registry.resolve(agent_id) {
            Some(handler) => handler.invoke(payload.clone()).await,
            None => Err(CapabilityError::NotFound(agent_id.to_string())),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        if let Some(metrics) = &self.metrics {
            metrics.record_agent(agent_id, result.is_ok());
        }

        match result {
            Ok(output) => AgentOutcome {
                capability_id: agent_id.to_string(),
                confidence: output_confidence(&output).unwrap_or(fallback_confidence),
                output: Some(output),
                duration_ms,
                error: None,
            },
            Err(e) => {
                tracing::warn!(agent = %agent_id, error = %e, "Agent failed");
                AgentOutcome {
                    capability_id: agent_id.to_string(),
                    output: None,
                    confidence: 0.0,
                    duration_ms,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

impl Default for CollaborativeTaskRunner {
    fn default() -> Self {
        Self::new(AgentSelector::default())
    }
}

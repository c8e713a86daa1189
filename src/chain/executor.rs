//! Chain Executor - Runs a tool chain step by step against a shared context
//!
//! Steps run strictly in declared order:
//! - A step whose condition is false is skipped and leaves no record
//! - Parameters are merged over the current context (Tera templates rendered)
//! - Successful output is mapped (or merged) into the context
//! - A failing step is recorded and execution continues, unless it is critical

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::adapters::metrics_handler::{MetricsCollector, StepOutcome};
use crate::domain::{
    lookup_path, AbortInfo, ExecutionContext, OrchestrationResult, SynthesizedAnalysis, ToolChain,
    ToolExecutionRecord, ToolStep,
};
use crate::error::{CapabilityError, CapabilityResult};
use crate::registry::CapabilityRegistry;
use crate::synthesis::ResultSynthesizer;
use crate::template;

pub struct ChainExecutor {
    synthesizer: ResultSynthesizer,
    metrics: Option<Arc<MetricsCollector>>,
}

impl ChainExecutor {
    pub fn new(synthesizer: ResultSynthesizer) -> Self {
        Self {
            synthesizer,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Execute a chain against the registry, starting from `initial`
    ///
    /// Never fails: missing capabilities and handler errors become failed
    /// records, and a critical failure stops the chain with the context
    /// accumulated so far.
    pub async fn execute(
        &self,
        chain: &ToolChain,
        registry: &CapabilityRegistry,
        initial: ExecutionContext,
    ) -> OrchestrationResult {
        let started = Instant::now();
        let mut context = initial;
        let mut executions = Vec::with_capacity(chain.steps.len());
        let mut aborted = None;

        tracing::info!(chain = %chain.id, steps = chain.steps.len(), "Starting chain");

        for (position, step) in chain.steps.iter().enumerate() {
            let step_index = step.index.unwrap_or(position);

            if let Some(condition) = &step.condition {
                if !condition.evaluate(&context) {
                    tracing::debug!(
                        chain = %chain.id,
                        step = step_index,
                        tool = %step.tool_name,
                        "Condition not met, skipping step"
                    );
                    self.observe(&step.tool_name, StepOutcome::Skipped, None);
                    continue;
                }
            }

            let record = self
                .execute_step(&chain.id, step_index, step, registry, &mut context)
                .await;

            if !record.success {
                let error = record.error.clone().unwrap_or_default();
                if step.critical {
                    tracing::error!(
                        chain = %chain.id,
                        step = step_index,
                        tool = %step.tool_name,
                        error = %error,
                        "Critical step failed, aborting chain"
                    );
                    aborted = Some(AbortInfo {
                        step_index,
                        tool_name: step.tool_name.clone(),
                        error,
                    });
                    executions.push(record);
                    break;
                }
                tracing::warn!(
                    chain = %chain.id,
                    step = step_index,
                    tool = %step.tool_name,
                    error = %error,
                    "Step failed, continuing"
                );
            }

            executions.push(record);
        }

        let overall_success = executions.iter().all(|r| r.success);
        let analysis = self.synthesizer.synthesize_executions(&executions);
        let recommendations = recommendations(&analysis, &executions, aborted.as_ref());
        let total_duration_ms = started.elapsed().as_millis() as u64;

        if let Some(metrics) = &self.metrics {
            metrics.record_chain(&chain.id, overall_success);
        }

        tracing::info!(
            chain = %chain.id,
            success = overall_success,
            attempted = executions.len(),
            duration_ms = total_duration_ms,
            "Chain finished"
        );

        OrchestrationResult {
            chain_id: chain.id.clone(),
            overall_success,
            executions,
            final_context: context,
            total_duration_ms,
            recommendations,
            aborted,
            analysis,
        }
    }

    /// Run one step and fold its output into the context
    async fn execute_step(
        &self,
        chain_id: &str,
        step_index: usize,
        step: &ToolStep,
        registry: &CapabilityRegistry,
        context: &mut ExecutionContext,
    ) -> ToolExecutionRecord {
        let started = Instant::now();
        let mut input = context.as_map().clone();

        let result = match render_parameters(&step.parameters, context) {
            Ok(parameters) => {
                // parameters win on key collision
                input.extend(parameters);
                match registry.resolve(&step.tool_name) {
                    Some(handler) => handler.invoke(input.clone()).await,
                    None => Err(CapabilityError::NotFound(step.tool_name.clone())),
                }
            }
            Err(e) => Err(e),
        };

        let duration = started.elapsed();
        let mut record = ToolExecutionRecord {
            chain_id: chain_id.to_string(),
            step_index,
            tool_name: step.tool_name.clone(),
            input_snapshot: input,
            output: None,
            duration_ms: duration.as_millis() as u64,
            success: false,
            error: None,
        };

        match result {
            Ok(output) => {
                apply_output(step, &output, context);
                record.output = Some(output);
                record.success = true;
                self.observe(&step.tool_name, StepOutcome::Success, Some(duration.as_secs_f64()));
            }
            Err(e) => {
                record.error = Some(e.to_string());
                self.observe(&step.tool_name, StepOutcome::Failure, Some(duration.as_secs_f64()));
            }
        }

        record
    }

    fn observe(&self, tool: &str, outcome: StepOutcome, seconds: Option<f64>) {
        if let Some(metrics) = &self.metrics {
            metrics.record_step(tool, outcome, seconds);
        }
    }
}

impl Default for ChainExecutor {
    fn default() -> Self {
        Self::new(ResultSynthesizer::default())
    }
}

/// Copy mapped keys into the context, or merge the whole output when unmapped
fn apply_output(step: &ToolStep, output: &Map<String, Value>, context: &mut ExecutionContext) {
    let Some(mapping) = &step.output_mapping else {
        context.merge(output);
        return;
    };

    for (source, dest) in mapping {
        match lookup_path(output, source) {
            Some(value) => context.insert(dest.clone(), value.clone()),
            None => tracing::debug!(
                tool = %step.tool_name,
                source = %source,
                "Mapped output key missing, not copied"
            ),
        }
    }
}

/// Render Tera templates inside parameter values against the current context
fn render_parameters(
    parameters: &Map<String, Value>,
    context: &ExecutionContext,
) -> CapabilityResult<Map<String, Value>> {
    match template::render(&Value::Object(parameters.clone()), context.as_map())? {
        Value::Object(rendered) => Ok(rendered),
        _ => Ok(parameters.clone()),
    }
}

fn recommendations(
    analysis: &SynthesizedAnalysis,
    executions: &[ToolExecutionRecord],
    aborted: Option<&AbortInfo>,
) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(action) = &analysis.consensus_recommendation {
        lines.push(format!("Recommended action: {}", action));
    }
    for risk in &analysis.risks {
        lines.push(format!("Review risk: {}", risk));
    }
    for record in executions.iter().filter(|r| !r.success) {
        lines.push(format!(
            "Step {} ({}) failed: {}",
            record.step_index,
            record.tool_name,
            record.error.as_deref().unwrap_or("unknown error")
        ));
    }

    match aborted {
        Some(abort) => lines.push(format!(
            "Chain aborted at critical step {} ({}); remaining steps were not run",
            abort.step_index, abort.tool_name
        )),
        None if executions.is_empty() => {
            lines.push("No steps ran: every step condition was false".to_string())
        }
        None if executions.iter().all(|r| r.success) => lines.push(format!(
            "All {} attempted steps completed successfully",
            executions.len()
        )),
        None => {}
    }

    lines
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;

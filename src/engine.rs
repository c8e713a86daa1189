//! Orchestration engine
//!
//! The caller-facing facade. Constructed once at startup and shared; owns
//! the capability registry, the chain catalog and the collaborators the core
//! consumes (usage history, preferences, decision log).

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::adapters::metrics_handler::MetricsCollector;
use crate::adapters::static_capability::StaticCapability;
use crate::chain::{ChainCatalog, ChainExecutor, ChainRecommender};
use crate::collaboration::{AgentSelection, AgentSelector, CollaborativeRun, CollaborativeTaskRunner};
use crate::config::{EngineSettings, Settings};
use crate::domain::{
    AgentOutcome, Capability, CapabilityFeedback, ChainSummary, CollaborativeTask, DecisionKind,
    DecisionLog, DecisionRecord, ExecutionContext, OrchestrationResult, PreferenceSignal,
    SynthesizedAnalysis, TaskRequest, ToolChain, UsageHistory,
};
use crate::error::{EngineResult, OrchestrationError};
use crate::memory::{create_decision_log, InMemoryDecisionLog, NeutralPreferences, StaticPreferences};
use crate::registry::CapabilityRegistry;
use crate::synthesis::{recommended_action, ResultSynthesizer};

/// Everything a collaborative request produced
#[derive(Debug, Clone, Serialize)]
pub struct CollaborativeAnalysis {
    pub task: CollaborativeTask,
    pub selection: AgentSelection,
    /// One outcome per assigned agent, in assignment order
    pub outcomes: Vec<AgentOutcome>,
    pub analysis: SynthesizedAnalysis,
    pub recommendations: Vec<String>,
}

pub struct OrchestrationEngine {
    settings: EngineSettings,
    registry: CapabilityRegistry,
    chains: RwLock<ChainCatalog>,
    executor: ChainExecutor,
    recommender: ChainRecommender,
    runner: CollaborativeTaskRunner,
    synthesizer: ResultSynthesizer,
    history: Arc<dyn UsageHistory>,
    preferences: Arc<dyn PreferenceSignal>,
    decision_log: Arc<dyn DecisionLog>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl OrchestrationEngine {
    pub fn new(registry: CapabilityRegistry, chains: ChainCatalog, settings: EngineSettings) -> Self {
        let log = Arc::new(InMemoryDecisionLog::default());
        Self {
            executor: ChainExecutor::new(ResultSynthesizer::new(&settings)),
            recommender: ChainRecommender::new(settings.recommendation_limit),
            runner: CollaborativeTaskRunner::new(AgentSelector::new(settings.max_agents)),
            synthesizer: ResultSynthesizer::new(&settings),
            settings,
            registry,
            chains: RwLock::new(chains),
            history: log.clone(),
            preferences: Arc::new(NeutralPreferences),
            decision_log: log,
            metrics: None,
        }
    }

    /// Build the engine from loaded settings, backing every configured
    /// capability with a [`StaticCapability`]
    pub fn from_settings(settings: &Settings) -> EngineResult<Self> {
        let mut registry = CapabilityRegistry::new();
        for config in &settings.capabilities {
            registry.register(
                config.to_capability(),
                Arc::new(StaticCapability::from_config(config)),
            );
        }

        let chains = ChainCatalog::from_chains(settings.chains.iter().cloned())?;
        let (log, history) = create_decision_log(&settings.decision_log)?;

        let mut engine = Self::new(registry, chains, settings.engine.clone())
            .with_decision_log(log, history)
            .with_preferences(Arc::new(StaticPreferences::new(settings.preferences.clone())));

        if settings.metrics.enabled {
            let metrics = MetricsCollector::new()
                .map_err(|e| OrchestrationError::Config(format!("metrics: {}", e)))?;
            engine = engine.with_metrics(Arc::new(metrics));
        }

        tracing::info!(
            capabilities = engine.registry.len(),
            chains = settings.chains.len(),
            "Engine ready"
        );
        Ok(engine)
    }

    pub fn with_decision_log(
        mut self,
        log: Arc<dyn DecisionLog>,
        history: Arc<dyn UsageHistory>,
    ) -> Self {
        self.decision_log = log;
        self.history = history;
        self
    }

    pub fn with_preferences(mut self, preferences: Arc<dyn PreferenceSignal>) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.executor =
            ChainExecutor::new(ResultSynthesizer::new(&self.settings)).with_metrics(metrics.clone());
        self.runner = CollaborativeTaskRunner::new(AgentSelector::new(self.settings.max_agents))
            .with_metrics(metrics.clone());
        self.metrics = Some(metrics);
        self
    }

    pub fn metrics(&self) -> Option<&Arc<MetricsCollector>> {
        self.metrics.as_ref()
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Run a registered chain. Unknown ids are the only error.
    pub async fn run_chain(&self, chain_id: &str, input: Value) -> EngineResult<OrchestrationResult> {
        let chain = self.chains.read().await.get(chain_id)?.clone();
        Ok(self.execute(&chain, input).await)
    }

    /// Chains worth running for `text`, best first
    pub async fn recommend_chains(&self, text: &str) -> Vec<ToolChain> {
        let history = self.history.records().await;
        let chains = self.chains.read().await;
        self.recommender
            .recommend(text, chains.list(), &history)
            .into_iter()
            .map(|scored| scored.chain.clone())
            .collect()
    }

    /// Recommend and run the top chain; `None` when nothing matched
    pub async fn run_best_chain(
        &self,
        text: &str,
        input: Value,
    ) -> EngineResult<Option<OrchestrationResult>> {
        let Some(chain) = self.recommend_chains(text).await.into_iter().next() else {
            tracing::info!("No chain matched the request");
            return Ok(None);
        };
        Ok(Some(self.execute(&chain, input).await))
    }

    pub async fn run_collaborative_task(
        &self,
        request: TaskRequest,
    ) -> EngineResult<CollaborativeAnalysis> {
        let CollaborativeRun { task, selection } = self
            .runner
            .run(&request, &self.registry, self.preferences.as_ref())
            .await?;

        self.audit(DecisionRecord::new(
            DecisionKind::AgentSelection,
            selection.agents.join(","),
            format!("{} ({})", selection.rationale, request.description.trim()),
        ))
        .await;

        let ordered = task.ordered_outcomes();
        let analysis = self.synthesizer.synthesize_outcomes(&ordered);
        let recommendations = self.agent_recommendations(&ordered, &analysis).await;
        let outcomes: Vec<AgentOutcome> = ordered.into_iter().cloned().collect();

        let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
        self.audit(DecisionRecord::new(
            DecisionKind::CollaborativeRun,
            task.task_type.clone(),
            format!(
                "task {}: {} of {} agents succeeded, consensus {}, confidence {:.2}",
                task.id,
                succeeded,
                outcomes.len(),
                analysis.consensus_recommendation.as_deref().unwrap_or("none"),
                analysis.confidence_level
            ),
        ))
        .await;

        Ok(CollaborativeAnalysis {
            task,
            selection,
            outcomes,
            analysis,
            recommendations,
        })
    }

    pub async fn get_available_chains(&self) -> Vec<ChainSummary> {
        self.chains.read().await.summaries()
    }

    /// Validate and add (or replace) a chain definition
    pub async fn register_chain(&self, chain: ToolChain) -> EngineResult<()> {
        self.chains.write().await.insert(chain)
    }

    pub async fn enhance_capability(
        &self,
        id: &str,
        feedback: &CapabilityFeedback,
    ) -> EngineResult<Capability> {
        self.registry.enhance_capability(id, feedback).await
    }

    async fn execute(&self, chain: &ToolChain, input: Value) -> OrchestrationResult {
        let result = self
            .executor
            .execute(chain, &self.registry, ExecutionContext::from_value(input))
            .await;

        let mut summary = format!(
            "{} ({}): {} of {} steps attempted, {}",
            chain.name,
            chain.category,
            result.executions.len(),
            chain.steps.len(),
            if result.overall_success { "succeeded" } else { "failed" }
        );
        if let Some(abort) = &result.aborted {
            summary.push_str(&format!(", aborted at {}", abort.tool_name));
        }
        if let Some(action) = &result.analysis.consensus_recommendation {
            summary.push_str(&format!(", recommends {}", action));
        }
        self.audit(DecisionRecord::new(DecisionKind::ChainRun, chain.id.clone(), summary))
            .await;

        result
    }

    /// Human-readable lines per agent, phrased in each agent's voice
    async fn agent_recommendations(
        &self,
        outcomes: &[&AgentOutcome],
        analysis: &SynthesizedAnalysis,
    ) -> Vec<String> {
        let mut lines = Vec::new();

        for outcome in outcomes {
            let capability = self.registry.get(&outcome.capability_id).await;
            let name = capability
                .as_ref()
                .map(|c| c.display_name.clone())
                .unwrap_or_else(|| outcome.capability_id.clone());

            let text = match (&outcome.output, &outcome.error) {
                (Some(output), None) => match recommended_action(output) {
                    Some(action) => format!("{} recommends {}", name, action),
                    None => format!("{} reported no discrete action", name),
                },
                (_, Some(error)) => format!("{} could not complete: {}", name, error),
                (None, None) => format!("{} produced no output", name),
            };

            let line = match capability.and_then(|c| c.personality) {
                Some(personality) if outcome.succeeded() => personality.phrase(&text),
                _ => text,
            };
            lines.push(line);
        }

        if let Some(consensus) = &analysis.consensus_recommendation {
            lines.push(format!(
                "Consensus: {} (confidence {:.2})",
                consensus, analysis.confidence_level
            ));
        }
        lines
    }

    async fn audit(&self, record: DecisionRecord) {
        if let Err(e) = self.decision_log.record(record).await {
            tracing::warn!(error = %e, "Failed to record decision");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CapabilityKind, CapabilityPersonality, ChainCategory, CommunicationStyle, ToolStep};
    use serde_json::json;

    fn engine_with(log: Arc<InMemoryDecisionLog>) -> OrchestrationEngine {
        let mut registry = CapabilityRegistry::new();
        registry.register(
            Capability::new("search", CapabilityKind::Tool),
            Arc::new(StaticCapability::new(json!({"listing": {"id": "{{ propertyId }}"}}))),
        );
        registry.register(
            Capability::new("analyst", CapabilityKind::Agent)
                .with_confidence(0.9)
                .with_personality(CapabilityPersonality {
                    communication_style: CommunicationStyle::Executive,
                    ..Default::default()
                }),
            Arc::new(StaticCapability::new(json!({"recommendation": "buy"}))),
        );

        let chains = ChainCatalog::from_chains(vec![ToolChain::new(
            "lookup",
            "Property lookup",
            ChainCategory::Research,
        )
        .with_step(ToolStep::new("search"))
        .with_triggers(["look up"])])
        .unwrap();

        OrchestrationEngine::new(registry, chains, EngineSettings::default())
            .with_decision_log(log.clone(), log)
    }

    #[tokio::test]
    async fn test_unknown_chain() {
        let engine = engine_with(Arc::new(InMemoryDecisionLog::default()));
        let err = engine.run_chain("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::ChainNotFound(_)));
    }

    #[tokio::test]
    async fn test_chain_run_is_audited_and_feeds_history() {
        let log = Arc::new(InMemoryDecisionLog::default());
        let engine = engine_with(log.clone());

        let result = engine.run_chain("lookup", json!({"propertyId": "p9"})).await.unwrap();
        assert!(result.overall_success);
        assert_eq!(result.final_context.lookup("listing.id"), Some(&json!("p9")));

        let entries = log.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, DecisionKind::ChainRun);
        assert_eq!(entries[0].subject, "lookup");
        assert!(entries[0].summary.contains("1 of 1 steps attempted, succeeded"));
    }

    #[tokio::test]
    async fn test_collaboration_phrasing_and_audit() {
        let log = Arc::new(InMemoryDecisionLog::default());
        let engine = engine_with(log.clone());

        let analysis = engine
            .run_collaborative_task(TaskRequest {
                task_type: "underwriting".into(),
                description: "Underwrite p9".into(),
                payload: serde_json::Map::new(),
                complexity: 3,
                required_capabilities: Default::default(),
            })
            .await
            .unwrap();

        assert_eq!(analysis.outcomes.len(), 1);
        assert_eq!(analysis.recommendations[0], "Bottom line: analyst recommends buy");
        assert_eq!(analysis.recommendations[1], "Consensus: buy (confidence 0.90)");

        let kinds: Vec<_> = log.entries().await.into_iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![DecisionKind::AgentSelection, DecisionKind::CollaborativeRun]);
    }

    #[tokio::test]
    async fn test_register_chain_validates() {
        let engine = engine_with(Arc::new(InMemoryDecisionLog::default()));
        let err = engine
            .register_chain(ToolChain::new("empty", "Empty", ChainCategory::Analysis))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::MalformedChain { .. }));
        assert_eq!(engine.get_available_chains().await.len(), 1);
    }

    #[tokio::test]
    async fn test_run_best_chain_without_match() {
        let engine = engine_with(Arc::new(InMemoryDecisionLog::default()));
        let result = engine.run_best_chain("weather tomorrow", json!({})).await.unwrap();
        assert!(result.is_none());
    }
}

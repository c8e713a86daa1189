use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

pub struct MetricsCollector {
    registry: Registry,

    // Chain metrics
    pub chain_runs: CounterVec,
    pub step_executions: CounterVec,
    pub step_duration: HistogramVec,

    // Collaboration metrics
    pub agent_executions: CounterVec,
    pub collaborative_tasks: CounterVec,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Chain metrics
        let chain_runs = CounterVec::new(
            Opts::new("sextant_chain_runs_total", "Total chain runs"),
            &["chain", "outcome"],
        )?;
        registry.register(Box::new(chain_runs.clone()))?;

        let step_executions = CounterVec::new(
            Opts::new("sextant_step_executions_total", "Total chain step executions"),
            &["tool", "outcome"],
        )?;
        registry.register(Box::new(step_executions.clone()))?;

        let step_duration = HistogramVec::new(
            HistogramOpts::new("sextant_step_duration_seconds", "Chain step duration in seconds"),
            &["tool"],
        )?;
        registry.register(Box::new(step_duration.clone()))?;

        // Collaboration metrics
        let agent_executions = CounterVec::new(
            Opts::new("sextant_agent_executions_total", "Total agent invocations"),
            &["agent", "outcome"],
        )?;
        registry.register(Box::new(agent_executions.clone()))?;

        let collaborative_tasks = CounterVec::new(
            Opts::new("sextant_collaborative_tasks_total", "Total collaborative tasks completed"),
            &["task_type"],
        )?;
        registry.register(Box::new(collaborative_tasks.clone()))?;

        Ok(Self {
            registry,
            chain_runs,
            step_executions,
            step_duration,
            agent_executions,
            collaborative_tasks,
        })
    }

    pub fn record_step(&self, tool: &str, outcome: StepOutcome, seconds: Option<f64>) {
        self.step_executions
            .with_label_values(&[tool, outcome.as_str()])
            .inc();
        if let Some(seconds) = seconds {
            self.step_duration.with_label_values(&[tool]).observe(seconds);
        }
    }

    pub fn record_chain(&self, chain: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.chain_runs.with_label_values(&[chain, outcome]).inc();
    }

    pub fn record_agent(&self, agent: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.agent_executions.with_label_values(&[agent, outcome]).inc();
    }

    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    Failure,
    Skipped,
}

impl StepOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            StepOutcome::Success => "success",
            StepOutcome::Failure => "failure",
            StepOutcome::Skipped => "skipped",
        }
    }
}

use config::{Config, File};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

pub mod validator;

use crate::cli::Cli;
use crate::domain::{Capability, CapabilityKind, CapabilityPersonality, ToolChain};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub decision_log: DecisionLogSettings,
    #[serde(default)]
    pub metrics: MetricsSettings,
    #[serde(default)]
    pub capabilities: Vec<CapabilityConfig>,
    #[serde(default)]
    pub chains: Vec<ToolChain>,
    /// Agent id -> preference alignment in [0, 1]
    #[serde(default)]
    pub preferences: HashMap<String, f64>,
}

/// Tuning knobs for recommendation, selection and synthesis
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSettings {
    #[serde(default = "default_recommendation_limit")]
    pub recommendation_limit: usize,
    #[serde(default = "default_max_agents")]
    pub max_agents: usize,
    #[serde(default = "default_summary_limit")]
    pub risk_limit: usize,
    #[serde(default = "default_summary_limit")]
    pub opportunity_limit: usize,
    /// Spread of `risk_score` (0-100 scale) above which contributors disagree
    #[serde(default = "default_risk_divergence")]
    pub risk_divergence_threshold: f64,
}

fn default_recommendation_limit() -> usize {
    5
}

fn default_max_agents() -> usize {
    3
}

fn default_summary_limit() -> usize {
    3
}

fn default_risk_divergence() -> f64 {
    20.0
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            recommendation_limit: default_recommendation_limit(),
            max_agents: default_max_agents(),
            risk_limit: default_summary_limit(),
            opportunity_limit: default_summary_limit(),
            risk_divergence_threshold: default_risk_divergence(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionLogBackend {
    #[default]
    InMemory,
    File,
    Tracing,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DecisionLogSettings {
    #[serde(default)]
    pub backend: DecisionLogBackend,
    /// JSON-lines file used by the `file` backend
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

fn default_max_records() -> usize {
    1000
}

impl Default for DecisionLogSettings {
    fn default() -> Self {
        Self {
            backend: DecisionLogBackend::InMemory,
            file_path: None,
            max_records: default_max_records(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsSettings {
    #[serde(default)]
    pub enabled: bool,
}

/// A capability declared in configuration, backed by a static handler
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CapabilityConfig {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: CapabilityKind,
    #[serde(default)]
    pub expertise_tags: Vec<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_latency")]
    pub typical_latency_ms: u64,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub personality: Option<CapabilityPersonality>,
    /// Output returned on every call; strings may be Tera templates over the input
    #[serde(default)]
    pub response: Option<Value>,
    /// Fail every call with this message
    #[serde(default)]
    pub fail_with: Option<String>,
    #[serde(default)]
    pub simulated_latency_ms: Option<u64>,
}

fn default_confidence() -> f64 {
    0.7
}

fn default_latency() -> u64 {
    1000
}

impl CapabilityConfig {
    /// Catalog entry for this capability
    pub fn to_capability(&self) -> Capability {
        let mut capability = Capability::new(self.id.clone(), self.kind)
            .with_tags(self.expertise_tags.iter().cloned())
            .with_confidence(self.confidence);
        capability.display_name = self
            .display_name
            .clone()
            .unwrap_or_else(|| self.id.clone());
        capability.description = self.description.clone();
        capability.typical_latency_ms = self.typical_latency_ms;
        capability.specializations = self.specializations.iter().cloned().collect::<BTreeSet<_>>();
        capability.personality = self.personality;
        capability
    }
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_root(".")
    }

    /// Create settings from CLI arguments (config file plus CLI overrides)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let config_path = &cli.config;
        let root = config_path
            .parent()
            .and_then(|p| p.to_str())
            .filter(|p| !p.is_empty())
            .unwrap_or(".");

        let s = Self::builder(config_path.clone())?;
        let mut settings: Settings = s.try_deserialize()?;

        // CLI > env vars > config file
        settings.apply_cli_overrides(cli);

        settings.load_external_configs(root)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_root(root: &str) -> Result<Self, anyhow::Error> {
        let config_path = Path::new(root).join("sextant");
        let s = Self::builder(config_path)?;
        let mut settings: Settings = s.try_deserialize()?;

        settings.load_external_configs(root)?;
        settings.validate()?;
        Ok(settings)
    }

    fn builder(config_path: PathBuf) -> Result<Config, anyhow::Error> {
        Ok(Config::builder()
            .add_source(File::from(config_path).required(false))
            .set_default("decision_log.backend", "in_memory")?
            .set_default("metrics.enabled", false)?
            .build()?)
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if cli.metrics {
            self.metrics.enabled = true;
        }
        if let Some(path) = &cli.decision_log {
            self.decision_log.backend = DecisionLogBackend::File;
            self.decision_log.file_path = Some(path.display().to_string());
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        validator::ConfigValidator::validate(self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })
    }

    fn load_external_configs(&mut self, root: &str) -> Result<(), anyhow::Error> {
        self.load_capabilities_from_dir(&format!("{}/config/capabilities", root))?;
        self.load_chains_from_dir(&format!("{}/config/chains", root))?;
        Ok(())
    }

    fn load_capabilities_from_dir(&mut self, path: &str) -> Result<(), anyhow::Error> {
        let capabilities: Vec<CapabilityConfig> = load_definitions(path)?;
        self.capabilities.extend(capabilities);
        Ok(())
    }

    fn load_chains_from_dir(&mut self, path: &str) -> Result<(), anyhow::Error> {
        let chains: Vec<ToolChain> = load_definitions(path)?;
        self.chains.extend(chains);
        Ok(())
    }
}

/// Read one definition per file from `path`, in file name order
fn load_definitions<T: DeserializeOwned>(path: &str) -> Result<Vec<T>, anyhow::Error> {
    let pattern = format!("{}/*", path);
    let mut definitions = Vec::new();
    for entry in glob::glob(&pattern)? {
        match entry {
            Ok(path) => {
                if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                    if matches!(ext, "json" | "yaml" | "yml" | "toml") {
                        let content = std::fs::read_to_string(&path)?;
                        let definition: T = match ext {
                            "json" => serde_json::from_str(&content)?,
                            "toml" => toml::from_str(&content)?,
                            _ => serde_yaml::from_str(&content)?,
                        };
                        tracing::debug!(path = %path.display(), "Loaded definition");
                        definitions.push(definition);
                    }
                }
            }
            Err(e) => tracing::warn!("Failed to read glob entry: {}", e),
        }
    }
    Ok(definitions)
}

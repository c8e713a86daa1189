use std::collections::HashSet;
use thiserror::Error;

use crate::config::{CapabilityConfig, Settings};
use crate::domain::ToolChain;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Cross-reference error: {0}")]
    CrossReference(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Malformed chain '{chain}': {reason}")]
    MalformedChain { chain: String, reason: String },
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_engine(settings) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_capabilities(&settings.capabilities) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_chains(&settings.chains) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_preferences(settings) {
            errors.extend(e);
        }

        // Late binding is allowed: unknown step tools fail at execution time
        Self::warn_unknown_step_tools(settings);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_engine(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let engine = &settings.engine;

        if engine.max_agents == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "engine.max_agents".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if engine.recommendation_limit == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "engine.recommendation_limit".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if engine.risk_divergence_threshold.is_nan() || engine.risk_divergence_threshold < 0.0 {
            errors.push(ValidationError::InvalidValue {
                field: "engine.risk_divergence_threshold".to_string(),
                reason: "must be a non-negative number".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_capabilities(capabilities: &[CapabilityConfig]) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut ids = HashSet::new();

        for capability in capabilities {
            if capability.id.trim().is_empty() {
                errors.push(ValidationError::MissingField("capability.id".to_string()));
                continue;
            }

            if !ids.insert(&capability.id) {
                errors.push(ValidationError::Duplicate(format!(
                    "Capability '{}'",
                    capability.id
                )));
            }

            if !(0.0..=1.0).contains(&capability.confidence) {
                errors.push(ValidationError::InvalidValue {
                    field: format!("capability '{}' confidence", capability.id),
                    reason: format!("{} is outside [0, 1]", capability.confidence),
                });
            }

            if let Some(response) = &capability.response {
                if response.is_null() {
                    errors.push(ValidationError::InvalidValue {
                        field: format!("capability '{}' response", capability.id),
                        reason: "response must not be null".to_string(),
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_chains(chains: &[ToolChain]) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut ids = HashSet::new();

        for chain in chains {
            if !chain.id.is_empty() && !ids.insert(&chain.id) {
                errors.push(ValidationError::Duplicate(format!("Chain '{}'", chain.id)));
            }

            if chain.name.trim().is_empty() {
                errors.push(ValidationError::MissingField(format!(
                    "chain '{}' name",
                    chain.id
                )));
            }

            // normalize() carries the structural rules; run it on a copy
            if let Err(crate::error::OrchestrationError::MalformedChain { chain, reason }) =
                chain.clone().normalize()
            {
                errors.push(ValidationError::MalformedChain { chain, reason });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_preferences(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let known: HashSet<&str> = settings.capabilities.iter().map(|c| c.id.as_str()).collect();

        for (agent, alignment) in &settings.preferences {
            if !(0.0..=1.0).contains(alignment) {
                errors.push(ValidationError::InvalidValue {
                    field: format!("preferences.{}", agent),
                    reason: format!("{} is outside [0, 1]", alignment),
                });
            }
            if !known.is_empty() && !known.contains(agent.as_str()) {
                errors.push(ValidationError::CrossReference(format!(
                    "Preference for unknown capability '{}'",
                    agent
                )));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn warn_unknown_step_tools(settings: &Settings) {
        let known: HashSet<&str> = settings.capabilities.iter().map(|c| c.id.as_str()).collect();
        for chain in &settings.chains {
            for step in &chain.steps {
                if !known.contains(step.tool_name.as_str()) {
                    tracing::warn!(
                        chain = %chain.id,
                        tool = %step.tool_name,
                        "Chain step names a capability that is not configured"
                    );
                }
            }
        }
    }
}

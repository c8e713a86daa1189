//! Capability catalog types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Whether a capability is a chain tool or a collaborating agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    #[default]
    Tool,
    Agent,
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityKind::Tool => write!(f, "tool"),
            CapabilityKind::Agent => write!(f, "agent"),
        }
    }
}

/// A registered, named unit of work.
///
/// Catalog entries are configuration: they are created at registry bootstrap
/// and only change through [`Capability::enhance`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: CapabilityKind,
    #[serde(default)]
    pub expertise_tags: BTreeSet<String>,
    /// Self-reported reliability in [0, 1]
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_latency")]
    pub typical_latency_ms: u64,
    #[serde(default)]
    pub specializations: BTreeSet<String>,
    /// Only meaningful for agents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<CapabilityPersonality>,
}

fn default_confidence() -> f64 {
    0.7
}

fn default_latency() -> u64 {
    1000
}

/// Weight given to the previous value when folding in observed performance
const ENHANCE_RETENTION: f64 = 0.8;

impl Capability {
    pub fn new(id: impl Into<String>, kind: CapabilityKind) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            description: String::new(),
            kind,
            expertise_tags: BTreeSet::new(),
            confidence: default_confidence(),
            typical_latency_ms: default_latency(),
            specializations: BTreeSet::new(),
            personality: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expertise_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_personality(mut self, personality: CapabilityPersonality) -> Self {
        self.personality = Some(personality);
        self
    }

    pub fn is_elite(&self) -> bool {
        self.personality
            .as_ref()
            .is_some_and(|p| p.expertise_level == ExpertiseLevel::Elite)
    }

    /// Fold feedback into this entry: new tags are appended, confidence and
    /// latency move a fifth of the way toward the observed values.
    pub fn enhance(&mut self, feedback: &CapabilityFeedback) {
        let tags = feedback
            .new_tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());
        self.expertise_tags.extend(tags);

        if let Some(observed) = feedback.observed_confidence {
            let blended = ENHANCE_RETENTION * self.confidence + (1.0 - ENHANCE_RETENTION) * observed;
            self.confidence = blended.clamp(0.0, 1.0);
        }

        if let Some(observed) = feedback.observed_latency_ms {
            let blended = ENHANCE_RETENTION * self.typical_latency_ms as f64
                + (1.0 - ENHANCE_RETENTION) * observed as f64;
            self.typical_latency_ms = blended.round() as u64;
        }
    }
}

/// Recent-performance feedback for [`Capability::enhance`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilityFeedback {
    #[serde(default)]
    pub new_tags: Vec<String>,
    #[serde(default)]
    pub observed_confidence: Option<f64>,
    #[serde(default)]
    pub observed_latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationStyle {
    #[default]
    Formal,
    Casual,
    Technical,
    Executive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExpertiseLevel {
    Junior,
    #[default]
    Senior,
    Expert,
    Elite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DecisionMode {
    #[default]
    Analytical,
    Intuitive,
    DataDriven,
    Strategic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskTolerance {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

/// How an agent phrases its output. Never used for selection scoring
/// except through the elite bonus on [`ExpertiseLevel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CapabilityPersonality {
    #[serde(default)]
    pub communication_style: CommunicationStyle,
    #[serde(default)]
    pub expertise_level: ExpertiseLevel,
    #[serde(default)]
    pub decision_mode: DecisionMode,
    #[serde(default)]
    pub risk_tolerance: RiskTolerance,
}

impl CapabilityPersonality {
    /// Render a recommendation line in this personality's voice
    pub fn phrase(&self, text: &str) -> String {
        let text = text.trim();
        let body = match self.communication_style {
            CommunicationStyle::Executive => format!("Bottom line: {}", text),
            CommunicationStyle::Technical => format!("Technical assessment: {}", text),
            CommunicationStyle::Formal => format!("After careful review, the recommendation is: {}", text),
            CommunicationStyle::Casual => text.to_string(),
        };

        match self.risk_tolerance {
            RiskTolerance::Conservative => format!("{} (conservative view)", body),
            RiskTolerance::Aggressive => format!("{} (growth-oriented view)", body),
            RiskTolerance::Moderate => body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enhance_blends_toward_observed() {
        let mut cap = Capability::new("valuation", CapabilityKind::Tool).with_confidence(0.5);
        cap.typical_latency_ms = 1000;

        cap.enhance(&CapabilityFeedback {
            new_tags: vec!["Appraisal".to_string(), "".to_string()],
            observed_confidence: Some(1.0),
            observed_latency_ms: Some(2000),
        });

        assert!((cap.confidence - 0.6).abs() < 1e-9);
        assert_eq!(cap.typical_latency_ms, 1200);
        assert!(cap.expertise_tags.contains("appraisal"));
        assert_eq!(cap.expertise_tags.len(), 1);
    }

    #[test]
    fn test_enhance_keeps_confidence_in_range() {
        let mut cap = Capability::new("a", CapabilityKind::Agent).with_confidence(1.0);
        cap.enhance(&CapabilityFeedback {
            observed_confidence: Some(7.0),
            ..Default::default()
        });
        assert!(cap.confidence <= 1.0);
    }

    #[test]
    fn test_phrase_by_style() {
        let exec = CapabilityPersonality {
            communication_style: CommunicationStyle::Executive,
            ..Default::default()
        };
        assert_eq!(exec.phrase("buy"), "Bottom line: buy");

        let cautious = CapabilityPersonality {
            communication_style: CommunicationStyle::Casual,
            risk_tolerance: RiskTolerance::Conservative,
            ..Default::default()
        };
        assert_eq!(cautious.phrase("pass"), "pass (conservative view)");
    }

    #[test]
    fn test_is_elite() {
        let elite = Capability::new("x", CapabilityKind::Agent).with_personality(CapabilityPersonality {
            expertise_level: ExpertiseLevel::Elite,
            ..Default::default()
        });
        assert!(elite.is_elite());
        assert!(!Capability::new("y", CapabilityKind::Agent).is_elite());
    }
}

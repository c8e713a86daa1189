//! Synthesized analysis output

use serde::{Deserialize, Serialize};

/// Consensus view reduced from several independent contributions.
///
/// Always recomputed from the underlying outcomes; nothing holds on to one
/// of these as mutable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedAnalysis {
    pub executive_summary: String,
    pub key_findings: Vec<String>,
    pub risks: Vec<String>,
    pub opportunities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consensus_recommendation: Option<String>,
    pub conflicting_views: Vec<String>,
    pub confidence_level: f64,
}

impl Default for SynthesizedAnalysis {
    fn default() -> Self {
        Self {
            executive_summary: String::new(),
            key_findings: Vec::new(),
            risks: Vec::new(),
            opportunities: Vec::new(),
            consensus_recommendation: None,
            conflicting_views: Vec::new(),
            confidence_level: NEUTRAL_CONFIDENCE,
        }
    }
}

/// Confidence reported when no contributor produced a usable result
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Action chosen when contributors split evenly
pub const TIE_BREAK_ACTION: &str = "investigate";

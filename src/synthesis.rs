//! Result synthesizer
//!
//! Reduces independent contributions (agent outcomes or chain step records)
//! into one [`SynthesizedAnalysis`]. Contributor outputs are read by field
//! convention:
//!
//! - `recommendation`: a discrete action string, or an object with `action`
//!   and an optional `summary`/`reasoning`
//! - `action`: discrete action when there is no `recommendation`
//! - `risk_factors` / `risks`, `opportunities`: strings or `{description}` objects
//! - `risk_score`: numeric risk estimate used for divergence detection
//! - `confidence`: number in [0, 1]

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::config::EngineSettings;
use crate::domain::{
    AgentOutcome, SynthesizedAnalysis, ToolExecutionRecord, NEUTRAL_CONFIDENCE, TIE_BREAK_ACTION,
};

/// Borrowed view over one contributor's result
#[derive(Debug, Clone, Copy)]
pub struct Contribution<'a> {
    pub contributor: &'a str,
    pub output: Option<&'a Map<String, Value>>,
    pub confidence: Option<f64>,
    pub failed: bool,
}

impl<'a> Contribution<'a> {
    pub fn from_outcome(outcome: &'a AgentOutcome) -> Self {
        Self {
            contributor: &outcome.capability_id,
            output: outcome.output.as_ref(),
            confidence: Some(outcome.confidence),
            failed: !outcome.succeeded(),
        }
    }

    /// Step records only contribute a confidence when their output carries one
    pub fn from_record(record: &'a ToolExecutionRecord) -> Self {
        let output = record.output.as_ref();
        Self {
            contributor: &record.tool_name,
            output,
            confidence: output.and_then(output_confidence),
            failed: !record.success,
        }
    }

    fn succeeded(&self) -> bool {
        !self.failed && self.output.is_some()
    }
}

/// Confidence field of an output, if present and within [0, 1]
pub fn output_confidence(output: &Map<String, Value>) -> Option<f64> {
    output
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| (0.0..=1.0).contains(c))
}

#[derive(Debug, Clone)]
pub struct ResultSynthesizer {
    risk_limit: usize,
    opportunity_limit: usize,
    divergence_threshold: f64,
}

impl ResultSynthesizer {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            risk_limit: settings.risk_limit,
            opportunity_limit: settings.opportunity_limit,
            divergence_threshold: settings.risk_divergence_threshold,
        }
    }

    pub fn synthesize_outcomes(&self, outcomes: &[&AgentOutcome]) -> SynthesizedAnalysis {
        let contributions: Vec<_> = outcomes.iter().map(|o| Contribution::from_outcome(o)).collect();
        self.synthesize(&contributions)
    }

    pub fn synthesize_executions(&self, records: &[ToolExecutionRecord]) -> SynthesizedAnalysis {
        let contributions: Vec<_> = records.iter().map(Contribution::from_record).collect();
        self.synthesize(&contributions)
    }

    pub fn synthesize(&self, contributions: &[Contribution<'_>]) -> SynthesizedAnalysis {
        let succeeded: Vec<&Contribution<'_>> =
            contributions.iter().filter(|c| c.succeeded()).collect();

        let mut key_findings = Vec::new();
        let mut actions: Vec<(&str, String)> = Vec::new();
        let mut risk_scores: Vec<(&str, f64)> = Vec::new();
        let mut risks = Deduped::new(self.risk_limit);
        let mut opportunities = Deduped::new(self.opportunity_limit);

        for contribution in &succeeded {
            let Some(output) = contribution.output else {
                continue;
            };

            let action = recommended_action(output);
            if let Some(finding) = key_finding(contribution.contributor, action.as_deref(), output) {
                key_findings.push(finding);
            }
            if let Some(action) = action {
                actions.push((contribution.contributor, action));
            }
            if let Some(score) = risk_score(output) {
                risk_scores.push((contribution.contributor, score));
            }

            for field in ["risk_factors", "risks"] {
                risks.extend(output.get(field));
            }
            opportunities.extend(output.get("opportunities"));
        }

        let consensus_recommendation = consensus(&actions);
        let conflicting_views = self.conflicts(&actions, &risk_scores);
        let confidence_level = mean_confidence(&succeeded);

        let executive_summary = match (&consensus_recommendation, contributions.len()) {
            (_, 0) => "No contributors were run.".to_string(),
            (Some(action), total) => format!(
                "{} of {} contributors produced a result; consensus recommendation: {}.",
                succeeded.len(),
                total,
                action
            ),
            (None, total) => format!(
                "{} of {} contributors produced a result.",
                succeeded.len(),
                total
            ),
        };

        SynthesizedAnalysis {
            executive_summary,
            key_findings,
            risks: risks.into_items(),
            opportunities: opportunities.into_items(),
            consensus_recommendation,
            conflicting_views,
            confidence_level,
        }
    }

    fn conflicts(&self, actions: &[(&str, String)], risk_scores: &[(&str, f64)]) -> Vec<String> {
        let mut views = Vec::new();

        let distinct: HashSet<&str> = actions.iter().map(|(_, a)| a.as_str()).collect();
        if distinct.len() > 1 {
            let positions: Vec<String> = actions
                .iter()
                .map(|(who, action)| format!("{} recommends {}", who, action))
                .collect();
            views.push(format!(
                "Contributors disagree on the recommended action: {}",
                positions.join("; ")
            ));
        }

        if risk_scores.len() > 1 {
            let min = risk_scores.iter().map(|(_, s)| *s).fold(f64::INFINITY, f64::min);
            let max = risk_scores.iter().map(|(_, s)| *s).fold(f64::NEG_INFINITY, f64::max);
            if max - min > self.divergence_threshold {
                let estimates: Vec<String> = risk_scores
                    .iter()
                    .map(|(who, score)| format!("{}={}", who, score))
                    .collect();
                views.push(format!(
                    "Risk estimates diverge by {:.1} points: {}",
                    max - min,
                    estimates.join(", ")
                ));
            }
        }

        views
    }
}

impl Default for ResultSynthesizer {
    fn default() -> Self {
        Self::new(&EngineSettings::default())
    }
}

/// Plurality vote; an exact tie for first place defers to `investigate`
fn consensus(actions: &[(&str, String)]) -> Option<String> {
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for (_, action) in actions {
        match tally.iter_mut().find(|(a, _)| *a == action.as_str()) {
            Some((_, count)) => *count += 1,
            None => tally.push((action.as_str(), 1)),
        }
    }

    let top = tally.iter().map(|(_, c)| *c).max()?;
    let leaders: Vec<&str> = tally
        .iter()
        .filter(|(_, c)| *c == top)
        .map(|(a, _)| *a)
        .collect();

    if leaders.len() == 1 {
        Some(leaders[0].to_string())
    } else {
        Some(TIE_BREAK_ACTION.to_string())
    }
}

/// Mean over successful contributors that report a confidence
fn mean_confidence(succeeded: &[&Contribution<'_>]) -> f64 {
    let values: Vec<f64> = succeeded.iter().filter_map(|c| c.confidence).collect();
    if values.is_empty() {
        return NEUTRAL_CONFIDENCE;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    mean.clamp(0.0, 1.0)
}

/// Lower-cased discrete action a contributor recommends, if any
pub fn recommended_action(output: &Map<String, Value>) -> Option<String> {
    let raw = match output.get("recommendation") {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Object(obj)) => obj.get("action").and_then(Value::as_str),
        _ => None,
    }
    .or_else(|| output.get("action").and_then(Value::as_str))?;

    let normalized = raw.trim().to_lowercase();
    (!normalized.is_empty()).then_some(normalized)
}

fn key_finding(contributor: &str, action: Option<&str>, output: &Map<String, Value>) -> Option<String> {
    let detail = output
        .get("recommendation")
        .and_then(Value::as_object)
        .and_then(|rec| rec.get("summary").or_else(|| rec.get("reasoning")))
        .or_else(|| output.get("summary"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty());

    match (action, detail) {
        (Some(action), Some(detail)) => Some(format!("{}: {} ({})", contributor, action, detail)),
        (Some(action), None) => Some(format!("{}: {}", contributor, action)),
        (None, Some(detail)) => Some(format!("{}: {}", contributor, detail)),
        (None, None) => None,
    }
}

fn risk_score(output: &Map<String, Value>) -> Option<f64> {
    output
        .get("risk_score")
        .or_else(|| {
            output
                .get("recommendation")
                .and_then(Value::as_object)
                .and_then(|rec| rec.get("risk_score"))
        })
        .and_then(Value::as_f64)
}

/// Order-preserving, case-insensitive dedup with a hard cap
struct Deduped {
    limit: usize,
    seen: HashSet<String>,
    items: Vec<String>,
}

impl Deduped {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            seen: HashSet::new(),
            items: Vec::new(),
        }
    }

    fn extend(&mut self, field: Option<&Value>) {
        let Some(Value::Array(entries)) = field else {
            return;
        };
        for entry in entries {
            if self.items.len() >= self.limit {
                return;
            }
            let text = match entry {
                Value::String(s) => Some(s.as_str()),
                Value::Object(obj) => ["description", "factor", "name"]
                    .iter()
                    .find_map(|k| obj.get(*k).and_then(Value::as_str)),
                _ => None,
            };
            if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
                if self.seen.insert(text.to_lowercase()) {
                    self.items.push(text.to_string());
                }
            }
        }
    }

    fn into_items(self) -> Vec<String> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok(id: &str, confidence: f64, output: Value) -> AgentOutcome {
        AgentOutcome {
            capability_id: id.to_string(),
            output: output.as_object().cloned(),
            confidence,
            duration_ms: 5,
            error: None,
        }
    }

    fn failed(id: &str) -> AgentOutcome {
        AgentOutcome {
            capability_id: id.to_string(),
            output: None,
            confidence: 0.0,
            duration_ms: 5,
            error: Some("provider unavailable".to_string()),
        }
    }

    #[test]
    fn test_tie_resolves_to_investigate() {
        let outcomes = vec![
            ok("a", 0.8, json!({"recommendation": "buy"})),
            ok("b", 0.8, json!({"recommendation": "BUY"})),
            ok("c", 0.8, json!({"recommendation": {"action": "pass"}})),
            ok("d", 0.8, json!({"action": "pass"})),
        ];
        let refs: Vec<_> = outcomes.iter().collect();
        let analysis = ResultSynthesizer::default().synthesize_outcomes(&refs);

        assert_eq!(analysis.consensus_recommendation.as_deref(), Some("investigate"));
        assert_eq!(analysis.conflicting_views.len(), 1);
        assert!(analysis.conflicting_views[0].contains("c recommends pass"));
    }

    #[test]
    fn test_majority_wins() {
        let outcomes = vec![
            ok("a", 0.7, json!({"recommendation": "buy"})),
            ok("b", 0.7, json!({"recommendation": "buy"})),
            ok("c", 0.7, json!({"recommendation": "pass"})),
        ];
        let refs: Vec<_> = outcomes.iter().collect();
        let analysis = ResultSynthesizer::default().synthesize_outcomes(&refs);
        assert_eq!(analysis.consensus_recommendation.as_deref(), Some("buy"));
    }

    #[test]
    fn test_confidence_excludes_failures() {
        let outcomes = vec![
            ok("a", 0.9, json!({"recommendation": "buy"})),
            ok("b", 0.8, json!({"recommendation": "buy"})),
            failed("c"),
        ];
        let refs: Vec<_> = outcomes.iter().collect();
        let analysis = ResultSynthesizer::default().synthesize_outcomes(&refs);

        assert!((analysis.confidence_level - 0.85).abs() < 1e-9);
        assert_eq!(
            analysis.executive_summary,
            "2 of 3 contributors produced a result; consensus recommendation: buy."
        );
    }

    #[test]
    fn test_all_failed_is_neutral() {
        let outcomes = vec![failed("a"), failed("b")];
        let refs: Vec<_> = outcomes.iter().collect();
        let analysis = ResultSynthesizer::default().synthesize_outcomes(&refs);

        assert_eq!(analysis.confidence_level, 0.5);
        assert!(analysis.consensus_recommendation.is_none());
        assert!(analysis.key_findings.is_empty());
        assert_eq!(analysis.executive_summary, "0 of 2 contributors produced a result.");
    }

    #[test]
    fn test_risks_deduplicated_and_capped() {
        let outcomes = vec![
            ok("a", 0.8, json!({"risk_factors": ["Flood zone", "Vacancy", {"description": "Deferred maintenance"}]})),
            ok("b", 0.8, json!({"risks": ["flood zone", "Rate exposure"], "opportunities": ["Value-add", "value-add"]})),
        ];
        let refs: Vec<_> = outcomes.iter().collect();
        let analysis = ResultSynthesizer::default().synthesize_outcomes(&refs);

        assert_eq!(
            analysis.risks,
            vec!["Flood zone", "Vacancy", "Deferred maintenance"]
        );
        assert_eq!(analysis.opportunities, vec!["Value-add"]);
    }

    #[test]
    fn test_risk_score_divergence() {
        let outcomes = vec![
            ok("a", 0.8, json!({"recommendation": "buy", "risk_score": 20})),
            ok("b", 0.8, json!({"recommendation": "buy", "risk_score": 75})),
        ];
        let refs: Vec<_> = outcomes.iter().collect();
        let analysis = ResultSynthesizer::default().synthesize_outcomes(&refs);

        assert_eq!(analysis.conflicting_views.len(), 1);
        assert!(analysis.conflicting_views[0].starts_with("Risk estimates diverge by 55.0 points"));
    }

    #[test]
    fn test_close_risk_scores_are_not_a_conflict() {
        let outcomes = vec![
            ok("a", 0.8, json!({"recommendation": "buy", "risk_score": 40})),
            ok("b", 0.8, json!({"recommendation": "buy", "risk_score": 45})),
        ];
        let refs: Vec<_> = outcomes.iter().collect();
        let analysis = ResultSynthesizer::default().synthesize_outcomes(&refs);
        assert!(analysis.conflicting_views.is_empty());
    }

    #[test]
    fn test_key_findings_in_contribution_order() {
        let outcomes = vec![
            ok("b", 0.8, json!({"recommendation": {"action": "pass", "summary": "Cap rate too thin"}})),
            ok("a", 0.8, json!({"summary": "Comparable sales support the ask"})),
            ok("c", 0.8, json!({"unrelated": true})),
        ];
        let refs: Vec<_> = outcomes.iter().collect();
        let analysis = ResultSynthesizer::default().synthesize_outcomes(&refs);

        assert_eq!(
            analysis.key_findings,
            vec![
                "b: pass (Cap rate too thin)".to_string(),
                "a: Comparable sales support the ask".to_string(),
            ]
        );
    }

    #[test]
    fn test_step_records_without_confidence_use_neutral() {
        let record = ToolExecutionRecord {
            chain_id: "c".into(),
            step_index: 0,
            tool_name: "search".into(),
            input_snapshot: Map::new(),
            output: json!({"listings": []}).as_object().cloned(),
            duration_ms: 1,
            success: true,
            error: None,
        };
        let analysis = ResultSynthesizer::default().synthesize_executions(&[record]);
        assert_eq!(analysis.confidence_level, 0.5);
        assert_eq!(analysis.executive_summary, "1 of 1 contributors produced a result.");
    }
}

//! Chain definition and execution record types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

use super::analysis::SynthesizedAnalysis;
use super::context::ExecutionContext;
use crate::error::OrchestrationError;

/// Category a chain is filed under; drives keyword scoring in the recommender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChainCategory {
    #[default]
    Analysis,
    Research,
    Reporting,
    Automation,
}

impl ChainCategory {
    /// Free-text keywords that suggest this category
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            ChainCategory::Analysis => &["analyze", "analyse", "analysis", "underwrite"],
            ChainCategory::Research => &["research", "market"],
            ChainCategory::Reporting => &["report", "summary"],
            ChainCategory::Automation => &["find", "opportunity"],
        }
    }
}

impl std::fmt::Display for ChainCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainCategory::Analysis => write!(f, "analysis"),
            ChainCategory::Research => write!(f, "research"),
            ChainCategory::Reporting => write!(f, "reporting"),
            ChainCategory::Automation => write!(f, "automation"),
        }
    }
}

/// Comparison operators understood by the condition interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    Exists,
    NotExists,
    Truthy,
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
}

/// A single `(key, operator, literal)` predicate over the context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dotted path into the execution context
    pub key: String,
    pub op: ConditionOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Closed condition language: predicates combined with `all` / `any`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionExpr {
    All { all: Vec<ConditionExpr> },
    Any { any: Vec<ConditionExpr> },
    Predicate(Condition),
}

impl ConditionExpr {
    pub fn predicate(key: impl Into<String>, op: ConditionOp, value: Option<Value>) -> Self {
        ConditionExpr::Predicate(Condition {
            key: key.into(),
            op,
            value,
        })
    }
}

/// One step of a [`ToolChain`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolStep {
    /// Capability id to invoke
    pub tool_name: String,
    /// Explicit position; when used, every step of the chain must carry one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Merged over the current context; string values may be Tera templates
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionExpr>,
    /// `source key in output -> destination key in context`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_mapping: Option<BTreeMap<String, String>>,
    /// A failure of this step aborts the rest of the chain
    #[serde(default)]
    pub critical: bool,
}

impl ToolStep {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            index: None,
            parameters: Map::new(),
            condition: None,
            output_mapping: None,
            critical: false,
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_condition(mut self, condition: ConditionExpr) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_mapping(mut self, source: impl Into<String>, dest: impl Into<String>) -> Self {
        self.output_mapping
            .get_or_insert_with(BTreeMap::new)
            .insert(source.into(), dest.into());
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}

/// A named, ordered sequence of steps sharing one execution context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolChain {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<ToolStep>,
    #[serde(default)]
    pub trigger_phrases: Vec<String>,
    #[serde(default)]
    pub category: ChainCategory,
}

impl ToolChain {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: ChainCategory) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            steps: Vec::new(),
            trigger_phrases: Vec::new(),
            category,
        }
    }

    pub fn with_step(mut self, step: ToolStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_triggers<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trigger_phrases.extend(phrases.into_iter().map(Into::into));
        self
    }

    /// Check the definition and put explicitly indexed steps in order.
    ///
    /// Rejects empty step lists, duplicate indices and chains that index
    /// only some of their steps.
    pub fn normalize(&mut self) -> Result<(), OrchestrationError> {
        let malformed = |reason: String| OrchestrationError::MalformedChain {
            chain: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(malformed("chain id is empty".to_string()));
        }
        if self.steps.is_empty() {
            return Err(malformed("chain has no steps".to_string()));
        }
        if let Some(pos) = self.steps.iter().position(|s| s.tool_name.trim().is_empty()) {
            return Err(malformed(format!("step {} has an empty tool name", pos)));
        }

        let indexed = self.steps.iter().filter(|s| s.index.is_some()).count();
        if indexed == 0 {
            return Ok(());
        }
        if indexed != self.steps.len() {
            return Err(malformed(
                "either every step declares an index or none does".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if let Some(index) = step.index {
                if !seen.insert(index) {
                    return Err(malformed(format!("duplicate step index {}", index)));
                }
            }
        }

        self.steps.sort_by_key(|s| s.index);
        Ok(())
    }

    pub fn summary(&self) -> ChainSummary {
        ChainSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category,
            step_count: self.steps.len(),
            trigger_phrases: self.trigger_phrases.clone(),
        }
    }
}

/// Listing entry returned by `get_available_chains`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: ChainCategory,
    pub step_count: usize,
    pub trigger_phrases: Vec<String>,
}

/// One attempted step. Steps skipped by their condition never get a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecutionRecord {
    pub chain_id: String,
    pub step_index: usize,
    pub tool_name: String,
    pub input_snapshot: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Map<String, Value>>,
    pub duration_ms: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Where and why a critical step stopped the chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbortInfo {
    pub step_index: usize,
    pub tool_name: String,
    pub error: String,
}

/// Outcome of running one chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub chain_id: String,
    /// True iff every emitted record succeeded
    pub overall_success: bool,
    pub executions: Vec<ToolExecutionRecord>,
    pub final_context: ExecutionContext,
    pub total_duration_ms: u64,
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<AbortInfo>,
    pub analysis: SynthesizedAnalysis,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_rejects_empty_chain() {
        let mut chain = ToolChain::new("empty", "Empty", ChainCategory::Analysis);
        let err = chain.normalize().unwrap_err();
        assert!(matches!(err, OrchestrationError::MalformedChain { .. }));
    }

    #[test]
    fn test_normalize_orders_by_index() {
        let mut first = ToolStep::new("a");
        first.index = Some(2);
        let mut second = ToolStep::new("b");
        second.index = Some(1);

        let mut chain = ToolChain::new("c", "C", ChainCategory::Research)
            .with_step(first)
            .with_step(second);
        chain.normalize().unwrap();

        let order: Vec<_> = chain.steps.iter().map(|s| s.tool_name.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn test_normalize_rejects_duplicate_index() {
        let mut a = ToolStep::new("a");
        a.index = Some(0);
        let mut b = ToolStep::new("b");
        b.index = Some(0);

        let mut chain = ToolChain::new("dup", "Dup", ChainCategory::Reporting)
            .with_step(a)
            .with_step(b);
        let err = chain.normalize().unwrap_err().to_string();
        assert!(err.contains("duplicate step index 0"));
    }

    #[test]
    fn test_normalize_rejects_partial_indexing() {
        let mut a = ToolStep::new("a");
        a.index = Some(0);
        let mut chain = ToolChain::new("mix", "Mix", ChainCategory::Reporting)
            .with_step(a)
            .with_step(ToolStep::new("b"));
        assert!(chain.normalize().is_err());
    }

    #[test]
    fn test_step_deserializes_from_yaml() {
        let yaml = r#"
tool_name: risk_assessment
critical: true
parameters:
  horizon_years: 5
condition:
  key: valuation.estimate
  op: gt
  value: 100000
output_mapping:
  risk_score: risk.score
"#;
        let step: ToolStep = serde_yaml::from_str(yaml).unwrap();
        assert!(step.critical);
        assert_eq!(step.parameters.get("horizon_years"), Some(&json!(5)));
        assert_eq!(
            step.condition,
            Some(ConditionExpr::predicate(
                "valuation.estimate",
                ConditionOp::Gt,
                Some(json!(100000))
            ))
        );
        assert_eq!(
            step.output_mapping.unwrap().get("risk_score"),
            Some(&"risk.score".to_string())
        );
    }

    #[test]
    fn test_condition_combinators_deserialize() {
        let expr: ConditionExpr = serde_json::from_value(json!({
            "any": [
                {"key": "a", "op": "exists"},
                {"all": [{"key": "b", "op": "eq", "value": 1}]}
            ]
        }))
        .unwrap();
        match expr {
            ConditionExpr::Any { any } => {
                assert_eq!(any.len(), 2);
                assert!(matches!(any[1], ConditionExpr::All { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

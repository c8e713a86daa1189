//! Condition interpreter
//!
//! Evaluates the closed `(key, operator, literal)` language against the live
//! execution context. There is no expression evaluation beyond this.

use serde_json::Value;

use crate::domain::{Condition, ConditionExpr, ConditionOp, ExecutionContext};

impl ConditionExpr {
    pub fn evaluate(&self, context: &ExecutionContext) -> bool {
        match self {
            ConditionExpr::All { all } => all.iter().all(|c| c.evaluate(context)),
            ConditionExpr::Any { any } => any.iter().any(|c| c.evaluate(context)),
            ConditionExpr::Predicate(condition) => condition.evaluate(context),
        }
    }
}

impl Condition {
    pub fn evaluate(&self, context: &ExecutionContext) -> bool {
        let actual = context.lookup(&self.key);

        match self.op {
            ConditionOp::Exists => actual.is_some_and(|v| !v.is_null()),
            ConditionOp::NotExists => actual.map_or(true, Value::is_null),
            ConditionOp::Truthy => actual.is_some_and(is_truthy),
            _ => {
                let (Some(actual), Some(expected)) = (actual, self.value.as_ref()) else {
                    return false;
                };
                compare(self.op, actual, expected)
            }
        }
    }
}

fn compare(op: ConditionOp, actual: &Value, expected: &Value) -> bool {
    match op {
        ConditionOp::Eq => loosely_equal(actual, expected),
        ConditionOp::Ne => !loosely_equal(actual, expected),
        ConditionOp::Gt => numeric(actual, expected).is_some_and(|(a, b)| a > b),
        ConditionOp::Gte => numeric(actual, expected).is_some_and(|(a, b)| a >= b),
        ConditionOp::Lt => numeric(actual, expected).is_some_and(|(a, b)| a < b),
        ConditionOp::Lte => numeric(actual, expected).is_some_and(|(a, b)| a <= b),
        ConditionOp::Contains => match (actual, expected) {
            (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
            (Value::Array(items), needle) => items.iter().any(|item| loosely_equal(item, needle)),
            _ => false,
        },
        ConditionOp::Exists | ConditionOp::NotExists | ConditionOp::Truthy => false,
    }
}

/// Numbers compare by value regardless of integer/float representation
fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Both sides as numbers; numeric strings are accepted on either side
fn numeric(a: &Value, b: &Value) -> Option<(f64, f64)> {
    Some((as_number(a)?, as_number(b)?))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "false",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

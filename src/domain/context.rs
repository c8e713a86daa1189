//! Execution context threaded through chain steps

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered key/value accumulator.
///
/// Steps may add keys or overwrite existing ones, but there is
/// no removal API: a later step always sees the caller's input plus every
/// prior successful contribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionContext(Map<String, Value>);

impl ExecutionContext {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Build a context from an arbitrary JSON value. Objects are taken as-is;
    /// any other value is stored under `input`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            Value::Null => Self::new(),
            other => {
                let mut map = Map::new();
                map.insert("input".to_string(), other);
                Self(map)
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Resolve a dotted path such as `valuation.estimate` or `comps.0.price`
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.0, path)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Merge every entry of `output`, overwriting on collision
    pub fn merge(&mut self, output: &Map<String, Value>) {
        for (key, value) in output {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ExecutionContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Walk a dotted path through nested objects and arrays
pub fn lookup_path<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(direct) = map.get(path) {
        return Some(direct);
    }

    let mut segments = path.split('.');
    let mut current = map.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(obj) => obj.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested_paths() {
        let ctx = ExecutionContext::from_value(json!({
            "valuation": {"estimate": 410000},
            "comps": [{"price": 1}, {"price": 2}],
            "flat.key": true
        }));

        assert_eq!(ctx.lookup("valuation.estimate"), Some(&json!(410000)));
        assert_eq!(ctx.lookup("comps.1.price"), Some(&json!(2)));
        assert_eq!(ctx.lookup("flat.key"), Some(&json!(true)));
        assert_eq!(ctx.lookup("valuation.missing"), None);
        assert_eq!(ctx.lookup("comps.9.price"), None);
    }

    #[test]
    fn test_merge_overwrites_but_keeps_keys() {
        let mut ctx = ExecutionContext::from_value(json!({"a": 1, "b": 2}));
        let output = json!({"b": 3, "c": 4});
        ctx.merge(output.as_object().unwrap());

        assert_eq!(ctx.get("a"), Some(&json!(1)));
        assert_eq!(ctx.get("b"), Some(&json!(3)));
        assert_eq!(ctx.get("c"), Some(&json!(4)));
        assert_eq!(ctx.keys().cloned().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_from_scalar_value() {
        let ctx = ExecutionContext::from_value(json!("hello"));
        assert_eq!(ctx.get("input"), Some(&json!("hello")));
        assert!(ExecutionContext::from_value(Value::Null).is_empty());
    }
}

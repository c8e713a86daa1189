//! Tera rendering over JSON values
//!
//! Strings containing `{{` or `{%` are templates. A template that is exactly
//! one `{{ path }}` expression takes the value at that path unchanged, so
//! numbers, objects and strings keep their type. Anything else renders to a
//! string and stays a string.

use serde_json::{Map, Value};
use tera::{Context, Tera};

use crate::domain::lookup_path;
use crate::error::CapabilityResult;

pub fn is_template(s: &str) -> bool {
    s.contains("{{") || s.contains("{%")
}

/// Whether any string inside `value` is a template
pub fn contains_template(value: &Value) -> bool {
    match value {
        Value::String(s) => is_template(s),
        Value::Array(items) => items.iter().any(contains_template),
        Value::Object(obj) => obj.values().any(contains_template),
        _ => false,
    }
}

/// Render every template inside `value` against `source`
pub fn render(value: &Value, source: &Map<String, Value>) -> CapabilityResult<Value> {
    if !contains_template(value) {
        return Ok(value.clone());
    }
    let context = Context::from_value(Value::Object(source.clone()))?;
    render_with(value, source, &context)
}

fn render_with(value: &Value, source: &Map<String, Value>, context: &Context) -> CapabilityResult<Value> {
    match value {
        Value::String(s) if is_template(s) => {
            if let Some(found) = single_path(s).and_then(|path| lookup_path(source, path)) {
                return Ok(found.clone());
            }
            Ok(Value::String(Tera::one_off(s, context, false)?))
        }
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|v| render_with(v, source, context))
                .collect::<CapabilityResult<_>>()?,
        )),
        Value::Object(obj) => Ok(Value::Object(
            obj.iter()
                .map(|(k, v)| -> CapabilityResult<(String, Value)> {
                    Ok((k.clone(), render_with(v, source, context)?))
                })
                .collect::<CapabilityResult<_>>()?,
        )),
        other => Ok(other.clone()),
    }
}

/// `a.b.c` when `s` is exactly `{{ a.b.c }}`
fn single_path(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("{{")?.strip_suffix("}}")?.trim();
    let is_path = !inner.is_empty()
        && inner
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    is_path.then_some(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_single_expression_keeps_type() {
        let ctx = source(json!({
            "propertyId": "12345",
            "flag": "true",
            "code": "null",
            "price": 310000,
            "property": {"zip": 40202}
        }));

        assert_eq!(render(&json!("{{ propertyId }}"), &ctx).unwrap(), json!("12345"));
        assert_eq!(render(&json!("{{ flag }}"), &ctx).unwrap(), json!("true"));
        assert_eq!(render(&json!("{{code}}"), &ctx).unwrap(), json!("null"));
        assert_eq!(render(&json!("{{ price }}"), &ctx).unwrap(), json!(310000));
        assert_eq!(render(&json!("{{ property }}"), &ctx).unwrap(), json!({"zip": 40202}));
    }

    #[test]
    fn test_rendered_text_stays_a_string() {
        let ctx = source(json!({"propertyId": "12345", "base": 2}));

        assert_eq!(render(&json!("{{ base * 2 }}"), &ctx).unwrap(), json!("4"));
        assert_eq!(render(&json!("id-{{ propertyId }}"), &ctx).unwrap(), json!("id-12345"));
        assert_eq!(render(&json!(" {{ propertyId }}"), &ctx).unwrap(), json!(" 12345"));
    }

    #[test]
    fn test_block_tags_are_rendered() {
        let ctx = source(json!({"urgent": true}));
        let value = json!({"priority": "{% if urgent %}high{% else %}normal{% endif %}"});
        assert!(contains_template(&value));
        assert_eq!(render(&value, &ctx).unwrap(), json!({"priority": "high"}));
    }

    #[test]
    fn test_missing_variable_fails() {
        let err = render(&json!(["{{ nope }}"]), &Map::new()).unwrap_err();
        assert!(err.to_string().starts_with("template render error"));
    }

    #[test]
    fn test_plain_values_untouched() {
        let value = json!({"radius": 5, "label": "12 Elm St"});
        assert_eq!(render(&value, &Map::new()).unwrap(), value);
    }
}

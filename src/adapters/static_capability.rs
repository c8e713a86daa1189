//! Configuration-backed capability handler
//!
//! Returns a fixed response whose string values are rendered as Tera
//! templates against the call input. Lets chains and agents run without
//! external providers.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::config::CapabilityConfig;
use crate::domain::CapabilityHandler;
use crate::error::{CapabilityError, CapabilityResult};
use crate::template;

pub struct StaticCapability {
    response: Value,
    fail_with: Option<String>,
    simulated_latency: Option<Duration>,
}

impl StaticCapability {
    pub fn new(response: Value) -> Self {
        Self {
            response,
            fail_with: None,
            simulated_latency: None,
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Value::Null,
            fail_with: Some(message.into()),
            simulated_latency: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = Some(latency);
        self
    }

    pub fn from_config(config: &CapabilityConfig) -> Self {
        Self {
            response: config
                .response
                .clone()
                .unwrap_or_else(|| Value::Object(Map::new())),
            fail_with: config.fail_with.clone(),
            simulated_latency: config.simulated_latency_ms.map(Duration::from_millis),
        }
    }
}

#[async_trait]
impl CapabilityHandler for StaticCapability {
    async fn invoke(&self, input: Map<String, Value>) -> CapabilityResult<Map<String, Value>> {
        if let Some(latency) = self.simulated_latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(message) = &self.fail_with {
            return Err(CapabilityError::Execution(message.clone()));
        }

        match template::render(&self.response, &input)? {
            Value::Object(output) => Ok(output),
            other => {
                let mut output = Map::new();
                output.insert("result".to_string(), other);
                Ok(output)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_renders_templates_against_input() {
        let handler = StaticCapability::new(json!({
            "property": {"id": "{{ propertyId }}", "address": "12 Elm St"},
            "estimate": "{{ base * 2 }}",
            "tags": ["{{ propertyId }}-comps"]
        }));

        let output = handler
            .invoke(input(json!({"propertyId": "p1", "base": 150000})))
            .await
            .unwrap();

        assert_eq!(output["property"]["id"], json!("p1"));
        assert_eq!(output["estimate"], json!("300000"));
        assert_eq!(output["tags"], json!(["p1-comps"]));
    }

    #[tokio::test]
    async fn test_string_inputs_keep_their_type() {
        let handler = StaticCapability::new(json!({
            "id": "{{ propertyId }}",
            "code": "{{ code }}",
            "active": "{{ active }}",
            "price": "{{ price }}"
        }));

        let output = handler
            .invoke(input(json!({"propertyId": "12345", "code": "null", "active": "true", "price": 310000})))
            .await
            .unwrap();

        assert_eq!(output["id"], json!("12345"));
        assert_eq!(output["code"], json!("null"));
        assert_eq!(output["active"], json!("true"));
        assert_eq!(output["price"], json!(310000));
    }

    #[tokio::test]
    async fn test_non_object_response_is_wrapped() {
        let handler = StaticCapability::new(json!("done"));
        let output = handler.invoke(Map::new()).await.unwrap();
        assert_eq!(output["result"], json!("done"));
    }

    #[tokio::test]
    async fn test_configured_failure() {
        let handler = StaticCapability::failing("provider offline");
        let err = handler.invoke(Map::new()).await.unwrap_err();
        assert_eq!(err, CapabilityError::Execution("provider offline".to_string()));
    }

    #[tokio::test]
    async fn test_missing_template_variable_fails() {
        let handler = StaticCapability::new(json!({"x": "{{ nope }}"}));
        let err = handler.invoke(Map::new()).await.unwrap_err();
        assert!(err.to_string().starts_with("template render error"));
    }

    #[tokio::test]
    async fn test_from_config() {
        let config: CapabilityConfig = serde_yaml::from_str(
            r#"
id: market_comparables
kind: tool
response:
  median: 322500
simulated_latency_ms: 1
"#,
        )
        .unwrap();
        let handler = StaticCapability::from_config(&config);
        let output = handler.invoke(Map::new()).await.unwrap();
        assert_eq!(output["median"], json!(322500));
    }
}

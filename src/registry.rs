//! Capability registry
//!
//! Static catalog of tools and agents keyed by id. Handlers are fixed once
//! bootstrap is over; catalog metadata only changes through
//! [`CapabilityRegistry::enhance_capability`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::{Capability, CapabilityFeedback, CapabilityHandler, CapabilityKind};
use crate::error::{EngineResult, OrchestrationError};

pub struct CapabilityRegistry {
    /// Catalog entries in registration order (the deterministic tie-break order)
    entries: RwLock<Vec<Capability>>,
    handlers: HashMap<String, Arc<dyn CapabilityHandler>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            handlers: HashMap::new(),
        }
    }

    /// Add or replace a capability. Replacing keeps the original position.
    pub fn register(&mut self, capability: Capability, handler: Arc<dyn CapabilityHandler>) {
        let entries = self.entries.get_mut();
        match entries.iter_mut().find(|c| c.id == capability.id) {
            Some(existing) => {
                tracing::warn!(capability = %capability.id, "Replacing registered capability");
                *existing = capability.clone();
            }
            None => entries.push(capability.clone()),
        }
        self.handlers.insert(capability.id, handler);
    }

    pub fn resolve(&self, id: &str) -> Option<Arc<dyn CapabilityHandler>> {
        self.handlers.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handlers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub async fn get(&self, id: &str) -> Option<Capability> {
        self.entries.read().await.iter().find(|c| c.id == id).cloned()
    }

    /// Copy of the catalog in registration order
    pub async fn snapshot(&self) -> Vec<Capability> {
        self.entries.read().await.clone()
    }

    pub async fn list(&self, kind: CapabilityKind) -> Vec<Capability> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect()
    }

    /// Apply performance feedback to one catalog entry
    pub async fn enhance_capability(
        &self,
        id: &str,
        feedback: &CapabilityFeedback,
    ) -> EngineResult<Capability> {
        let mut entries = self.entries.write().await;
        let capability = entries
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| OrchestrationError::CapabilityNotFound(id.to_string()))?;

        capability.enhance(feedback);
        tracing::info!(
            capability = %id,
            confidence = capability.confidence,
            latency_ms = capability.typical_latency_ms,
            "Capability enhanced"
        );
        Ok(capability.clone())
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CapabilityResult;
    use async_trait::async_trait;
    use serde_json::{Map, Value};

    struct Noop;

    #[async_trait]
    impl CapabilityHandler for Noop {
        async fn invoke(&self, input: Map<String, Value>) -> CapabilityResult<Map<String, Value>> {
            Ok(input)
        }
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Capability::new("search", CapabilityKind::Tool), Arc::new(Noop));
        registry.register(Capability::new("analyst", CapabilityKind::Agent), Arc::new(Noop));

        assert!(registry.resolve("search").is_some());
        assert!(registry.resolve("missing").is_none());
        assert_eq!(registry.list(CapabilityKind::Agent).await.len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_replace_keeps_position() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Capability::new("a", CapabilityKind::Agent), Arc::new(Noop));
        registry.register(Capability::new("b", CapabilityKind::Agent), Arc::new(Noop));
        registry.register(
            Capability::new("a", CapabilityKind::Agent).with_confidence(0.1),
            Arc::new(Noop),
        );

        let ids: Vec<_> = registry.snapshot().await.into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(registry.get("a").await.unwrap().confidence, 0.1);
    }

    #[tokio::test]
    async fn test_enhance_unknown_capability() {
        let registry = CapabilityRegistry::new();
        let err = registry
            .enhance_capability("ghost", &CapabilityFeedback::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::CapabilityNotFound(_)));
    }

    #[tokio::test]
    async fn test_enhance_updates_catalog() {
        let mut registry = CapabilityRegistry::new();
        registry.register(
            Capability::new("a", CapabilityKind::Agent).with_confidence(0.5),
            Arc::new(Noop),
        );

        registry
            .enhance_capability(
                "a",
                &CapabilityFeedback {
                    new_tags: vec!["zoning".into()],
                    observed_confidence: Some(1.0),
                    observed_latency_ms: None,
                },
            )
            .await
            .unwrap();

        let cap = registry.get("a").await.unwrap();
        assert!(cap.expertise_tags.contains("zoning"));
        assert!((cap.confidence - 0.6).abs() < 1e-9);
    }
}

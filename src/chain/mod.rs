//! Tool chains: catalog, condition interpreter, executor and recommender

mod condition;
pub mod executor;
pub mod recommender;

pub use executor::ChainExecutor;
pub use recommender::{ChainRecommender, ScoredChain};

use crate::domain::{ChainSummary, ToolChain};
use crate::error::{EngineResult, OrchestrationError};

/// Validated chain definitions in registration order
#[derive(Debug, Clone, Default)]
pub struct ChainCatalog {
    chains: Vec<ToolChain>,
}

impl ChainCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog, rejecting the first malformed or duplicate definition
    pub fn from_chains(chains: impl IntoIterator<Item = ToolChain>) -> EngineResult<Self> {
        let mut catalog = Self::new();
        for chain in chains {
            catalog.insert(chain)?;
        }
        Ok(catalog)
    }

    /// Validate and add a chain. An existing id is replaced in place.
    pub fn insert(&mut self, mut chain: ToolChain) -> EngineResult<()> {
        chain.normalize()?;
        match self.chains.iter_mut().find(|c| c.id == chain.id) {
            Some(existing) => {
                tracing::warn!(chain = %chain.id, "Replacing registered chain");
                *existing = chain;
            }
            None => {
                tracing::debug!(chain = %chain.id, steps = chain.steps.len(), "Registered chain");
                self.chains.push(chain);
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> EngineResult<&ToolChain> {
        self.chains
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| OrchestrationError::ChainNotFound(id.to_string()))
    }

    pub fn list(&self) -> &[ToolChain] {
        &self.chains
    }

    pub fn summaries(&self) -> Vec<ChainSummary> {
        self.chains.iter().map(ToolChain::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChainCategory, ToolStep};

    #[test]
    fn test_insert_rejects_malformed_chain() {
        let mut catalog = ChainCatalog::new();
        let err = catalog
            .insert(ToolChain::new("empty", "Empty", ChainCategory::Analysis))
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::MalformedChain { .. }));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_replace_keeps_order() {
        let step = || ToolStep::new("t");
        let mut catalog = ChainCatalog::from_chains(vec![
            ToolChain::new("a", "A", ChainCategory::Analysis).with_step(step()),
            ToolChain::new("b", "B", ChainCategory::Research).with_step(step()),
        ])
        .unwrap();

        catalog
            .insert(
                ToolChain::new("a", "A v2", ChainCategory::Analysis)
                    .with_step(step())
                    .with_step(step()),
            )
            .unwrap();

        let summaries = catalog.summaries();
        assert_eq!(summaries[0].name, "A v2");
        assert_eq!(summaries[0].step_count, 2);
        assert_eq!(summaries[1].id, "b");
    }

    #[test]
    fn test_unknown_chain() {
        let catalog = ChainCatalog::new();
        assert!(matches!(
            catalog.get("nope"),
            Err(OrchestrationError::ChainNotFound(_))
        ));
    }
}

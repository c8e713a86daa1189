//! # Sextant - Tool Chain and Multi-Agent Orchestration
//!
//! Sextant runs registered tool chains over a shared execution context,
//! recommends chains for free-text requests, and runs collaborative tasks
//! across a shortlist of agents whose results are synthesized into one
//! analysis.
//!
//! ## Features
//!
//! - **Chains**: conditional steps, parameter templating, output mapping, critical aborts
//! - **Recommendation**: trigger phrases, category keywords and usage history
//! - **Collaboration**: complexity-scaled agent selection with concurrent execution
//! - **Synthesis**: consensus, risks, opportunities and conflicting views
//! - **Decision log**: in-memory, JSON-lines file or tracing audit backends
//! - **Metrics**: Prometheus counters and histograms
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sextant::config::Settings;
//! use sextant::engine::OrchestrationEngine;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::new()?;
//!     let engine = OrchestrationEngine::from_settings(&settings)?;
//!
//!     let result = engine
//!         .run_chain("property_analysis", serde_json::json!({"propertyId": "p1"}))
//!         .await?;
//!     println!("{}", result.recommendations.join("\n"));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Domain**: data types and the ports the core consumes
//! - **Registry / Chain / Collaboration / Synthesis**: the orchestration core
//! - **Adapters**: static capability handlers and metrics
//! - **Memory**: decision log and preference backends
//! - **Config**: configuration loading and validation

pub mod adapters;
pub mod chain;
pub mod cli;
pub mod collaboration;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod memory;
pub mod registry;
pub mod synthesis;
pub mod template;

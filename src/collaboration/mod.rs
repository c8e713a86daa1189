//! Multi-agent collaboration: selection and the task runner

pub mod runner;
pub mod selector;

pub use runner::{CollaborativeRun, CollaborativeTaskRunner};
pub use selector::{AgentScore, AgentSelection, AgentSelector};

//! Error types for the orchestration core

use thiserror::Error;

/// Errors a capability handler may raise.
///
/// These never escape the engine: the chain executor and the collaborative
/// runner convert them into failed execution records / agent outcomes.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CapabilityError {
    /// Requested tool/agent id is absent from the registry
    #[error("capability not found: {0}")]
    NotFound(String),

    /// Handler raised while executing
    #[error("{0}")]
    Execution(String),

    /// Handler gave up after its own deadline
    #[error("capability timed out after {0}ms")]
    Timeout(u64),

    /// Handler was cancelled by its caller
    #[error("capability execution was cancelled")]
    Cancelled,

    /// Handler produced something that is not a key/value map
    #[error("invalid capability output: {0}")]
    InvalidOutput(String),
}

impl From<tera::Error> for CapabilityError {
    fn from(err: tera::Error) -> Self {
        CapabilityError::Execution(format!("template render error: {}", err))
    }
}

/// Errors that can cross the engine boundary.
///
/// Expected runtime failures (missing capabilities, failing handlers, critical
/// aborts) are reported inside results instead; only lookups of unknown
/// chains and malformed static configuration end up here.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// No chain registered under this id
    #[error("Chain not found: {0}")]
    ChainNotFound(String),

    /// No capability registered under this id
    #[error("Capability not found: {0}")]
    CapabilityNotFound(String),

    /// Chain definition rejected at load time
    #[error("Malformed chain '{chain}': {reason}")]
    MalformedChain { chain: String, reason: String },

    /// Collaborative task request rejected
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Decision log or other I/O failure
    #[error("IO error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for OrchestrationError {
    fn from(err: serde_json::Error) -> Self {
        OrchestrationError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for OrchestrationError {
    fn from(err: std::io::Error) -> Self {
        OrchestrationError::Io(err.to_string())
    }
}

/// Result type alias for capability handlers
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, OrchestrationError>;

//! Error types for the perception and behaviour core

use thiserror::Error;

/// Configuration problems found while validating an [`AgentConfig`](crate::config::AgentConfig)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A range that must be positive is not
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f32 },

    /// Near range exceeds far range
    #[error("near range {near} exceeds far range {far}")]
    RangeOrder { near: f32, far: f32 },

    /// A wander path with no steps
    #[error("wander path has no steps")]
    EmptyWanderPath,
}

/// AI errors
#[derive(Debug, Error)]
pub enum AiError {
    /// Invalid configuration
    #[error("Invalid AI configuration: {0}")]
    Config(#[from] ConfigError),

    /// Target description is unusable
    #[error("Invalid target {target}: {reason}")]
    InvalidTarget { target: u64, reason: String },

    /// The observer eye could not be resolved
    #[error("Observer pose unavailable for agent {0}")]
    PoseUnavailable(u64),

    /// Reading a config file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing a config file failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for AI operations
pub type Result<T> = std::result::Result<T, AiError>;

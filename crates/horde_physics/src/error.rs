//! Error types for the occlusion world

use thiserror::Error;

/// Occlusion world errors
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// Collider not found
    #[error("Collider not found: {0:?}")]
    ColliderNotFound(crate::collider::ColliderHandle),

    /// No colliders registered for an owner
    #[error("No colliders registered for owner {0}")]
    OwnerNotFound(u128),

    /// Shape parameters are unusable
    #[error("Invalid collision shape: {0}")]
    InvalidShape(String),
}

/// Result type for occlusion world operations
pub type Result<T> = std::result::Result<T, PhysicsError>;

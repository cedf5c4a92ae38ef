//! Errors a router reports while constructing or tearing down a destination.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ConstructionError {
    #[error("Invalid route configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid route parameter {key}: {reason}")]
    InvalidParameter { key: String, reason: String },

    #[error("Construction failed: {0}")]
    Failed(String),
}

//! Top-level protocol error type.

use thiserror::Error;

use super::{ConstructionError, RegistryError, RouteError};

/// Top-level protocol error type.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Route error: {0}")]
    Route(#[from] RouteError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Construction error: {0}")]
    Construction(#[from] ConstructionError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

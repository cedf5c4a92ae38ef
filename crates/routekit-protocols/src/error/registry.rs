//! Registry consistency errors.
//!
//! These indicate wiring bugs. With consistency checks enabled they abort
//! registration; with checks disabled the registry logs them and keeps the
//! first binding.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("Destination {destination} is exclusively bound to {existing}, cannot bind it to {requested}")]
    ConflictingExclusiveBinding {
        destination: String,
        existing: String,
        requested: String,
    },

    #[error("Service protocol {protocol} is already bound to {existing}, cannot bind it to {requested}")]
    ConflictingServiceProtocol {
        protocol: String,
        existing: String,
        requested: String,
    },

    #[error("Module protocol {protocol} is already bound to {existing}, cannot bind it to {requested}")]
    ConflictingModuleProtocol {
        protocol: String,
        existing: String,
        requested: String,
    },

    #[error("Router id {0} is already used by a different router")]
    ConflictingRouterId(String),

    #[error("Router {0} is not registered")]
    UnknownRouter(String),

    #[error("Registration is sealed")]
    Sealed,

    #[error("Consistency check failed: {}", .issues.join("; "))]
    ConsistencyCheckFailed { issues: Vec<String> },
}

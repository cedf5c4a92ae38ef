//! Protocol registry: router bindings, registration lifecycle and the global error handler.

mod phase;
mod table;
mod snapshot;
mod service;

pub use phase::{ConsistencyMode, RegistrationPhase, RegistryOptions};
pub use snapshot::{BindingEntry, BindingKind, BindingSnapshot};
pub use service::{GlobalErrorHandler, ServiceRegistry};

pub(crate) use table::BindingTable;

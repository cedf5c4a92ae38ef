//! Error types for the RouteKit protocol layer.

mod route;
mod registry;
mod construction;
mod protocol;

pub use route::*;
pub use registry::*;
pub use construction::*;
pub use protocol::*;

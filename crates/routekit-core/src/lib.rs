//! # RouteKit Core
//!
//! Service registry and route state machine for the RouteKit framework.
//!
//! ## Components
//!
//! - [`ServiceRegistry`] - Protocol registry with an open/sealed registration lifecycle
//! - [`ConsistencyChecker`] - Development-time validation of the binding table
//! - [`RouteRequest`] - Handle for routing to a service protocol, module protocol or type
//! - [`ServiceRoute`] - One in-flight route and its state machine
//!
//! ## Lifecycle
//!
//! Routers are registered while the registry is open. [`ServiceRegistry::seal`]
//! runs the consistency checker and freezes the binding table; after that,
//! resolution reads the table without locking and routes can be performed.

pub mod checker;
pub mod registry;
pub mod route;

pub use checker::{ConsistencyChecker, ConsistencyIssue, ConsistencyReport};
pub use registry::{
    BindingEntry, BindingKind, BindingSnapshot, ConsistencyMode, GlobalErrorHandler,
    RegistrationPhase, RegistryOptions, ServiceRegistry,
};
pub use route::{RouteRequest, ServiceRoute};

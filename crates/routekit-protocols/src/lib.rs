//! # RouteKit Protocols
//!
//! Core protocol definitions for the RouteKit service router.
//! Contains only contracts - no registry or route implementation.
//!
//! ## Core Items
//!
//! - [`ServiceProtocol`] / [`ModuleProtocol`] / [`DestinationType`] - Capability descriptors
//! - [`ServiceRouter`] - Trait implemented by every provider (router)
//! - [`RouteRegistrar`] - Handle a router declares its bindings through
//! - [`ServiceRouteConfiguration`] / [`RemoveConfiguration`] - Route configuration
//! - [`Destination`] - Opaque handle to the constructed object
//! - [`ConstructionCompletion`] - One-shot handle a router reports construction through

pub mod descriptor;
pub mod destination;
pub mod router;
pub mod configuration;
pub mod route;
pub mod error;

pub use descriptor::{
    DestinationType, ModuleProtocol, ModuleRoutable, RoutableService, RouteTarget, RouterId,
    ServiceProtocol, ServiceRoutable,
};
pub use destination::Destination;
pub use router::{
    BindingSink, CompletionSink, ConstructionCompletion, ConstructionOutcome, RouteBinding,
    RouteRegistrar, ServiceRouter,
};
pub use configuration::{RemoveConfiguration, ServiceRouteConfiguration};
pub use route::{RouteAction, RouteId, RouteState};
pub use error::{
    ConstructionError, ProtocolError, RegistryError, RouteError, ServiceRouteErrorCode,
};

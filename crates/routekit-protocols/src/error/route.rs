//! Route-level errors, reported through route hooks and the global error handler.

use thiserror::Error;

use crate::route::RouteAction;

/// Error code of a [`RouteError`], stable across message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceRouteErrorCode {
    /// The protocol or type used to fetch the router is not registered.
    InvalidProtocol,
    /// The router produced no destination.
    ServiceUnavailable,
    /// Reentrant or unbounded nested perform detected.
    InfiniteRecursion,
    /// The action is not valid in the route's current state.
    ActionFailed,
    /// Routes were requested before registration was sealed.
    RegistrationNotFinished,
}

#[derive(Debug, Clone, Error)]
pub enum RouteError {
    #[error("No router registered for capability {0}")]
    UnregisteredCapability(String),

    #[error("No router registered for destination type {0}")]
    UnregisteredType(String),

    #[error("Service unavailable from router {router}: {reason}")]
    ServiceUnavailable { router: String, reason: String },

    #[error("Infinite recursion detected while routing with {0}")]
    InfiniteRecursion(String),

    #[error("Route action {action} failed: {reason}")]
    ActionFailed { action: RouteAction, reason: String },

    #[error("Router registration has not finished")]
    RegistrationNotFinished,
}

impl RouteError {
    pub fn code(&self) -> ServiceRouteErrorCode {
        match self {
            RouteError::UnregisteredCapability(_) | RouteError::UnregisteredType(_) => {
                ServiceRouteErrorCode::InvalidProtocol
            }
            RouteError::ServiceUnavailable { .. } => ServiceRouteErrorCode::ServiceUnavailable,
            RouteError::InfiniteRecursion(_) => ServiceRouteErrorCode::InfiniteRecursion,
            RouteError::ActionFailed { .. } => ServiceRouteErrorCode::ActionFailed,
            RouteError::RegistrationNotFinished => ServiceRouteErrorCode::RegistrationNotFinished,
        }
    }

    /// Whether the route never reached a router.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self.code(),
            ServiceRouteErrorCode::InvalidProtocol | ServiceRouteErrorCode::RegistrationNotFinished
        )
    }

    pub fn service_unavailable(router: impl Into<String>, reason: impl Into<String>) -> Self {
        RouteError::ServiceUnavailable {
            router: router.into(),
            reason: reason.into(),
        }
    }

    pub fn action_failed(action: RouteAction, reason: impl Into<String>) -> Self {
        RouteError::ActionFailed {
            action,
            reason: reason.into(),
        }
    }
}

//! Route configuration built by the caller before a route starts.
//!
//! A configuration is filled in by a single builder callback and then handed
//! to the route. Routers read their parameters from it and the route invokes
//! its hooks; neither mutates it afterwards.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::destination::Destination;
use crate::error::{ConstructionError, RouteError};
use crate::route::RouteState;

pub type DestinationHook = Arc<dyn Fn(&Destination) + Send + Sync>;
pub type FailureHook = Arc<dyn Fn(&RouteError) + Send + Sync>;
pub type CompletionHook = Arc<dyn Fn(Result<&Destination, &RouteError>) + Send + Sync>;
pub type StateChangeHook = Arc<dyn Fn(RouteState, RouteState) + Send + Sync>;
pub type RemovedHook = Arc<dyn Fn() + Send + Sync>;

/// Configuration for performing a service route.
#[derive(Clone, Default)]
pub struct ServiceRouteConfiguration {
    prepare_destination: Option<DestinationHook>,
    on_success: Option<DestinationHook>,
    on_failure: Option<FailureHook>,
    on_completion: Option<CompletionHook>,
    on_state_change: Option<StateChangeHook>,
    params: Map<String, Value>,
}

impl ServiceRouteConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hook receiving the constructed destination before anyone else sees it.
    pub fn prepare_destination<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Destination) + Send + Sync + 'static,
    {
        self.prepare_destination = Some(Arc::new(hook));
        self
    }

    /// Hook receiving the finished destination.
    pub fn on_success<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Destination) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(hook));
        self
    }

    pub fn on_failure<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&RouteError) + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(hook));
        self
    }

    /// Hook fired once the perform action ends, with either outcome.
    pub fn on_completion<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(Result<&Destination, &RouteError>) + Send + Sync + 'static,
    {
        self.on_completion = Some(Arc::new(hook));
        self
    }

    /// Hook fired on every state transition with `(from, to)`.
    pub fn on_state_change<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(RouteState, RouteState) + Send + Sync + 'static,
    {
        self.on_state_change = Some(Arc::new(hook));
        self
    }

    /// Set a router-specific parameter.
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Get a router-specific parameter.
    ///
    /// `Ok(None)` when the key is absent or null; an error when the stored
    /// value does not deserialize into `T`.
    pub fn param<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConstructionError> {
        self.params
            .get(key)
            .filter(|value| !value.is_null())
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| {
                    ConstructionError::InvalidParameter {
                        key: key.to_string(),
                        reason: e.to_string(),
                    }
                })
            })
            .transpose()
    }

    pub fn has_param(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn prepare_hook(&self) -> Option<&DestinationHook> {
        self.prepare_destination.as_ref()
    }

    pub fn success_hook(&self) -> Option<&DestinationHook> {
        self.on_success.as_ref()
    }

    pub fn failure_hook(&self) -> Option<&FailureHook> {
        self.on_failure.as_ref()
    }

    pub fn completion_hook(&self) -> Option<&CompletionHook> {
        self.on_completion.as_ref()
    }

    pub fn state_change_hook(&self) -> Option<&StateChangeHook> {
        self.on_state_change.as_ref()
    }
}

impl fmt::Debug for ServiceRouteConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRouteConfiguration")
            .field("prepare_destination", &self.prepare_destination.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .field("on_completion", &self.on_completion.is_some())
            .field("on_state_change", &self.on_state_change.is_some())
            .field("params", &self.params)
            .finish()
    }
}

/// Configuration for removing a completed route's destination.
#[derive(Clone, Default)]
pub struct RemoveConfiguration {
    prepare_destination: Option<DestinationHook>,
    on_success: Option<RemovedHook>,
    on_failure: Option<FailureHook>,
}

impl RemoveConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hook receiving the destination right before the router tears it down.
    pub fn prepare_destination<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Destination) + Send + Sync + 'static,
    {
        self.prepare_destination = Some(Arc::new(hook));
        self
    }

    pub fn on_success<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(hook));
        self
    }

    pub fn on_failure<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&RouteError) + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(hook));
        self
    }

    pub fn prepare_hook(&self) -> Option<&DestinationHook> {
        self.prepare_destination.as_ref()
    }

    pub fn success_hook(&self) -> Option<&RemovedHook> {
        self.on_success.as_ref()
    }

    pub fn failure_hook(&self) -> Option<&FailureHook> {
        self.on_failure.as_ref()
    }
}

impl fmt::Debug for RemoveConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoveConfiguration")
            .field("prepare_destination", &self.prepare_destination.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

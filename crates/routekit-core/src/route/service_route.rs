//! Route state machine.
//!
//! ```text
//! Idle -> Resolving -> Constructing -> Preparing -> Completed -> Removing -> Removed
//!             \              \              \                        \
//!              +--------------+--------------+-> Failed <-------------+
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use routekit_protocols::error::RouteError;
use routekit_protocols::{
    CompletionSink, ConstructionCompletion, ConstructionOutcome, Destination, RemoveConfiguration,
    RouteAction, RouteId, RouteState, RouteTarget, ServiceRouteConfiguration, ServiceRouter,
};

use super::dispatch;
use super::guard::{DepthGuard, ReentrancyGuard};
use crate::registry::ServiceRegistry;

/// One in-flight route.
///
/// Cloning yields another handle to the same route. A route is driven from one
/// logical flow at a time; asynchronous routers may report construction from
/// any thread.
#[derive(Clone)]
pub struct ServiceRoute {
    inner: Arc<RouteInner>,
}

struct RouteInner {
    id: RouteId,
    registry: Arc<ServiceRegistry>,
    target: RouteTarget,
    configuration: ServiceRouteConfiguration,
    remove_configuration: Mutex<Option<RemoveConfiguration>>,
    state: AtomicU8,
    router: OnceLock<Arc<dyn ServiceRouter>>,
    destination: Mutex<Option<Destination>>,
    error: Mutex<Option<RouteError>>,
    /// Set while a perform or remove action is running on this route.
    acting: AtomicBool,
    gate: Mutex<DeliveryGate>,
}

/// Holds back construction results of asynchronous routers until `perform` returns.
#[derive(Default)]
struct DeliveryGate {
    holding: bool,
    deferred: Option<ConstructionOutcome>,
}

impl ServiceRoute {
    pub(crate) fn new(
        registry: Arc<ServiceRegistry>,
        target: RouteTarget,
        configuration: ServiceRouteConfiguration,
        remove_configuration: Option<RemoveConfiguration>,
    ) -> Self {
        Self {
            inner: Arc::new(RouteInner {
                id: RouteId::new(),
                registry,
                target,
                configuration,
                remove_configuration: Mutex::new(remove_configuration),
                state: AtomicU8::new(RouteState::Idle as u8),
                router: OnceLock::new(),
                destination: Mutex::new(None),
                error: Mutex::new(None),
                acting: AtomicBool::new(false),
                gate: Mutex::new(DeliveryGate::default()),
            }),
        }
    }

    pub fn id(&self) -> RouteId {
        self.inner.id
    }

    pub fn target(&self) -> RouteTarget {
        self.inner.target
    }

    pub fn state(&self) -> RouteState {
        RouteState::from(self.inner.state.load(Ordering::SeqCst))
    }

    /// The router this route resolved to, once resolution succeeded.
    pub fn router(&self) -> Option<Arc<dyn ServiceRouter>> {
        self.inner.router.get().cloned()
    }

    /// Router name, or the target name before resolution.
    pub fn router_name(&self) -> String {
        match self.inner.router.get() {
            Some(router) => router.name().to_string(),
            None => self.inner.target.to_string(),
        }
    }

    /// The delivered destination, while the route is completed.
    pub fn destination(&self) -> Option<Destination> {
        self.inner.destination.lock().clone()
    }

    /// The last error reported for this route.
    pub fn error(&self) -> Option<RouteError> {
        self.inner.error.lock().clone()
    }

    pub fn configuration(&self) -> &ServiceRouteConfiguration {
        &self.inner.configuration
    }

    /// Whether the resolved router completes synchronously. `false` before resolution.
    pub fn completes_synchronously(&self) -> bool {
        self.inner
            .router
            .get()
            .is_some_and(|router| router.completes_synchronously())
    }

    pub fn is_same_route(&self, other: &ServiceRoute) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Perform
    // ------------------------------------------------------------------

    /// Resolve the router, construct the destination and deliver it.
    ///
    /// With a synchronous router the success hook has run by the time this
    /// returns. With an asynchronous router it never runs before this returns.
    /// Failures are reported to the failure hook and the global error handler,
    /// and also returned.
    pub fn perform(&self) -> Result<(), RouteError> {
        let inner = &self.inner;

        let Some(reentry) = ReentrancyGuard::try_enter(&inner.acting) else {
            let error = RouteError::InfiniteRecursion(self.router_name());
            return Err(self.fail_perform(error));
        };

        if !self.transition(RouteState::Idle, RouteState::Resolving) {
            let error =
                RouteError::action_failed(RouteAction::Perform, format!("route is {}", self.state()));
            return Err(self.fail_perform(error));
        }

        let Some(_depth) = DepthGuard::enter(inner.registry.options().max_recursion_depth) else {
            let error = RouteError::InfiniteRecursion(self.router_name());
            return Err(self.fail_perform(error));
        };

        debug!(route = %inner.id, target = %inner.target, "Performing route");

        let router = match inner.registry.resolve(&inner.target) {
            Ok(router) => router,
            Err(e) => return Err(self.fail_perform(e)),
        };
        let router = inner.router.get_or_init(|| router).clone();

        let synchronous = router.completes_synchronously();
        if !synchronous {
            inner.gate.lock().holding = true;
        }

        self.transition(RouteState::Resolving, RouteState::Constructing);
        let completion = ConstructionCompletion::new(Arc::new(RouteCompletion {
            route: self.clone(),
        }));
        router.construct(&inner.configuration, completion);

        if !synchronous {
            // Results reported from here on run their hooks without this call's guard.
            drop(reentry);
            let deferred = {
                let mut gate = inner.gate.lock();
                gate.holding = false;
                gate.deferred.take()
            };
            if let Some(outcome) = deferred {
                let route = self.clone();
                dispatch::defer(move || route.finish_construction(outcome));
            }
            debug!(route = %inner.id, router = router.name(), "Route handed off to asynchronous router");
            return Ok(());
        }

        if self.state() == RouteState::Constructing {
            let error = RouteError::service_unavailable(
                router.name(),
                "router declared synchronous completion but did not report a result",
            );
            return Err(self.fail_perform(error));
        }

        match self.state() {
            RouteState::Failed => Err(self.error().unwrap_or_else(|| {
                RouteError::service_unavailable(router.name(), "route failed")
            })),
            _ => Ok(()),
        }
    }

    fn finish_construction(&self, outcome: ConstructionOutcome) {
        let _mark = ReentrancyGuard::mark(&self.inner.acting);

        let state = self.state();
        if state != RouteState::Constructing {
            warn!(route = %self.inner.id, state = %state, "Ignoring construction result for route that is not constructing");
            return;
        }

        match outcome {
            ConstructionOutcome::Delivered(destination) => self.prepare_and_complete(destination),
            ConstructionOutcome::Unavailable(reason) => {
                self.fail_perform(RouteError::service_unavailable(self.router_name(), reason));
            }
            ConstructionOutcome::Failed(e) => {
                self.fail_perform(RouteError::service_unavailable(self.router_name(), e.to_string()));
            }
        }
    }

    fn prepare_and_complete(&self, destination: Destination) {
        let configuration = &self.inner.configuration;

        if !self.transition(RouteState::Constructing, RouteState::Preparing) {
            return;
        }
        if let Some(prepare) = configuration.prepare_hook() {
            prepare(&destination);
        }

        *self.inner.destination.lock() = Some(destination.clone());
        // The preparation hook may have failed this route by re-entering it.
        if !self.transition(RouteState::Preparing, RouteState::Completed) {
            self.inner.destination.lock().take();
            return;
        }

        info!(
            route = %self.inner.id,
            router = %self.router_name(),
            destination = destination.type_name(),
            "Route completed"
        );

        if let Some(on_success) = configuration.success_hook() {
            on_success(&destination);
        }
        if let Some(on_completion) = configuration.completion_hook() {
            on_completion(Ok(&destination));
        }
    }

    // ------------------------------------------------------------------
    // Remove
    // ------------------------------------------------------------------

    /// Remove the destination using the removal configuration given at perform time.
    pub fn remove(&self) -> Result<(), RouteError> {
        let configuration = self
            .inner
            .remove_configuration
            .lock()
            .clone()
            .unwrap_or_default();
        self.remove_with(configuration)
    }

    /// Remove the destination with a fresh removal configuration.
    pub fn remove_with_configure<F>(&self, build: F) -> Result<(), RouteError>
    where
        F: FnOnce(&mut RemoveConfiguration),
    {
        let mut configuration = RemoveConfiguration::default();
        build(&mut configuration);
        *self.inner.remove_configuration.lock() = Some(configuration.clone());
        self.remove_with(configuration)
    }

    fn remove_with(&self, configuration: RemoveConfiguration) -> Result<(), RouteError> {
        let Some(_reentry) = ReentrancyGuard::try_enter(&self.inner.acting) else {
            let error = RouteError::InfiniteRecursion(self.router_name());
            return Err(self.fail_remove(&configuration, error));
        };

        let state = self.state();
        let router = match self.router() {
            Some(router) if state == RouteState::Completed => router,
            _ => {
                let error = RouteError::action_failed(
                    RouteAction::Remove,
                    format!("route is {}, only completed routes can be removed", state),
                );
                return Err(self.fail_remove(&configuration, error));
            }
        };

        if !router.supports_removal() {
            let error = RouteError::action_failed(
                RouteAction::Remove,
                format!("router {} does not support removal", router.name()),
            );
            return Err(self.fail_remove(&configuration, error));
        }

        let destination = match self.destination() {
            Some(destination) if self.transition(RouteState::Completed, RouteState::Removing) => {
                destination
            }
            _ => {
                let error = RouteError::action_failed(RouteAction::Remove, "destination is gone");
                return Err(self.fail_remove(&configuration, error));
            }
        };

        if let Some(prepare) = configuration.prepare_hook() {
            prepare(&destination);
        }
        if self.state() != RouteState::Removing {
            return Err(self
                .error()
                .unwrap_or_else(|| RouteError::action_failed(RouteAction::Remove, "route changed state")));
        }

        if let Err(e) = router.remove_destination(&destination, &configuration) {
            let error = RouteError::action_failed(RouteAction::Remove, e.to_string());
            return Err(self.fail_remove(&configuration, error));
        }

        self.inner.destination.lock().take();
        self.transition(RouteState::Removing, RouteState::Removed);
        info!(route = %self.inner.id, router = router.name(), "Route removed");

        if let Some(on_success) = configuration.success_hook() {
            on_success();
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // State and failure reporting
    // ------------------------------------------------------------------

    fn transition(&self, from: RouteState, to: RouteState) -> bool {
        let swapped = self
            .inner
            .state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if swapped {
            debug!(route = %self.inner.id, from = %from, to = %to, "Route state changed");
            if let Some(on_state_change) = self.inner.configuration.state_change_hook() {
                on_state_change(from, to);
            }
        }
        swapped
    }

    /// Record the error and move the route to `Failed` if `action` is the one
    /// in flight. Returns whether the route failed.
    fn mark_failed(&self, action: RouteAction, error: &RouteError) -> bool {
        let state = self.state();
        let in_flight = state.is_in_flight()
            && match action {
                RouteAction::Perform => state != RouteState::Removing,
                RouteAction::Remove => state == RouteState::Removing,
            };
        let failed = in_flight && self.transition(state, RouteState::Failed);

        *self.inner.error.lock() = Some(error.clone());
        error!(
            route = %self.inner.id,
            target = %self.inner.target,
            action = %action,
            state = %self.state(),
            error = %error,
            "Route action failed"
        );
        failed
    }

    /// Report a perform failure.
    ///
    /// The configuration's failure and completion hooks only see the failure
    /// that ends the route; rejected calls on a settled route go to the global
    /// handler alone.
    fn fail_perform(&self, error: RouteError) -> RouteError {
        if self.mark_failed(RouteAction::Perform, &error) {
            let configuration = &self.inner.configuration;
            if let Some(on_failure) = configuration.failure_hook() {
                on_failure(&error);
            }
            if let Some(on_completion) = configuration.completion_hook() {
                on_completion(Err(&error));
            }
        }
        self.inner
            .registry
            .notify_global_error(self, RouteAction::Perform, &error);
        error
    }

    fn fail_remove(&self, configuration: &RemoveConfiguration, error: RouteError) -> RouteError {
        self.mark_failed(RouteAction::Remove, &error);

        if let Some(on_failure) = configuration.failure_hook() {
            on_failure(&error);
        }
        self.inner
            .registry
            .notify_global_error(self, RouteAction::Remove, &error);
        error
    }
}

impl fmt::Debug for ServiceRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRoute")
            .field("id", &self.inner.id)
            .field("target", &self.inner.target)
            .field("state", &self.state())
            .finish()
    }
}

/// Completion sink connecting a router's [`ConstructionCompletion`] to its route.
struct RouteCompletion {
    route: ServiceRoute,
}

impl CompletionSink for RouteCompletion {
    fn complete(&self, outcome: ConstructionOutcome) {
        {
            let mut gate = self.route.inner.gate.lock();
            if gate.holding {
                gate.deferred = Some(outcome);
                return;
            }
        }
        self.route.finish_construction(outcome);
    }
}

#[cfg(test)]
#[path = "service_route_tests.rs"]
mod tests;

//! Route requests: the caller-facing entry into routing.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use routekit_protocols::error::RouteError;
use routekit_protocols::{
    Destination, RemoveConfiguration, RouteTarget, ServiceRouteConfiguration, ServiceRouter,
};

use super::ServiceRoute;
use crate::registry::ServiceRegistry;

/// A request to route to a service protocol, module protocol or destination type.
///
/// Obtained from [`ServiceRegistry::service`], [`ServiceRegistry::module`] or
/// [`ServiceRegistry::destination`]. Cheap to clone; each perform creates a
/// new [`ServiceRoute`].
#[derive(Clone)]
pub struct RouteRequest {
    registry: Arc<ServiceRegistry>,
    target: RouteTarget,
}

impl RouteRequest {
    pub(crate) fn new(registry: Arc<ServiceRegistry>, target: RouteTarget) -> Self {
        Self { registry, target }
    }

    pub fn target(&self) -> RouteTarget {
        self.target
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Resolve the router without performing anything.
    pub fn resolve(&self) -> Result<Arc<dyn ServiceRouter>, RouteError> {
        self.registry.resolve(&self.target)
    }

    /// Whether the resolved router completes synchronously. `false` when unresolvable.
    pub fn completes_synchronously(&self) -> bool {
        self.resolve()
            .map(|router| router.completes_synchronously())
            .unwrap_or(false)
    }

    /// Build an idle route with the given configuration, without performing it.
    pub fn route_with_configure<F>(&self, build: F) -> ServiceRoute
    where
        F: FnOnce(&mut ServiceRouteConfiguration),
    {
        ServiceRoute::new(
            self.registry.clone(),
            self.target,
            self.configuration(build),
            None,
        )
    }

    /// Build and perform a route.
    ///
    /// Returns `None` when no router serves the target or registration is not
    /// sealed. Any other failure still returns the (failed) route; the failure
    /// has been reported to the configuration's hooks and the global handler.
    pub fn perform_with_configure<F>(&self, build: F) -> Option<ServiceRoute>
    where
        F: FnOnce(&mut ServiceRouteConfiguration),
    {
        self.launch(self.route_with_configure(build))
    }

    /// Like [`perform_with_configure`](Self::perform_with_configure), also
    /// recording the removal configuration used by [`ServiceRoute::remove`].
    pub fn perform_with_configure_and_remove<F, G>(
        &self,
        build: F,
        remove_build: G,
    ) -> Option<ServiceRoute>
    where
        F: FnOnce(&mut ServiceRouteConfiguration),
        G: FnOnce(&mut RemoveConfiguration),
    {
        let mut remove = RemoveConfiguration::default();
        remove_build(&mut remove);

        let route = ServiceRoute::new(
            self.registry.clone(),
            self.target,
            self.configuration(build),
            Some(remove),
        );
        self.launch(route)
    }

    pub fn perform(&self) -> Option<ServiceRoute> {
        self.perform_with_configure(|_| {})
    }

    /// Perform and return the destination directly.
    ///
    /// Only synchronous routers yield a value here. For asynchronous routers the
    /// route is still performed and `prepare` runs once the destination arrives,
    /// but this returns `None`.
    pub fn make_destination_with_preparation<F>(&self, prepare: F) -> Option<Destination>
    where
        F: Fn(&Destination) + Send + Sync + 'static,
    {
        let route = self.perform_with_configure(|configuration| {
            configuration.prepare_destination(prepare);
        })?;

        if !route.completes_synchronously() {
            debug!(target = %self.target, "Asynchronous router, destination delivered through hooks only");
            return None;
        }
        route.destination()
    }

    pub fn make_destination(&self) -> Option<Destination> {
        self.make_destination_with_preparation(|_| {})
    }

    /// Perform and wait for the destination, whichever way the router completes.
    pub async fn make_destination_async<F>(&self, prepare: F) -> Result<Destination, RouteError>
    where
        F: Fn(&Destination) + Send + Sync + 'static,
    {
        let (tx, rx) = oneshot::channel::<Result<Destination, RouteError>>();
        let tx = Mutex::new(Some(tx));

        let route = self.route_with_configure(move |configuration| {
            configuration
                .prepare_destination(prepare)
                .on_completion(move |result| {
                    if let Some(tx) = tx.lock().take() {
                        let _ = tx.send(result.cloned().map_err(Clone::clone));
                    }
                });
        });

        // Failures reach the receiver through the completion hook.
        let _ = route.perform();

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(RouteError::service_unavailable(
                route.router_name(),
                "route finished without reporting a result",
            )),
        }
    }

    fn configuration<F>(&self, build: F) -> ServiceRouteConfiguration
    where
        F: FnOnce(&mut ServiceRouteConfiguration),
    {
        let mut configuration = ServiceRouteConfiguration::default();
        if let Ok(router) = self.resolve() {
            router.default_configuration(&mut configuration);
        }
        build(&mut configuration);
        configuration
    }

    fn launch(&self, route: ServiceRoute) -> Option<ServiceRoute> {
        match route.perform() {
            Err(e) if e.is_resolution_failure() => None,
            _ => Some(route),
        }
    }
}

impl std::fmt::Debug for RouteRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteRequest")
            .field("target", &self.target)
            .finish()
    }
}

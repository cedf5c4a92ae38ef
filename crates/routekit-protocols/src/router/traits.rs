//! ServiceRouter trait definition.

use crate::configuration::{RemoveConfiguration, ServiceRouteConfiguration};
use crate::destination::Destination;
use crate::error::{ConstructionError, RegistryError};

use super::{ConstructionCompletion, RouteRegistrar};

/// Core trait for all routers.
///
/// A router knows how to construct one or more destinations. It provides:
/// - Its bindings (via [`register_routable_destination`](Self::register_routable_destination))
/// - Destination construction, synchronous or deferred
/// - Optional teardown of a delivered destination
pub trait ServiceRouter: Send + Sync + 'static {
    /// Unique router name.
    fn name(&self) -> &str;

    /// Declare the destination types and protocols this router serves.
    ///
    /// Called exactly once, when the router is added to a registry.
    fn register_routable_destination(
        &self,
        registrar: &mut RouteRegistrar<'_>,
    ) -> Result<(), RegistryError>;

    /// Create the destination for `configuration`.
    ///
    /// `Ok(None)` means the service is unavailable for this configuration.
    fn destination(
        &self,
        configuration: &ServiceRouteConfiguration,
    ) -> Result<Option<Destination>, ConstructionError>;

    /// Construct the destination and report it through `completion`.
    ///
    /// The default builds the destination with [`destination`](Self::destination)
    /// and reports it immediately. Routers that return `false` from
    /// [`completes_synchronously`](Self::completes_synchronously) override this
    /// and may call `completion` later from any thread.
    fn construct(
        &self,
        configuration: &ServiceRouteConfiguration,
        completion: ConstructionCompletion,
    ) {
        match self.destination(configuration) {
            Ok(Some(destination)) => completion.deliver(destination),
            Ok(None) => completion.unavailable("router returned no destination"),
            Err(e) => completion.fail(e),
        }
    }

    /// Whether [`construct`](Self::construct) always reports before returning.
    fn completes_synchronously(&self) -> bool {
        true
    }

    /// Seed router-specific defaults before the caller's builder runs.
    fn default_configuration(&self, _configuration: &mut ServiceRouteConfiguration) {}

    /// Whether delivered destinations can be removed.
    fn supports_removal(&self) -> bool {
        false
    }

    /// Tear down a delivered destination.
    fn remove_destination(
        &self,
        _destination: &Destination,
        _configuration: &RemoveConfiguration,
    ) -> Result<(), ConstructionError> {
        Ok(())
    }
}

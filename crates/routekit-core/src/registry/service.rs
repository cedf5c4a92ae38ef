//! Service registry: the process-wide routing state object.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use routekit_protocols::error::{RegistryError, RouteError};
use routekit_protocols::{
    BindingSink, DestinationType, ModuleProtocol, ModuleRoutable, RoutableService, RouteAction,
    RouteBinding, RouteRegistrar, RouteTarget, RouterId, ServiceProtocol, ServiceRoutable,
    ServiceRouter,
};

use super::table::BindOutcome;
use super::{BindingSnapshot, BindingTable, ConsistencyMode, RegistrationPhase, RegistryOptions};
use crate::checker::{ConsistencyChecker, ConsistencyReport};
use crate::route::{RouteRequest, ServiceRoute};

/// Observer invoked for every failed route action, with the route, the action and the error.
pub type GlobalErrorHandler = Arc<dyn Fn(&ServiceRoute, RouteAction, &RouteError) + Send + Sync>;

/// Registry of routers and their bindings.
///
/// Registration happens while the registry is [`RegistrationPhase::Open`].
/// [`seal`](Self::seal) freezes the bindings; resolution only works afterwards
/// and reads the frozen table without locking. Share the registry as
/// `Arc<ServiceRegistry>` with everything that performs routes.
pub struct ServiceRegistry {
    options: RegistryOptions,
    phase: AtomicU8,
    open: Mutex<BindingTable>,
    sealed: OnceLock<BindingTable>,
    error_handler: RwLock<Option<GlobalErrorHandler>>,
}

impl ServiceRegistry {
    /// Create a new registry with default options.
    pub fn new() -> Self {
        Self::with_options(RegistryOptions::default())
    }

    pub fn with_options(options: RegistryOptions) -> Self {
        Self {
            options,
            phase: AtomicU8::new(RegistrationPhase::Open as u8),
            open: Mutex::new(BindingTable::default()),
            sealed: OnceLock::new(),
            error_handler: RwLock::new(None),
        }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    pub fn phase(&self) -> RegistrationPhase {
        RegistrationPhase::from(self.phase.load(Ordering::SeqCst))
    }

    pub fn is_sealed(&self) -> bool {
        self.phase() == RegistrationPhase::Sealed
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Add a router and let it declare its bindings.
    ///
    /// Adding the same router instance twice is a no-op. A router whose
    /// registration fails is removed again together with the bindings it made;
    /// with [`ConsistencyMode::Enforce`] the rejection also keeps the registry
    /// from sealing.
    pub fn register_router(&self, router: Arc<dyn ServiceRouter>) -> Result<(), RegistryError> {
        self.ensure_open()?;
        let id = RouterId::new(router.name());

        let inserted = self.open.lock().insert_router(router.clone());
        match inserted {
            Ok(true) => {}
            Ok(false) => {
                debug!(router = %id, "Router already registered");
                return Ok(());
            }
            Err(e) => return self.consistency_violation(&id, e),
        }

        let sink = RegistrarSink {
            registry: self,
            rejected: Mutex::new(None),
        };
        let mut registrar = RouteRegistrar::new(id.clone(), &sink);
        let result = router.register_routable_destination(&mut registrar);
        let bound = registrar.bound();
        drop(registrar);

        if let Some(error) = result.err().or_else(|| sink.rejected.lock().take()) {
            self.open.lock().remove_router(&id);
            warn!(router = %id, error = %error, "Router registration rolled back");
            return Err(error);
        }

        info!(router = %id, bindings = bound, "Router registered");
        Ok(())
    }

    /// Add several routers in order, stopping at the first error.
    pub fn register_routers<I>(&self, routers: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = Arc<dyn ServiceRouter>>,
    {
        for router in routers {
            self.register_router(router)?;
        }
        Ok(())
    }

    /// Declare a type that must be served by some router once registration is sealed.
    pub fn declare_routable<T: RoutableService>(&self) -> Result<(), RegistryError> {
        self.declare_routable_type(DestinationType::of::<T>())
    }

    pub fn declare_routable_type(&self, destination: DestinationType) -> Result<(), RegistryError> {
        self.ensure_open()?;
        if self.open.lock().declare_routable(destination) {
            debug!(destination = %destination, "Routable type declared");
        }
        Ok(())
    }

    /// Finish registration.
    ///
    /// With [`ConsistencyMode::Enforce`] the consistency checker runs first and
    /// an inconsistent registry stays open. Returns the checker's report.
    pub fn seal(&self) -> Result<ConsistencyReport, RegistryError> {
        self.ensure_open()?;

        let mut open = self.open.lock();
        let report = match self.options.consistency {
            ConsistencyMode::Enforce => ConsistencyChecker::new(&open).check(),
            ConsistencyMode::Skip => ConsistencyReport::skipped(),
        };

        for warning in &report.warnings {
            warn!(subject = %warning.subject, "{}", warning.message);
        }

        if !report.is_consistent() {
            for issue in &report.errors {
                error!(subject = %issue.subject, "{}", issue.message);
            }
            return Err(RegistryError::ConsistencyCheckFailed {
                issues: report.error_messages(),
            });
        }

        let table = std::mem::take(&mut *open);
        let routers = table.routers().count();
        if self.sealed.set(table).is_err() {
            return Err(RegistryError::Sealed);
        }
        self.phase
            .store(RegistrationPhase::Sealed as u8, Ordering::SeqCst);
        drop(open);

        info!(routers, checked = report.checked, "Router registration sealed");
        Ok(report)
    }

    /// Run the consistency checker on demand, regardless of the consistency mode.
    pub fn check_consistency(&self) -> ConsistencyReport {
        match self.sealed.get() {
            Some(table) => ConsistencyChecker::new(table).check(),
            None => ConsistencyChecker::new(&self.open.lock()).check(),
        }
    }

    fn ensure_open(&self) -> Result<(), RegistryError> {
        if self.is_sealed() {
            return Err(RegistryError::Sealed);
        }
        Ok(())
    }

    /// Apply the consistency mode to a conflicting registration.
    fn consistency_violation(
        &self,
        router: &RouterId,
        error: RegistryError,
    ) -> Result<(), RegistryError> {
        match self.options.consistency {
            ConsistencyMode::Enforce => {
                error!(router = %router, error = %error, "Conflicting router registration");
                self.open.lock().record_rejection(router, error.to_string());
                Err(error)
            }
            ConsistencyMode::Skip => {
                warn!(error = %error, "Ignoring conflicting registration, first binding wins");
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    fn table(&self) -> Result<&BindingTable, RouteError> {
        self.sealed.get().ok_or(RouteError::RegistrationNotFinished)
    }

    /// Resolve the router bound to `target`.
    pub fn resolve(&self, target: &RouteTarget) -> Result<Arc<dyn ServiceRouter>, RouteError> {
        let table = self.table()?;
        table.resolve(target).cloned().ok_or_else(|| match target {
            RouteTarget::Service(p) => RouteError::UnregisteredCapability(p.short_name().to_string()),
            RouteTarget::Module(m) => RouteError::UnregisteredCapability(m.short_name().to_string()),
            RouteTarget::Destination(t) => RouteError::UnregisteredType(t.short_name().to_string()),
        })
    }

    pub fn router_for_service<P: ?Sized + ServiceRoutable>(
        &self,
    ) -> Result<Arc<dyn ServiceRouter>, RouteError> {
        self.resolve(&RouteTarget::Service(ServiceProtocol::of::<P>()))
    }

    pub fn router_for_module<M: ?Sized + ModuleRoutable>(
        &self,
    ) -> Result<Arc<dyn ServiceRouter>, RouteError> {
        self.resolve(&RouteTarget::Module(ModuleProtocol::of::<M>()))
    }

    pub fn router_for_type<T: RoutableService>(&self) -> Result<Arc<dyn ServiceRouter>, RouteError> {
        self.resolve(&RouteTarget::Destination(DestinationType::of::<T>()))
    }

    /// Look up a router by id.
    pub fn router(&self, id: &RouterId) -> Option<Arc<dyn ServiceRouter>> {
        match self.sealed.get() {
            Some(table) => table.router(id).cloned(),
            None => self.open.lock().router(id).cloned(),
        }
    }

    /// Request routing to service protocol `P`.
    pub fn service<P: ?Sized + ServiceRoutable>(self: &Arc<Self>) -> RouteRequest {
        RouteRequest::new(self.clone(), RouteTarget::Service(ServiceProtocol::of::<P>()))
    }

    /// Request routing to module protocol `M`.
    pub fn module<M: ?Sized + ModuleRoutable>(self: &Arc<Self>) -> RouteRequest {
        RouteRequest::new(self.clone(), RouteTarget::Module(ModuleProtocol::of::<M>()))
    }

    /// Request routing to concrete destination type `T`.
    pub fn destination<T: RoutableService>(self: &Arc<Self>) -> RouteRequest {
        RouteRequest::new(self.clone(), RouteTarget::Destination(DestinationType::of::<T>()))
    }

    /// Snapshot of every binding.
    pub fn bindings(&self) -> BindingSnapshot {
        match self.sealed.get() {
            Some(table) => BindingSnapshot::from_table(table),
            None => BindingSnapshot::from_table(&self.open.lock()),
        }
    }

    // ------------------------------------------------------------------
    // Global error handler
    // ------------------------------------------------------------------

    /// Set the handler notified of every route failure. Later calls replace it.
    pub fn set_global_error_handler<F>(&self, handler: F)
    where
        F: Fn(&ServiceRoute, RouteAction, &RouteError) + Send + Sync + 'static,
    {
        *self.error_handler.write() = Some(Arc::new(handler));
    }

    pub fn clear_global_error_handler(&self) {
        *self.error_handler.write() = None;
    }

    pub(crate) fn notify_global_error(
        &self,
        route: &ServiceRoute,
        action: RouteAction,
        error: &RouteError,
    ) {
        let handler = self.error_handler.read().clone();
        if let Some(handler) = handler {
            handler(route, action, error);
        }
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("phase", &self.phase())
            .field("options", &self.options)
            .finish()
    }
}

/// Binding sink handed to routers during registration.
struct RegistrarSink<'a> {
    registry: &'a ServiceRegistry,
    /// First rejected binding, kept even if the router swallows the error.
    rejected: Mutex<Option<RegistryError>>,
}

impl BindingSink for RegistrarSink<'_> {
    fn bind(&self, router: &RouterId, binding: RouteBinding) -> Result<(), RegistryError> {
        self.registry.ensure_open()?;
        let result = self.registry.open.lock().bind(router, binding);
        match result {
            Ok(BindOutcome::Alternate) => {
                debug!(router = %router, ?binding, "Destination already served, kept as alternate");
                Ok(())
            }
            Ok(_) => {
                debug!(router = %router, ?binding, "Binding registered");
                Ok(())
            }
            Err(e) => {
                let result = self.registry.consistency_violation(router, e);
                if let Err(error) = &result {
                    self.rejected.lock().get_or_insert_with(|| error.clone());
                }
                result
            }
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;

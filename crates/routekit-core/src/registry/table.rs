//! Binding table shared by the open and sealed registration phases.

use std::collections::HashMap;
use std::sync::Arc;

use routekit_protocols::error::RegistryError;
use routekit_protocols::{
    DestinationType, ModuleProtocol, RouteBinding, RouteTarget, RouterId, ServiceProtocol,
    ServiceRouter,
};

/// Routers bound to one destination type. The first router is the default.
#[derive(Debug, Clone)]
pub(crate) struct DestinationBinding {
    pub routers: Vec<RouterId>,
    pub exclusive: bool,
}

impl DestinationBinding {
    pub fn default_router(&self) -> Option<&RouterId> {
        self.routers.first()
    }
}

/// What a successful bind changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindOutcome {
    Added,
    Unchanged,
    /// Another router already serves the type; the binding is kept as an alternate.
    Alternate,
}

#[derive(Default)]
pub(crate) struct BindingTable {
    routers: HashMap<RouterId, Arc<dyn ServiceRouter>>,
    destinations: HashMap<DestinationType, DestinationBinding>,
    services: HashMap<ServiceProtocol, RouterId>,
    modules: HashMap<ModuleProtocol, RouterId>,
    routable: Vec<DestinationType>,
    rejections: Vec<Rejection>,
}

/// A registration refused for a consistency violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Rejection {
    pub router: RouterId,
    pub reason: String,
}

impl BindingTable {
    /// Add a router. Returns `false` if this exact router was already added.
    pub fn insert_router(&mut self, router: Arc<dyn ServiceRouter>) -> Result<bool, RegistryError> {
        let id = RouterId::new(router.name());
        match self.routers.get(&id) {
            Some(existing) if Arc::ptr_eq(existing, &router) => Ok(false),
            Some(_) => Err(RegistryError::ConflictingRouterId(id.to_string())),
            None => {
                self.routers.insert(id, router);
                Ok(true)
            }
        }
    }

    /// Drop a router and every binding it made.
    pub fn remove_router(&mut self, router: &RouterId) {
        self.routers.remove(router);
        self.services.retain(|_, bound| bound != router);
        self.modules.retain(|_, bound| bound != router);
        self.destinations.retain(|_, binding| {
            binding.routers.retain(|bound| bound != router);
            !binding.routers.is_empty()
        });
    }

    pub fn record_rejection(&mut self, router: &RouterId, reason: impl Into<String>) {
        self.rejections.push(Rejection {
            router: router.clone(),
            reason: reason.into(),
        });
    }

    pub fn rejections(&self) -> &[Rejection] {
        &self.rejections
    }

    pub fn bind(
        &mut self,
        router: &RouterId,
        binding: RouteBinding,
    ) -> Result<BindOutcome, RegistryError> {
        if !self.routers.contains_key(router) {
            return Err(RegistryError::UnknownRouter(router.to_string()));
        }

        match binding {
            RouteBinding::Destination {
                destination,
                exclusive,
            } => self.bind_destination(router, destination, exclusive),
            RouteBinding::ServiceProtocol(protocol) => {
                match self.services.get(&protocol) {
                    Some(existing) if existing == router => Ok(BindOutcome::Unchanged),
                    Some(existing) => Err(RegistryError::ConflictingServiceProtocol {
                        protocol: protocol.short_name().to_string(),
                        existing: existing.to_string(),
                        requested: router.to_string(),
                    }),
                    None => {
                        self.services.insert(protocol, router.clone());
                        Ok(BindOutcome::Added)
                    }
                }
            }
            RouteBinding::ModuleProtocol(protocol) => match self.modules.get(&protocol) {
                Some(existing) if existing == router => Ok(BindOutcome::Unchanged),
                Some(existing) => Err(RegistryError::ConflictingModuleProtocol {
                    protocol: protocol.short_name().to_string(),
                    existing: existing.to_string(),
                    requested: router.to_string(),
                }),
                None => {
                    self.modules.insert(protocol, router.clone());
                    Ok(BindOutcome::Added)
                }
            },
        }
    }

    fn bind_destination(
        &mut self,
        router: &RouterId,
        destination: DestinationType,
        exclusive: bool,
    ) -> Result<BindOutcome, RegistryError> {
        let Some(binding) = self.destinations.get_mut(&destination) else {
            self.destinations.insert(
                destination,
                DestinationBinding {
                    routers: vec![router.clone()],
                    exclusive,
                },
            );
            return Ok(BindOutcome::Added);
        };

        let conflicting = binding.routers.iter().find(|id| *id != router);
        if let Some(other) = conflicting {
            if exclusive || binding.exclusive {
                let owner = if binding.exclusive {
                    binding.default_router().unwrap_or(other)
                } else {
                    other
                };
                return Err(RegistryError::ConflictingExclusiveBinding {
                    destination: destination.short_name().to_string(),
                    existing: owner.to_string(),
                    requested: router.to_string(),
                });
            }
        }

        if binding.routers.contains(router) {
            if exclusive && !binding.exclusive {
                binding.exclusive = true;
                return Ok(BindOutcome::Added);
            }
            return Ok(BindOutcome::Unchanged);
        }

        binding.routers.push(router.clone());
        Ok(BindOutcome::Alternate)
    }

    pub fn declare_routable(&mut self, destination: DestinationType) -> bool {
        if self.routable.contains(&destination) {
            return false;
        }
        self.routable.push(destination);
        true
    }

    pub fn resolve(&self, target: &RouteTarget) -> Option<&Arc<dyn ServiceRouter>> {
        let id = match target {
            RouteTarget::Service(protocol) => self.services.get(protocol)?,
            RouteTarget::Module(protocol) => self.modules.get(protocol)?,
            RouteTarget::Destination(destination) => {
                self.destinations.get(destination)?.default_router()?
            }
        };
        self.routers.get(id)
    }

    pub fn router(&self, id: &RouterId) -> Option<&Arc<dyn ServiceRouter>> {
        self.routers.get(id)
    }

    pub fn routers(&self) -> impl Iterator<Item = (&RouterId, &Arc<dyn ServiceRouter>)> {
        self.routers.iter()
    }

    pub fn destinations(&self) -> impl Iterator<Item = (&DestinationType, &DestinationBinding)> {
        self.destinations.iter()
    }

    pub fn services(&self) -> impl Iterator<Item = (&ServiceProtocol, &RouterId)> {
        self.services.iter()
    }

    pub fn modules(&self) -> impl Iterator<Item = (&ModuleProtocol, &RouterId)> {
        self.modules.iter()
    }

    pub fn routable(&self) -> &[DestinationType] {
        &self.routable
    }

    /// Number of destination types `router` serves.
    pub fn destination_count(&self, router: &RouterId) -> usize {
        self.destinations
            .values()
            .filter(|binding| binding.routers.contains(router))
            .count()
    }
}

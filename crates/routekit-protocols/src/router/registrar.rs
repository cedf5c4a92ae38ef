//! Registration handle passed to routers.

use crate::descriptor::{
    DestinationType, ModuleProtocol, ModuleRoutable, RoutableService, RouterId, ServiceProtocol,
    ServiceRoutable,
};
use crate::error::RegistryError;

/// A single binding a router declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteBinding {
    Destination {
        destination: DestinationType,
        exclusive: bool,
    },
    ServiceProtocol(ServiceProtocol),
    ModuleProtocol(ModuleProtocol),
}

/// Trait implemented by registries to receive bindings.
pub trait BindingSink: Send + Sync {
    /// Record `binding` for `router`.
    fn bind(&self, router: &RouterId, binding: RouteBinding) -> Result<(), RegistryError>;
}

/// Handle a router declares its bindings through.
pub struct RouteRegistrar<'a> {
    router: RouterId,
    sink: &'a dyn BindingSink,
    bound: usize,
}

impl<'a> RouteRegistrar<'a> {
    pub fn new(router: RouterId, sink: &'a dyn BindingSink) -> Self {
        Self {
            router,
            sink,
            bound: 0,
        }
    }

    /// The router this registrar binds for.
    pub fn router(&self) -> &RouterId {
        &self.router
    }

    /// Number of bindings recorded so far.
    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Register a destination type. One router may serve many types.
    pub fn register_service<T: RoutableService>(&mut self) -> Result<(), RegistryError> {
        self.bind(RouteBinding::Destination {
            destination: DestinationType::of::<T>(),
            exclusive: false,
        })
    }

    /// Register a destination type that no other router may serve.
    pub fn register_exclusive_service<T: RoutableService>(&mut self) -> Result<(), RegistryError> {
        self.bind(RouteBinding::Destination {
            destination: DestinationType::of::<T>(),
            exclusive: true,
        })
    }

    /// Register a service protocol all destinations of this router implement.
    pub fn register_service_protocol<P: ?Sized + ServiceRoutable>(
        &mut self,
    ) -> Result<(), RegistryError> {
        self.bind(RouteBinding::ServiceProtocol(ServiceProtocol::of::<P>()))
    }

    /// Register a module protocol this router's configuration satisfies.
    pub fn register_module_protocol<M: ?Sized + ModuleRoutable>(
        &mut self,
    ) -> Result<(), RegistryError> {
        self.bind(RouteBinding::ModuleProtocol(ModuleProtocol::of::<M>()))
    }

    pub fn bind(&mut self, binding: RouteBinding) -> Result<(), RegistryError> {
        self.sink.bind(&self.router, binding)?;
        self.bound += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        bindings: Mutex<Vec<(RouterId, RouteBinding)>>,
    }

    impl BindingSink for RecordingSink {
        fn bind(&self, router: &RouterId, binding: RouteBinding) -> Result<(), RegistryError> {
            self.bindings.lock().unwrap().push((router.clone(), binding));
            Ok(())
        }
    }

    struct RejectingSink;

    impl BindingSink for RejectingSink {
        fn bind(&self, _router: &RouterId, _binding: RouteBinding) -> Result<(), RegistryError> {
            Err(RegistryError::Sealed)
        }
    }

    trait Greeter {}
    impl ServiceRoutable for dyn Greeter {}

    trait GreeterConfig {}
    impl ModuleRoutable for dyn GreeterConfig {}

    struct English;
    impl RoutableService for English {}

    #[test]
    fn test_registrar_forwards_bindings() {
        let sink = RecordingSink::default();
        let mut registrar = RouteRegistrar::new(RouterId::from("greeter"), &sink);

        registrar.register_service::<English>().unwrap();
        registrar.register_exclusive_service::<English>().unwrap();
        registrar.register_service_protocol::<dyn Greeter>().unwrap();
        registrar.register_module_protocol::<dyn GreeterConfig>().unwrap();
        assert_eq!(registrar.bound(), 4);

        let bindings = sink.bindings.lock().unwrap();
        assert!(bindings.iter().all(|(id, _)| id.as_str() == "greeter"));
        assert_eq!(
            bindings[1].1,
            RouteBinding::Destination {
                destination: DestinationType::of::<English>(),
                exclusive: true,
            }
        );
        assert_eq!(
            bindings[2].1,
            RouteBinding::ServiceProtocol(ServiceProtocol::of::<dyn Greeter>())
        );
    }

    #[test]
    fn test_registrar_propagates_errors() {
        let sink = RejectingSink;
        let mut registrar = RouteRegistrar::new(RouterId::from("greeter"), &sink);
        assert!(registrar.register_service::<English>().is_err());
        assert_eq!(registrar.bound(), 0);
    }
}

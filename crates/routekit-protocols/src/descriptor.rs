//! Capability descriptors and router identifiers.
//!
//! Descriptors are compared by [`TypeId`], so two descriptors built from the
//! same Rust type are always equal regardless of where they were created.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Marker for concrete destination types that must be served by a router.
///
/// Only types implementing this trait can be bound with
/// `register_service`/`register_exclusive_service`, and hosts declare the
/// set the consistency checker must verify.
pub trait RoutableService: Send + Sync + 'static {}

/// Marker for trait objects usable as service protocols.
///
/// ```ignore
/// pub trait LoginService: Send + Sync { fn login(&self, user: &str) -> bool; }
/// impl ServiceRoutable for dyn LoginService {}
/// ```
pub trait ServiceRoutable: 'static {}

/// Marker for trait objects usable as module (configuration) protocols.
pub trait ModuleRoutable: 'static {}

macro_rules! type_descriptor {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy)]
        pub struct $name {
            id: TypeId,
            name: &'static str,
        }

        impl $name {
            /// Full type name, as reported by [`std::any::type_name`].
            pub fn name(&self) -> &'static str {
                self.name
            }

            /// Last path segment of the type name, without `dyn`.
            pub fn short_name(&self) -> &'static str {
                short_type_name(self.name)
            }

            /// The [`TypeId`] this descriptor is keyed by.
            pub fn type_id(&self) -> TypeId {
                self.id
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.name).finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.short_name())
            }
        }
    };
}

type_descriptor!(
    /// Service protocol descriptor: the trait a caller wants to use a destination through.
    ServiceProtocol
);

type_descriptor!(
    /// Module protocol descriptor: the configuration trait a router's configuration satisfies.
    ModuleProtocol
);

type_descriptor!(
    /// Concrete destination type descriptor.
    DestinationType
);

impl ServiceProtocol {
    /// Descriptor for the service protocol `P` (usually `dyn SomeTrait`).
    pub fn of<P: ?Sized + ServiceRoutable>() -> Self {
        Self {
            id: TypeId::of::<P>(),
            name: type_name::<P>(),
        }
    }
}

impl ModuleProtocol {
    /// Descriptor for the module protocol `M` (usually `dyn SomeConfig`).
    pub fn of<M: ?Sized + ModuleRoutable>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: type_name::<M>(),
        }
    }
}

impl DestinationType {
    /// Descriptor for the concrete destination type `T`.
    pub fn of<T: RoutableService>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }
}

fn short_type_name(name: &str) -> &str {
    let name = name.strip_prefix("dyn ").unwrap_or(name);
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}

/// Stable identifier of a router, taken from [`ServiceRouter::name`](crate::ServiceRouter::name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouterId(String);

impl RouterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RouterId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// What a route asks the registry for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteTarget {
    Service(ServiceProtocol),
    Module(ModuleProtocol),
    Destination(DestinationType),
}

impl RouteTarget {
    pub fn name(&self) -> &'static str {
        match self {
            RouteTarget::Service(p) => p.name(),
            RouteTarget::Module(m) => m.name(),
            RouteTarget::Destination(t) => t.name(),
        }
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTarget::Service(p) => write!(f, "service {}", p),
            RouteTarget::Module(m) => write!(f, "module {}", m),
            RouteTarget::Destination(t) => write!(f, "type {}", t),
        }
    }
}

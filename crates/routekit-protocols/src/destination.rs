//! Opaque handle to a constructed destination.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A constructed destination.
///
/// Wraps the concrete value together with any trait-object views the router
/// attached, so a caller that asked for `dyn LoginService` can get an
/// `Arc<dyn LoginService>` back without knowing the concrete type.
/// Cloning is cheap and preserves identity.
#[derive(Clone)]
pub struct Destination {
    value: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
    views: Arc<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Destination {
    /// Wrap a concrete destination value.
    pub fn new<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            views: Arc::new(HashMap::new()),
        }
    }

    /// Attach a trait-object view of the destination.
    pub fn with_view<P: ?Sized + Send + Sync + 'static>(mut self, view: Arc<P>) -> Self {
        Arc::make_mut(&mut self.views).insert(TypeId::of::<P>(), Arc::new(view));
        self
    }

    /// Get the concrete value if it is a `T`.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value.clone().downcast::<T>().ok()
    }

    /// Get a previously attached trait-object view.
    pub fn view<P: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<P>> {
        self.views
            .get(&TypeId::of::<P>())
            .and_then(|view| view.downcast_ref::<Arc<P>>())
            .cloned()
    }

    /// Check whether the concrete value is a `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Check whether a view for `P` was attached.
    pub fn has_view<P: ?Sized + 'static>(&self) -> bool {
        self.views.contains_key(&TypeId::of::<P>())
    }

    /// Type name of the concrete value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether both handles point at the same destination.
    pub fn ptr_eq(&self, other: &Destination) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("type", &self.type_name)
            .field("views", &self.views.len())
            .finish()
    }
}

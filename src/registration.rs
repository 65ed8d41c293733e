//! Service registration types and the frozen registry.

use std::any::Any;
use std::sync::Arc;

use crate::descriptors::ServiceDescriptor;
use crate::error::DiResult;
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::observer::Observers;
use crate::options::OptionsDescriptor;
use crate::provider::{ResolverContext, ServiceProvider};

/// Type-erased Arc for storage
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Type-erased constructor stored for every registration
pub type Ctor = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>;

#[cfg(feature = "ahash")]
pub(crate) type KeyMap<V> = std::collections::HashMap<Key, V, ahash::RandomState>;
#[cfg(not(feature = "ahash"))]
pub(crate) type KeyMap<V> = std::collections::HashMap<Key, V>;

/// Service registration with lifetime and constructor
#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) lifetime: Lifetime,
    pub(crate) ctor: Ctor,
    /// Implementation type name for diagnostics (differs from the key for trait bindings)
    pub(crate) impl_name: Option<&'static str>,
}

impl Registration {
    pub(crate) fn new(lifetime: Lifetime, ctor: Ctor, impl_name: Option<&'static str>) -> Self {
        Self {
            lifetime,
            ctor,
            impl_name,
        }
    }
}

/// Immutable set of registrations produced by [`ServiceCollection::freeze`].
///
/// A frozen registry is shared behind an `Arc` and can build any number of
/// [`ServiceProvider`]s. Providers never share cached instances with each
/// other; the registry itself holds no instances.
///
/// [`ServiceCollection::freeze`]: crate::ServiceCollection::freeze
///
/// # Examples
///
/// ```rust
/// use snapshot_di::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Clock;
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton_factory::<Clock, _>(|_| Clock).unwrap();
/// let registry = services.freeze().unwrap();
///
/// let first = registry.build_provider();
/// let second = registry.build_provider();
/// assert!(!Arc::ptr_eq(&first.get_required::<Clock>(), &second.get_required::<Clock>()));
/// ```
pub struct FrozenRegistry {
    pub(crate) services: KeyMap<Registration>,
    /// Keys in first-registration order, for descriptors
    pub(crate) order: Vec<Key>,
    pub(crate) options: KeyMap<OptionsDescriptor>,
    pub(crate) allow_default_options: bool,
    pub(crate) observers: Observers,
}

impl FrozenRegistry {
    /// Builds a new provider with empty caches over this registry.
    pub fn build_provider(self: &Arc<Self>) -> ServiceProvider {
        ServiceProvider::build(self)
    }

    /// Returns true if a service is registered under `key`.
    pub fn contains(&self, key: &Key) -> bool {
        self.services.contains_key(key)
    }

    /// Returns true if options were registered under `key`.
    pub fn contains_options(&self, key: &Key) -> bool {
        self.options.contains_key(key)
    }

    /// Number of service registrations.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Describes every service registration in first-registration order.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        describe(&self.order, &self.services)
    }

    pub(crate) fn registration(&self, key: &Key) -> Option<&Registration> {
        self.services.get(key)
    }
}

pub(crate) fn describe(order: &[Key], services: &KeyMap<Registration>) -> Vec<ServiceDescriptor> {
    order
        .iter()
        .filter_map(|key| {
            services
                .get(key)
                .map(|reg| ServiceDescriptor::new(*key, reg.lifetime, reg.impl_name))
        })
        .collect()
}

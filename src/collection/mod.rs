//! Service collection module for dependency injection.
//!
//! This module contains the ServiceCollection type: the open, mutable side of
//! a registry. Registrations accumulate here during setup; [`freeze`] turns
//! them into an immutable [`FrozenRegistry`] from which providers are built.
//!
//! [`freeze`]: ServiceCollection::freeze

use std::sync::Arc;

use crate::descriptors::ServiceDescriptor;
use crate::error::{DiError, DiResult};
use crate::key::{key_of_options, key_of_trait, key_of_type, Key};
use crate::lifetime::Lifetime;
use crate::observer::{DiObserver, Observers};
use crate::options::{OptionsDescriptor, Options};
use crate::provider::{ResolverContext, ServiceProvider};
use crate::registration::{describe, AnyArc, FrozenRegistry, KeyMap, Registration};
use crate::traits::Resolver;

pub mod module_system;
pub use module_system::*;

/// Open registry used during application setup.
///
/// Every registration method returns `DiResult<&mut Self>` so calls chain
/// with `?`. Once [`freeze`](Self::freeze) (or [`build`](Self::build)) has
/// run, every further registration fails with
/// [`DiError::ConfigurationClosed`].
///
/// # Examples
///
/// ```rust
/// use snapshot_di::{DiError, ServiceCollection, Resolver};
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(8080u16).unwrap();
/// let registry = services.freeze().unwrap();
///
/// assert!(matches!(services.add_singleton(1u8), Err(DiError::ConfigurationClosed(_))));
/// assert_eq!(*registry.build_provider().get_required::<u16>(), 8080);
/// ```
pub struct ServiceCollection {
    services: KeyMap<Registration>,
    order: Vec<Key>,
    options: KeyMap<OptionsDescriptor>,
    observers: Observers,
    allow_default_options: bool,
    frozen: bool,
}

impl std::fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("order", &self.order)
            .field("frozen", &self.frozen)
            .finish_non_exhaustive()
    }
}

impl ServiceCollection {
    /// Creates a new empty service collection.
    pub fn new() -> Self {
        Self {
            services: KeyMap::default(),
            order: Vec::new(),
            options: KeyMap::default(),
            observers: Observers::new(),
            allow_default_options: false,
            frozen: false,
        }
    }

    fn ensure_open(&self, name: &'static str) -> DiResult<()> {
        if self.frozen {
            Err(DiError::ConfigurationClosed(name))
        } else {
            Ok(())
        }
    }

    /// Registers a type-erased constructor under `key`.
    ///
    /// Replaces any previous registration for the same key (last write wins).
    pub fn register<F>(&mut self, key: Key, lifetime: Lifetime, ctor: F) -> DiResult<&mut Self>
    where
        F: for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        self.insert(key, Registration::new(lifetime, Arc::new(ctor), None))
    }

    fn insert(&mut self, key: Key, registration: Registration) -> DiResult<&mut Self> {
        self.ensure_open(key.display_name())?;
        if self.services.insert(key, registration).is_none() {
            self.order.push(key);
        }
        Ok(self)
    }

    // ----- Concrete Type Registrations -----

    /// Registers a singleton instance.
    ///
    /// The value is moved into an `Arc` once. Every provider built from the
    /// frozen registry hands out that same `Arc`; use a factory when each
    /// provider needs its own instance.
    pub fn add_singleton<T: 'static + Send + Sync>(&mut self, value: T) -> DiResult<&mut Self> {
        let arc: AnyArc = Arc::new(value);
        let ctor = move |_: &ResolverContext<'_>| -> DiResult<AnyArc> { Ok(arc.clone()) };
        self.insert(
            key_of_type::<T>(),
            Registration::new(Lifetime::Singleton, Arc::new(ctor), Some(std::any::type_name::<T>())),
        )
    }

    /// Registers a singleton factory, invoked at most once per provider.
    ///
    /// ```rust
    /// # use snapshot_di::{ServiceCollection, Resolver};
    /// # use std::sync::Arc;
    /// struct Database { url: String }
    /// struct UserService { db: Arc<Database> }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(Database { url: "postgres://localhost".to_string() }).unwrap();
    /// services.add_singleton_factory::<UserService, _>(|resolver| {
    ///     UserService { db: resolver.get_required::<Database>() }
    /// }).unwrap();
    /// ```
    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Singleton, move |r| Ok(Arc::new(factory(r))))
    }

    /// Registers a fallible singleton factory.
    ///
    /// An error is recorded on the provider and returned to every later
    /// request for `T`; the factory is not called again.
    pub fn add_singleton_try_factory<T, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Singleton, move |r| factory(r).map(Arc::new))
    }

    /// Registers a singleton factory that returns the shared `Arc` itself.
    ///
    /// Useful when the factory also hands the instance to a disposer.
    pub fn add_singleton_arc_factory<T, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> Arc<T> + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Singleton, move |r| Ok(factory(r)))
    }

    /// Registers a transient factory that creates a new instance on every request.
    pub fn add_transient_factory<T, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Transient, move |r| Ok(Arc::new(factory(r))))
    }

    /// Registers a fallible transient factory.
    pub fn add_transient_try_factory<T, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Transient, move |r| factory(r).map(Arc::new))
    }

    fn add_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> DiResult<&mut Self>
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        let ctor = move |r: &ResolverContext<'_>| -> DiResult<AnyArc> {
            factory(r).map(|value| value as AnyArc)
        };
        self.insert(
            key_of_type::<T>(),
            Registration::new(lifetime, Arc::new(ctor), Some(std::any::type_name::<T>())),
        )
    }

    // ----- Trait Registrations -----

    /// Registers a singleton trait implementation.
    ///
    /// ```rust
    /// # use snapshot_di::{ServiceCollection, Resolver};
    /// # use std::sync::Arc;
    /// trait Logger: Send + Sync {
    ///     fn log(&self, message: &str);
    /// }
    ///
    /// struct FileLogger { path: String }
    /// impl Logger for FileLogger {
    ///     fn log(&self, _message: &str) {}
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// let logger = Arc::new(FileLogger { path: "/var/log/app.log".to_string() });
    /// services.add_singleton_trait::<dyn Logger>(logger).unwrap();
    /// ```
    pub fn add_singleton_trait<T>(&mut self, value: Arc<T>) -> DiResult<&mut Self>
    where
        T: ?Sized + 'static + Send + Sync,
    {
        // Stored as Arc<Arc<dyn Trait>> in Any
        let any_arc: AnyArc = Arc::new(value);
        let ctor = move |_: &ResolverContext<'_>| -> DiResult<AnyArc> { Ok(any_arc.clone()) };
        self.insert(
            key_of_trait::<T>(),
            Registration::new(Lifetime::Singleton, Arc::new(ctor), None),
        )
    }

    /// Registers a singleton trait factory. The factory must return an `Arc<Trait>`.
    pub fn add_singleton_trait_factory<Trait, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_trait_factory_impl::<Trait, _>(Lifetime::Singleton, move |r| Ok(factory(r)))
    }

    /// Registers a fallible singleton trait factory.
    pub fn add_singleton_trait_try_factory<Trait, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> DiResult<Arc<Trait>> + Send + Sync + 'static,
    {
        self.add_trait_factory_impl::<Trait, _>(Lifetime::Singleton, factory)
    }

    /// Registers a transient trait factory.
    pub fn add_transient_trait_factory<Trait, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_trait_factory_impl::<Trait, _>(Lifetime::Transient, move |r| Ok(factory(r)))
    }

    /// Registers a fallible transient trait factory.
    pub fn add_transient_trait_try_factory<Trait, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> DiResult<Arc<Trait>> + Send + Sync + 'static,
    {
        self.add_trait_factory_impl::<Trait, _>(Lifetime::Transient, factory)
    }

    fn add_trait_factory_impl<Trait, F>(&mut self, lifetime: Lifetime, factory: F) -> DiResult<&mut Self>
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext<'_>) -> DiResult<Arc<Trait>> + Send + Sync + 'static,
    {
        let ctor = move |r: &ResolverContext<'_>| -> DiResult<AnyArc> {
            factory(r).map(|value| Arc::new(value) as AnyArc)
        };
        self.insert(
            key_of_trait::<Trait>(),
            Registration::new(lifetime, Arc::new(ctor), None),
        )
    }

    // ----- Options -----

    /// Lets providers capture `T::default()` for options types that were never registered.
    ///
    /// Without this, requesting unregistered options fails with
    /// [`DiError::OptionsNotRegistered`].
    ///
    /// The policy covers `get_options::<T>()` only. The [`Options<T>`] service
    /// exists for types with a pipeline, so `get::<Options<T>>()` on a type
    /// that was never registered still fails with [`DiError::NotFound`]; call
    /// `add_options::<T>().register()` to expose the wrapper for plain defaults.
    pub fn allow_default_options(&mut self) -> DiResult<&mut Self> {
        self.ensure_open("default options policy")?;
        self.allow_default_options = true;
        Ok(self)
    }

    /// Returns the options pipeline for `T`, creating it on first use.
    ///
    /// Creating the pipeline also registers `Options<T>` as a singleton
    /// service whose value is the captured options.
    pub(crate) fn options_descriptor_mut<T>(&mut self) -> DiResult<&mut OptionsDescriptor>
    where
        T: Default + Send + Sync + 'static,
    {
        let key = key_of_options::<T>();
        self.ensure_open(key.display_name())?;
        if !self.options.contains_key(&key) {
            self.add_singleton_try_factory::<Options<T>, _>(|r| {
                r.get_options::<T>().map(Options::from_arc)
            })?;
        }
        Ok(self
            .options
            .entry(key)
            .or_insert_with(OptionsDescriptor::new::<T>))
    }

    // ----- Observers and introspection -----

    /// Adds an observer notified of every resolution on providers built from this collection.
    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> DiResult<&mut Self> {
        self.ensure_open("observer")?;
        self.observers.add(observer);
        Ok(self)
    }

    /// Returns true if a service is registered under `key`.
    pub fn contains(&self, key: &Key) -> bool {
        self.services.contains_key(key)
    }

    /// True once [`freeze`](Self::freeze) has run.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Describes every service registration in first-registration order.
    pub fn service_descriptors(&self) -> Vec<ServiceDescriptor> {
        describe(&self.order, &self.services)
    }

    /// Closes the collection and returns the immutable registry.
    ///
    /// Every later registration call (and a second `freeze`) fails with
    /// [`DiError::ConfigurationClosed`].
    pub fn freeze(&mut self) -> DiResult<Arc<FrozenRegistry>> {
        self.ensure_open("ServiceCollection")?;
        self.frozen = true;
        tracing::debug!(
            services = self.services.len(),
            options = self.options.len(),
            "service collection frozen"
        );
        Ok(Arc::new(FrozenRegistry {
            services: std::mem::take(&mut self.services),
            order: std::mem::take(&mut self.order),
            options: std::mem::take(&mut self.options),
            allow_default_options: self.allow_default_options,
            observers: std::mem::take(&mut self.observers),
        }))
    }

    /// Freezes the collection and builds one provider from it.
    pub fn build(&mut self) -> DiResult<ServiceProvider> {
        let registry = self.freeze()?;
        Ok(ServiceProvider::build(&registry))
    }
}

impl Default for ServiceCollection {
    fn default() -> Self {
        Self::new()
    }
}

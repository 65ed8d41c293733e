//! Resolver traits for service resolution.

use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::{key_of_options, key_of_trait, key_of_type, Key};
use crate::registration::AnyArc;
use crate::traits::Dispose;

/// Core resolver trait for object-safe service resolution.
///
/// Implemented by [`ServiceProvider`](crate::ServiceProvider), which starts a
/// fresh resolution chain per call, and by
/// [`ResolverContext`](crate::ResolverContext), which continues the chain of
/// the factory it was handed to.
///
/// Most users should use the [`Resolver`] trait instead, which provides
/// generic methods built on top of this one.
pub trait ResolverCore: Send + Sync {
    /// Resolves a single service by key.
    ///
    /// # Returns
    ///
    /// * `Ok(AnyArc)` - The resolved service wrapped in `Arc<dyn Any>`
    /// * `Err(DiError)` - Resolution error (not found, circular, failed factory, etc.)
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc>;

    /// Resolves the captured options value for an options key.
    ///
    /// `fallback` builds the default value when the options type was never
    /// registered and the registry allows default options.
    fn resolve_options_any(&self, key: &Key, fallback: fn() -> AnyArc) -> DiResult<AnyArc>;

    /// Registers a synchronous disposal hook on the owning provider.
    fn push_sync_disposer(&self, f: Box<dyn FnOnce() + Send>);
}

fn default_any<T: Default + Send + Sync + 'static>() -> AnyArc {
    Arc::new(T::default())
}

/// High-level resolver interface with generic methods for type-safe service resolution.
///
/// # Examples
///
/// ```
/// use snapshot_di::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str);
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) {
///         println!("LOG: {}", msg);
///     }
/// }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(42usize).unwrap();
/// collection.add_singleton_trait(Arc::new(ConsoleLogger) as Arc<dyn Logger>).unwrap();
///
/// let provider = collection.build().unwrap();
///
/// let number = provider.get_required::<usize>();
/// assert_eq!(*number, 42);
///
/// let logger = provider.get_required_trait::<dyn Logger>();
/// logger.log("Service resolved successfully");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves a concrete service type.
    fn get<T: 'static + Send + Sync>(&self) -> DiResult<Arc<T>> {
        let any = self.resolve_any(&key_of_type::<T>())?;
        any.downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Resolves a trait binding.
    fn get_trait<T: ?Sized + 'static + Send + Sync>(&self) -> DiResult<Arc<T>>
    where
        Arc<T>: 'static,
    {
        let any = self.resolve_any(&key_of_trait::<T>())?;
        // Trait bindings are stored as Arc<Arc<dyn Trait>>
        any.downcast::<Arc<T>>()
            .map(|boxed| (*boxed).clone())
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Resolves the options value captured for `T` by this provider.
    fn get_options<T: Default + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let any = self.resolve_options_any(&key_of_options::<T>(), default_any::<T>)?;
        any.downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Resolves a concrete service, panicking on failure.
    fn get_required<T: 'static + Send + Sync>(&self) -> Arc<T> {
        self.get::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", std::any::type_name::<T>(), e))
    }

    /// Resolves a trait binding, panicking on failure.
    fn get_required_trait<T: ?Sized + 'static + Send + Sync>(&self) -> Arc<T>
    where
        Arc<T>: 'static,
    {
        self.get_trait::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve trait {}: {}", std::any::type_name::<T>(), e))
    }

    /// Registers a service for disposal when the provider shuts down.
    fn register_disposer<T: Dispose>(&self, service: Arc<T>) {
        self.push_sync_disposer(Box::new(move || service.dispose()));
    }
}

//! Service provider module for dependency injection.
//!
//! A [`ServiceProvider`] is a point-in-time resolution context built from a
//! [`FrozenRegistry`]. It owns the singleton and options caches for its
//! lifetime; clones share those caches, separately built providers do not.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::error::{DiError, DiResult};
use crate::internal::{ChainLink, DisposeBag};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::registration::{AnyArc, FrozenRegistry, Registration};
use crate::traits::{Resolver, ResolverCore};

pub mod context;
pub mod snapshot;

pub use context::ResolverContext;
pub use snapshot::SnapshotCache;
use snapshot::{Claim, SlotGuard};

/// Service provider for resolving dependencies from a frozen registry.
///
/// # Thread Safety
///
/// The provider is `Send + Sync` and cheap to clone. All first-access races
/// on a singleton or options slot are serialized through one lock owned by
/// this provider: exactly one caller runs the factory, the others block until
/// it publishes and then observe the same instance.
///
/// # Examples
///
/// ```
/// use snapshot_di::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(Database { url: "postgres://localhost".to_string() }).unwrap();
/// collection.add_transient_factory::<UserService, _>(|resolver| {
///     UserService { db: resolver.get_required::<Database>() }
/// }).unwrap();
///
/// let provider = collection.build().unwrap();
/// let user_service = provider.get_required::<UserService>();
/// assert_eq!(user_service.db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    registry: Arc<FrozenRegistry>,
    cache: SnapshotCache,
    disposers: Mutex<DisposeBag>,
}

impl ServiceProvider {
    /// Builds a new provider with empty caches.
    pub fn build(registry: &Arc<FrozenRegistry>) -> Self {
        debug!(services = registry.len(), "building service provider");
        Self {
            inner: Arc::new(ProviderInner {
                registry: registry.clone(),
                cache: SnapshotCache::new(),
                disposers: Mutex::new(DisposeBag::default()),
            }),
        }
    }

    /// The registry this provider resolves against.
    pub fn registry(&self) -> &Arc<FrozenRegistry> {
        &self.inner.registry
    }

    /// Read access to this provider's caches.
    pub fn snapshot(&self) -> &SnapshotCache {
        &self.inner.cache
    }

    /// Resolves `key` on a fresh resolution chain.
    pub fn resolve(&self, key: &Key) -> DiResult<AnyArc> {
        self.resolve_in(key, None)
    }

    /// True if both handles refer to the same provider snapshot.
    pub fn same_snapshot(&self, other: &ServiceProvider) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Runs every registered disposal hook, newest first.
    pub fn dispose_all(&self) {
        let hooks = self.inner.disposers.lock().drain_reverse();
        for hook in hooks {
            hook();
        }
    }

    pub(crate) fn push_sync_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.inner.disposers.lock().push_sync(f);
    }

    pub(crate) fn resolve_in(&self, key: &Key, parent: Option<&ChainLink<'_>>) -> DiResult<AnyArc> {
        let reg = self
            .inner
            .registry
            .registration(key)
            .ok_or(DiError::NotFound(key.display_name()))?;
        let link = ChainLink::enter(parent, *key)?;

        let observers = &self.inner.registry.observers;
        if !observers.has_observers() {
            return self.resolve_registration(reg, &link);
        }

        let start = Instant::now();
        observers.resolving(key);
        let result = self.resolve_registration(reg, &link);
        match &result {
            Ok(_) => observers.resolved(key, start.elapsed()),
            Err(err) => observers.factory_failed(key, err),
        }
        result
    }

    fn resolve_registration(&self, reg: &Registration, link: &ChainLink<'_>) -> DiResult<AnyArc> {
        match reg.lifetime {
            Lifetime::Transient => (reg.ctor)(&ResolverContext::new(self, link)),
            Lifetime::Singleton => self.resolve_singleton(reg, link),
        }
    }

    fn resolve_singleton(&self, reg: &Registration, link: &ChainLink<'_>) -> DiResult<AnyArc> {
        let key = *link.key();
        match self.inner.cache.claim(link) {
            Claim::Ready(result) => {
                trace!(service = key.display_name(), "singleton cache hit");
                result
            }
            Claim::Owned => {
                let guard = SlotGuard::new(&self.inner.cache, key);
                debug!(service = key.display_name(), "constructing singleton");
                let result = (reg.ctor)(&ResolverContext::new(self, link));
                if let Err(err) = &result {
                    warn!(service = key.display_name(), error = %err, "singleton factory failed");
                }
                guard.publish(result)
            }
        }
    }

    pub(crate) fn capture_options_in(
        &self,
        key: &Key,
        fallback: fn() -> AnyArc,
        parent: Option<&ChainLink<'_>>,
    ) -> DiResult<AnyArc> {
        let registry = &self.inner.registry;
        let descriptor = registry.options.get(key);
        if descriptor.is_none() && !registry.allow_default_options {
            return Err(DiError::OptionsNotRegistered(key.display_name()));
        }
        let link = ChainLink::enter(parent, *key)?;

        match self.inner.cache.claim(&link) {
            Claim::Ready(result) => result,
            Claim::Owned => {
                let guard = SlotGuard::new(&self.inner.cache, *key);
                let result = match descriptor {
                    Some(descriptor) => {
                        debug!(
                            options = key.display_name(),
                            callbacks = descriptor.configure_count(),
                            "capturing options"
                        );
                        descriptor.capture(&ResolverContext::new(self, &link))
                    }
                    None => {
                        debug!(options = key.display_name(), "capturing default options");
                        Ok(fallback())
                    }
                };
                guard.publish(result)
            }
        }
    }

    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut s = String::new();
        s.push_str("=== Service Provider Debug ===\n");
        s.push_str("Registrations:\n");
        for descriptor in self.inner.registry.descriptors() {
            s.push_str(&format!("  {}\n", descriptor));
        }
        s.push_str("Slots:\n");
        for (key, state) in self.inner.cache.describe_slots() {
            s.push_str(&format!("  {}: {}\n", key.display_name(), state));
        }
        s
    }
}

impl Drop for ProviderInner {
    fn drop(&mut self) {
        if !self.disposers.get_mut().is_empty() {
            warn!("ServiceProvider dropped with undisposed resources; call dispose_all() before dropping");
        }
    }
}

impl ResolverCore for ServiceProvider {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.resolve_in(key, None)
    }

    fn resolve_options_any(&self, key: &Key, fallback: fn() -> AnyArc) -> DiResult<AnyArc> {
        self.capture_options_in(key, fallback, None)
    }

    fn push_sync_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        ServiceProvider::push_sync_disposer(self, f);
    }
}

impl Resolver for ServiceProvider {}

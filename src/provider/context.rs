//! Resolver context for dependency injection.
//!
//! This module contains the ResolverContext type which provides
//! the interface for factory functions to resolve dependencies.

use crate::error::DiResult;
use crate::internal::ChainLink;
use crate::key::Key;
use crate::provider::ServiceProvider;
use crate::registration::AnyArc;
use crate::traits::{Resolver, ResolverCore};

/// Context passed to factory functions and options callbacks.
///
/// Resolutions made through a context belong to the resolution that created
/// it: they share its in-progress chain (so cycles are detected) and its
/// provider (so singletons come from the same snapshot).
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
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database { url: "postgres://localhost".to_string() }).unwrap();
/// services.add_transient_factory::<UserService, _>(|resolver| {
///     UserService { db: resolver.get_required::<Database>() }
/// }).unwrap();
///
/// let provider = services.build().unwrap();
/// let users = provider.get_required::<UserService>();
/// assert!(Arc::ptr_eq(&users.db, &provider.get_required::<Database>()));
/// ```
pub struct ResolverContext<'a> {
    provider: &'a ServiceProvider,
    link: &'a ChainLink<'a>,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(provider: &'a ServiceProvider, link: &'a ChainLink<'a>) -> Self {
        Self { provider, link }
    }

    /// The provider this resolution runs against.
    pub fn provider(&self) -> &ServiceProvider {
        self.provider
    }

    /// Names of the services being constructed, outermost first.
    pub fn resolution_path(&self) -> Vec<&'static str> {
        self.link.path()
    }
}

impl<'a> ResolverCore for ResolverContext<'a> {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.provider.resolve_in(key, Some(self.link))
    }

    fn resolve_options_any(&self, key: &Key, fallback: fn() -> AnyArc) -> DiResult<AnyArc> {
        self.provider.capture_options_in(key, fallback, Some(self.link))
    }

    fn push_sync_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.provider.push_sync_disposer(f);
    }
}

impl<'a> Resolver for ResolverContext<'a> {}

//! Diagnostic observers for dependency injection traceability.
//!
//! Observers are registered on the [`ServiceCollection`](crate::ServiceCollection)
//! and frozen with it; every provider built from the registry reports to them.

use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;
use crate::key::Key;

/// Observer trait for dependency injection resolution events.
///
/// Observer calls are made synchronously on the resolving thread. Keep
/// implementations lightweight.
///
/// # Examples
///
/// ```
/// use snapshot_di::{DiError, DiObserver, Key, Resolver, ServiceCollection};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct CountingObserver {
///     resolved: AtomicUsize,
/// }
///
/// impl DiObserver for CountingObserver {
///     fn resolving(&self, _key: &Key) {}
///     fn resolved(&self, _key: &Key, _duration: Duration) {
///         self.resolved.fetch_add(1, Ordering::SeqCst);
///     }
///     fn factory_failed(&self, _key: &Key, _error: &DiError) {}
/// }
///
/// let observer = Arc::new(CountingObserver::default());
/// let mut services = ServiceCollection::new();
/// services.add_observer(observer.clone()).unwrap();
/// services.add_singleton(7u8).unwrap();
///
/// let provider = services.build().unwrap();
/// provider.get_required::<u8>();
/// provider.get_required::<u8>();
/// assert_eq!(observer.resolved.load(Ordering::SeqCst), 2);
/// ```
pub trait DiObserver: Send + Sync {
    /// Called before a service is resolved.
    fn resolving(&self, key: &Key);

    /// Called after a service resolved successfully, cache hits included.
    fn resolved(&self, key: &Key, duration: Duration);

    /// Called when a resolution returned an error.
    fn factory_failed(&self, key: &Key, error: &DiError);
}

#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn resolving(&self, key: &Key) {
        for observer in &self.observers {
            observer.resolving(key);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, key: &Key, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(key, duration);
        }
    }

    #[inline]
    pub(crate) fn factory_failed(&self, key: &Key, error: &DiError) {
        for observer in &self.observers {
            observer.factory_failed(key, error);
        }
    }
}

/// Observer that forwards resolution events to `tracing`.
///
/// Events are emitted under the `snapshot_di::resolve` target.
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self {
            prefix: "snapshot-di".to_string(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl DiObserver for LoggingObserver {
    fn resolving(&self, key: &Key) {
        tracing::debug!(target: "snapshot_di::resolve", prefix = %self.prefix, service = key.display_name(), "resolving");
    }

    fn resolved(&self, key: &Key, duration: Duration) {
        tracing::debug!(
            target: "snapshot_di::resolve",
            prefix = %self.prefix,
            service = key.display_name(),
            elapsed_us = duration.as_micros() as u64,
            "resolved"
        );
    }

    fn factory_failed(&self, key: &Key, error: &DiError) {
        tracing::warn!(
            target: "snapshot_di::resolve",
            prefix = %self.prefix,
            service = key.display_name(),
            error = %error,
            "resolution failed"
        );
    }
}

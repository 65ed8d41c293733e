//! Disposal trait for resource cleanup.

/// Trait for synchronous resource disposal.
///
/// Implement this for services that need structured teardown when their
/// provider shuts down. Hooks run in LIFO order from
/// [`ServiceProvider::dispose_all`](crate::ServiceProvider::dispose_all).
///
/// # Examples
///
/// ```
/// use snapshot_di::{Dispose, ServiceCollection, Resolver};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct Outbox {
///     flushed: AtomicBool,
/// }
///
/// impl Dispose for Outbox {
///     fn dispose(&self) {
///         self.flushed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton_arc_factory::<Outbox, _>(|resolver| {
///     let outbox = Arc::new(Outbox { flushed: AtomicBool::new(false) });
///     resolver.register_disposer(outbox.clone());
///     outbox
/// }).unwrap();
///
/// let provider = services.build().unwrap();
/// let outbox = provider.get_required::<Outbox>();
/// provider.dispose_all();
/// assert!(outbox.flushed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}

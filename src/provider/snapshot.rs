//! Per-provider caches for singleton instances and captured options.
//!
//! Each slot moves through `Unresolved -> Resolving -> Resolved | Failed`.
//! `Unresolved` is simply the absence of an entry. The lock is held only to
//! read or flip slot states, never while a factory runs.

use std::collections::HashMap;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

use crate::error::{DiError, DiResult};
use crate::internal::ChainLink;
use crate::key::Key;
use crate::registration::{AnyArc, KeyMap};

#[derive(Clone)]
enum Slot {
    Resolving { owner: ThreadId },
    Resolved(AnyArc),
    Failed(DiError),
}

#[derive(Default)]
struct CacheState {
    singletons: KeyMap<Slot>,
    options: KeyMap<Slot>,
    /// Key each blocked thread is waiting on
    waiting: HashMap<ThreadId, Key>,
}

impl CacheState {
    fn slots(&self, key: &Key) -> &KeyMap<Slot> {
        if key.is_options() {
            &self.options
        } else {
            &self.singletons
        }
    }

    fn slots_mut(&mut self, key: &Key) -> &mut KeyMap<Slot> {
        if key.is_options() {
            &mut self.options
        } else {
            &mut self.singletons
        }
    }

    fn owner_of(&self, key: &Key) -> Option<ThreadId> {
        match self.slots(key).get(key) {
            Some(Slot::Resolving { owner }) => Some(*owner),
            _ => None,
        }
    }

    /// True when `owner` is (transitively) blocked on a slot held by `me`.
    fn waits_on(&self, owner: ThreadId, me: ThreadId) -> bool {
        let mut current = owner;
        for _ in 0..=self.waiting.len() {
            if current == me {
                return true;
            }
            match self.waiting.get(&current).and_then(|key| self.owner_of(key)) {
                Some(next) => current = next,
                None => return false,
            }
        }
        false
    }
}

/// Outcome of claiming a slot for resolution.
pub(crate) enum Claim {
    /// The slot already holds a value or a terminal failure.
    Ready(DiResult<AnyArc>),
    /// The caller now owns the slot and must publish a result.
    Owned,
}

/// Singleton and options caches for one [`ServiceProvider`].
///
/// Reads are open to anyone; slot transitions are driven by the provider.
/// Dropping the provider drops the cache and every instance in it.
///
/// [`ServiceProvider`]: crate::ServiceProvider
#[derive(Default)]
pub struct SnapshotCache {
    state: Mutex<CacheState>,
    ready: Condvar,
}

impl SnapshotCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the cached singleton for `key`, if it has been resolved.
    pub fn get_cached(&self, key: &Key) -> Option<AnyArc> {
        self.resolved(&self.state.lock().singletons, key)
    }

    /// Returns the captured options value for `key`, if it has been resolved.
    pub fn get_cached_options(&self, key: &Key) -> Option<AnyArc> {
        self.resolved(&self.state.lock().options, key)
    }

    /// Number of singleton slots that hold a value.
    pub fn cached_count(&self) -> usize {
        let state = self.state.lock();
        state
            .singletons
            .values()
            .filter(|slot| matches!(slot, Slot::Resolved(_)))
            .count()
    }

    /// Returns the terminal failure recorded for `key`, if any.
    pub fn failure(&self, key: &Key) -> Option<DiError> {
        let state = self.state.lock();
        match state.slots(key).get(key) {
            Some(Slot::Failed(err)) => Some(err.clone()),
            _ => None,
        }
    }

    pub(crate) fn put_cached(&self, key: Key, value: AnyArc) {
        debug_assert!(!key.is_options());
        self.publish(key, Ok(value));
    }

    pub(crate) fn put_cached_options(&self, key: Key, value: AnyArc) {
        debug_assert!(key.is_options());
        self.publish(key, Ok(value));
    }

    fn resolved(&self, slots: &KeyMap<Slot>, key: &Key) -> Option<AnyArc> {
        match slots.get(key) {
            Some(Slot::Resolved(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Claims the slot for `link.key()`, blocking while another thread owns it.
    ///
    /// A slot owned by the calling thread, or by a thread that is itself
    /// waiting on the caller, means the resolution can never finish and is
    /// reported as a circular dependency.
    pub(crate) fn claim(&self, link: &ChainLink<'_>) -> Claim {
        let key = *link.key();
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            match state.slots(&key).get(&key) {
                None => {
                    state.slots_mut(&key).insert(key, Slot::Resolving { owner: me });
                    return Claim::Owned;
                }
                Some(Slot::Resolved(value)) => return Claim::Ready(Ok(value.clone())),
                Some(Slot::Failed(err)) => return Claim::Ready(Err(err.clone())),
                Some(Slot::Resolving { owner }) => {
                    let owner = *owner;
                    if state.waits_on(owner, me) {
                        return Claim::Ready(Err(DiError::Circular(link.path())));
                    }
                    state.waiting.insert(me, key);
                    self.ready.wait(&mut state);
                    state.waiting.remove(&me);
                }
            }
        }
    }

    /// Stores the outcome for `key` and wakes every waiting thread.
    pub(crate) fn publish(&self, key: Key, result: DiResult<AnyArc>) {
        let slot = match result {
            Ok(value) => Slot::Resolved(value),
            Err(err) => Slot::Failed(err),
        };
        self.state.lock().slots_mut(&key).insert(key, slot);
        self.ready.notify_all();
    }

    #[cfg(feature = "diagnostics")]
    pub(crate) fn describe_slots(&self) -> Vec<(Key, &'static str)> {
        let state = self.state.lock();
        state
            .singletons
            .iter()
            .chain(state.options.iter())
            .map(|(key, slot)| {
                let label = match slot {
                    Slot::Resolving { .. } => "resolving",
                    Slot::Resolved(_) => "resolved",
                    Slot::Failed(_) => "failed",
                };
                (*key, label)
            })
            .collect()
    }
}

/// Owner's handle on a claimed slot.
///
/// If the owner unwinds before publishing, the slot is marked
/// [`DiError::FactoryPanicked`] so that waiting threads are released.
pub(crate) struct SlotGuard<'a> {
    cache: &'a SnapshotCache,
    key: Key,
    published: bool,
}

impl<'a> SlotGuard<'a> {
    pub(crate) fn new(cache: &'a SnapshotCache, key: Key) -> Self {
        Self {
            cache,
            key,
            published: false,
        }
    }

    pub(crate) fn publish(mut self, result: DiResult<AnyArc>) -> DiResult<AnyArc> {
        self.published = true;
        match &result {
            Ok(value) if self.key.is_options() => self.cache.put_cached_options(self.key, value.clone()),
            Ok(value) => self.cache.put_cached(self.key, value.clone()),
            Err(err) => self.cache.publish(self.key, Err(err.clone())),
        }
        result
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        if !self.published {
            self.cache
                .publish(self.key, Err(DiError::FactoryPanicked(self.key.display_name())));
        }
    }
}

//! Internal disposal bag for managing cleanup hooks.

/// Container for disposal hooks with LIFO execution order.
#[derive(Default)]
pub(crate) struct DisposeBag {
    sync: Vec<Box<dyn FnOnce() + Send>>,
}

impl DisposeBag {
    /// Add a synchronous disposal hook.
    pub(crate) fn push_sync(&mut self, f: Box<dyn FnOnce() + Send>) {
        self.sync.push(f);
    }

    /// Takes every hook out of the bag, newest first.
    ///
    /// Callers run the hooks after releasing whatever lock guards the bag, so
    /// a hook may resolve services or register further disposers.
    pub(crate) fn drain_reverse(&mut self) -> Vec<Box<dyn FnOnce() + Send>> {
        let mut hooks = std::mem::take(&mut self.sync);
        hooks.reverse();
        hooks
    }

    /// Check if the bag is empty (no disposers registered).
    pub(crate) fn is_empty(&self) -> bool {
        self.sync.is_empty()
    }
}

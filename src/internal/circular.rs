//! Circular dependency detection infrastructure.
//!
//! Every resolution call carries the chain of keys currently being
//! constructed on its call stack. The chain lives on the stack frames of the
//! resolver itself (one link per nested resolution), so two independent
//! resolutions never see each other's in-progress keys, even on one thread.

use crate::error::{DiError, DiResult};
use crate::key::Key;

/// Nested resolutions allowed before failing with `DepthExceeded`.
///
/// Kept low enough that an unoptimized build reaches it on a default 2 MiB
/// thread stack well before the stack runs out.
const MAX_DEPTH: usize = 256;

/// One in-progress resolution and a pointer to the one that requested it.
pub(crate) struct ChainLink<'a> {
    key: Key,
    parent: Option<&'a ChainLink<'a>>,
    depth: usize,
}

impl<'a> ChainLink<'a> {
    /// Pushes `key` onto the chain ending at `parent`.
    ///
    /// Fails with [`DiError::Circular`] when `key` is already in the chain and
    /// with [`DiError::DepthExceeded`] past the depth guard.
    pub(crate) fn enter(parent: Option<&'a ChainLink<'a>>, key: Key) -> DiResult<Self> {
        let depth = parent.map_or(0, |p| p.depth + 1);
        if let Some(parent) = parent {
            if parent.contains(&key) {
                let mut path = parent.path();
                path.push(key.display_name());
                return Err(DiError::Circular(path));
            }
        }
        if depth >= MAX_DEPTH {
            return Err(DiError::DepthExceeded(depth));
        }
        Ok(Self { key, parent, depth })
    }

    pub(crate) fn key(&self) -> &Key {
        &self.key
    }

    fn contains(&self, key: &Key) -> bool {
        let mut link = Some(self);
        while let Some(current) = link {
            if &current.key == key {
                return true;
            }
            link = current.parent;
        }
        false
    }

    /// Names from the outermost resolution down to this one.
    pub(crate) fn path(&self) -> Vec<&'static str> {
        let mut path = Vec::with_capacity(self.depth + 1);
        let mut link = Some(self);
        while let Some(current) = link {
            path.push(current.key.display_name());
            link = current.parent;
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::key_of_type;

    struct A;
    struct B;

    #[test]
    fn reports_path_of_cycle() {
        let a = ChainLink::enter(None, key_of_type::<A>()).unwrap();
        let b = ChainLink::enter(Some(&a), key_of_type::<B>()).unwrap();
        match ChainLink::enter(Some(&b), key_of_type::<A>()) {
            Err(DiError::Circular(path)) => {
                assert_eq!(path.len(), 3);
                assert!(path[0].ends_with("::A"));
                assert!(path[1].ends_with("::B"));
                assert!(path[2].ends_with("::A"));
            }
            _ => panic!("expected circular error"),
        }
    }

    #[test]
    fn siblings_do_not_conflict() {
        let a = ChainLink::enter(None, key_of_type::<A>()).unwrap();
        let b1 = ChainLink::enter(Some(&a), key_of_type::<B>()).unwrap();
        drop(b1);
        let b2 = ChainLink::enter(Some(&a), key_of_type::<B>());
        assert!(b2.is_ok());
    }
}

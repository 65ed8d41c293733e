//! Service lifetime definitions.

/// Service lifetimes controlling instance caching behavior
///
/// # Examples
///
/// ```rust
/// use snapshot_di::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct RequestModel { id: u32 }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database { url: "postgres://localhost".to_string() }).unwrap();
/// services.add_transient_factory::<RequestModel, _>(|_| RequestModel { id: 7 }).unwrap();
///
/// let provider = services.build().unwrap();
///
/// let db1 = provider.get_required::<Database>();
/// let db2 = provider.get_required::<Database>();
/// assert!(Arc::ptr_eq(&db1, &db2));
///
/// let model1 = provider.get_required::<RequestModel>();
/// let model2 = provider.get_required::<RequestModel>();
/// assert!(!Arc::ptr_eq(&model1, &model2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// One instance per provider, created on first request
    ///
    /// The instance is cached on the provider that built it. Providers built
    /// from the same frozen registry each construct their own instance.
    Singleton,
    /// New instance per resolution, never cached
    Transient,
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lifetime::Singleton => f.write_str("singleton"),
            Lifetime::Transient => f.write_str("transient"),
        }
    }
}

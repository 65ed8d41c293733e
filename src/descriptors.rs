//! Service descriptors for introspection and diagnostics.

use crate::key::Key;
use crate::lifetime::Lifetime;

/// Service descriptor for introspection and diagnostics
///
/// Describes one registration: its key, its lifetime, and the concrete type
/// behind it when known. Descriptors are produced both before and after a
/// collection is frozen.
///
/// # Examples
///
/// ```rust
/// use snapshot_di::{ServiceCollection, Lifetime};
/// use std::sync::Arc;
///
/// struct Database { url: String }
///
/// trait Logger: Send + Sync {}
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {}
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database { url: "postgres://localhost".to_string() }).unwrap();
/// services.add_singleton_trait(Arc::new(ConsoleLogger) as Arc<dyn Logger>).unwrap();
///
/// let descriptors = services.service_descriptors();
/// assert_eq!(descriptors.len(), 2);
///
/// let db = descriptors.iter().find(|d| d.type_name().contains("Database")).unwrap();
/// assert_eq!(db.lifetime, Lifetime::Singleton);
/// assert!(!db.is_trait());
///
/// let logger = descriptors.iter().find(|d| d.is_trait()).unwrap();
/// assert!(logger.type_name().contains("Logger"));
/// ```
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    /// The service key
    pub key: Key,
    /// Service lifetime
    pub lifetime: Lifetime,
    /// Implementation type name (if available)
    pub impl_type_name: Option<&'static str>,
}

impl ServiceDescriptor {
    pub(crate) fn new(key: Key, lifetime: Lifetime, impl_type_name: Option<&'static str>) -> Self {
        Self {
            key,
            lifetime,
            impl_type_name,
        }
    }

    /// Get the type/trait name
    pub fn type_name(&self) -> &'static str {
        self.key.display_name()
    }

    /// Check if this descriptor is a trait binding
    pub fn is_trait(&self) -> bool {
        matches!(self.key, Key::Trait(_))
    }
}

impl std::fmt::Display for ServiceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.impl_type_name {
            Some(imp) if imp != self.type_name() => {
                write!(f, "{} ({}) => {}", self.type_name(), self.lifetime, imp)
            }
            _ => write!(f, "{} ({})", self.type_name(), self.lifetime),
        }
    }
}

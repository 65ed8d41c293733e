//! Error types for the dependency injection container.

use std::fmt;

/// Dependency injection errors
///
/// Every failure is returned to the caller of the registration or resolution
/// method that hit it. Errors are `Clone` because a singleton or options slot
/// that failed once keeps its error and hands a copy to every later caller.
///
/// # Examples
///
/// ```rust
/// use snapshot_di::{DiError, ServiceCollection, Resolver};
///
/// let provider = ServiceCollection::new().build().unwrap();
/// match provider.get::<String>() {
///     Err(DiError::NotFound(type_name)) => {
///         assert_eq!(type_name, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use snapshot_di::DiError;
///
/// let circular = DiError::Circular(vec!["ServiceA", "ServiceB", "ServiceA"]);
/// assert_eq!(circular.to_string(), "Circular dependency: ServiceA -> ServiceB -> ServiceA");
///
/// let failed = DiError::factory("Mailer", "smtp host missing");
/// assert_eq!(failed.to_string(), "Factory for Mailer failed: smtp host missing");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiError {
    /// Service not registered
    NotFound(&'static str),
    /// Options type never registered and no default fallback configured
    OptionsNotRegistered(&'static str),
    /// Registration attempted after the collection was frozen
    ConfigurationClosed(&'static str),
    /// Type downcast failed
    TypeMismatch(&'static str),
    /// Circular dependency detected (includes path)
    Circular(Vec<&'static str>),
    /// Maximum recursion depth exceeded
    DepthExceeded(usize),
    /// A fallible factory reported an error
    Factory {
        service: &'static str,
        message: String,
    },
    /// A factory panicked while constructing the service
    FactoryPanicked(&'static str),
    /// An options validator rejected the captured value
    OptionsValidation {
        options: &'static str,
        message: String,
    },
}

impl DiError {
    /// Builds a [`DiError::Factory`] for the given service name.
    pub fn factory(service: &'static str, message: impl fmt::Display) -> Self {
        DiError::Factory {
            service,
            message: message.to_string(),
        }
    }

    /// Builds a [`DiError::Factory`] named after `T`.
    pub fn factory_for<T: ?Sized>(message: impl fmt::Display) -> Self {
        Self::factory(std::any::type_name::<T>(), message)
    }
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::NotFound(name) => write!(f, "Service not found: {}", name),
            DiError::OptionsNotRegistered(name) => write!(f, "Options not registered: {}", name),
            DiError::ConfigurationClosed(name) => {
                write!(f, "Cannot register {}: service collection is frozen", name)
            }
            DiError::TypeMismatch(name) => write!(f, "Type mismatch for: {}", name),
            DiError::Circular(path) => {
                write!(f, "Circular dependency: {}", path.join(" -> "))
            }
            DiError::DepthExceeded(depth) => write!(f, "Max depth {} exceeded", depth),
            DiError::Factory { service, message } => {
                write!(f, "Factory for {} failed: {}", service, message)
            }
            DiError::FactoryPanicked(name) => write!(f, "Factory for {} panicked", name),
            DiError::OptionsValidation { options, message } => {
                write!(f, "Options<{}> validation failed: {}", options, message)
            }
        }
    }
}

impl std::error::Error for DiError {}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;

//! Service module system for modular registration.
//!
//! This module provides the trait for organizing service registrations into
//! reusable modules.

use crate::{DiResult, ServiceCollection};

/// A module that can register services with a ServiceCollection.
///
/// # Example
///
/// ```rust
/// use snapshot_di::{ServiceCollection, ServiceModule, DiResult, Resolver};
///
/// #[derive(Default)]
/// struct UserConfig { page_size: usize }
///
/// struct UserService { page_size: usize }
///
/// struct UserModule;
///
/// impl ServiceModule for UserModule {
///     fn register_services(self, services: &mut ServiceCollection) -> DiResult<()> {
///         services
///             .configure_options::<UserConfig, _>(|_, c| c.page_size = 50)?
///             .add_transient_try_factory::<UserService, _>(|r| {
///                 let config = r.get_options::<UserConfig>()?;
///                 Ok(UserService { page_size: config.page_size })
///             })?;
///         Ok(())
///     }
/// }
///
/// # fn main() -> DiResult<()> {
/// let mut services = ServiceCollection::new();
/// let provider = services.add_module(UserModule)?.build()?;
/// assert_eq!(provider.get::<UserService>()?.page_size, 50);
/// # Ok(())
/// # }
/// ```
pub trait ServiceModule {
    /// Register this module's services with the ServiceCollection.
    fn register_services(self, services: &mut ServiceCollection) -> DiResult<()>;
}

impl ServiceCollection {
    /// Lets `module` register its services into this collection.
    pub fn add_module<M: ServiceModule>(&mut self, module: M) -> DiResult<&mut Self> {
        module.register_services(self)?;
        Ok(self)
    }
}

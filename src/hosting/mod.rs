//! Application host wiring.
//!
//! [`configure_services`] registers a small account application: a database
//! context, user store and token providers, data protection and message
//! senders. [`run_repro`] builds two providers from one frozen registry and
//! reports the data protection discriminator each of them captured.
//!
//! ```
//! use snapshot_di::hosting::{configure_services, run_repro, AppConfiguration, HostingEnvironment};
//! use snapshot_di::ServiceCollection;
//!
//! let configuration = AppConfiguration::builder()
//!     .add_in_memory([("ConnectionStrings:DefaultConnection", "Server=(localdb);Database=app")])
//!     .build()
//!     .unwrap();
//! let environment = HostingEnvironment::new("repro", "/srv/repro");
//!
//! let mut services = ServiceCollection::new();
//! configure_services(&mut services, &configuration, &environment).unwrap();
//! let report = run_repro(&services.freeze().unwrap()).unwrap();
//! assert_eq!(report.discriminators(), ["app", "app"]);
//! ```

use std::sync::Arc;

use crate::collection::ServiceCollection;
use crate::error::DiResult;
use crate::registration::FrozenRegistry;

#[cfg(feature = "config")]
mod binder;
pub mod configuration;
pub mod data_protection;
pub mod environment;
pub mod identity;
pub mod messaging;
pub mod persistence;

pub use configuration::{AppConfiguration, ConfigurationBuilder, ConfigurationError};
pub use data_protection::{
    data_protection_provider, DataProtectionBuilder, DataProtectionExt, DataProtectionOptions,
    DataProtectionProvider, EphemeralDataProtectionProvider, ProtectionError,
};
pub use environment::{HostingEnvironment, ENVIRONMENT_VARIABLE};
pub use identity::{
    ApplicationUser, DataProtectorTokenProvider, IdentityBuilder, IdentityError, IdentityExt,
    IdentityOptions, InMemoryUserStore, UserStore,
};
pub use messaging::{
    add_message_senders, AuthMessageSender, EmailSender, MessageError, MessageSender, Outbox,
    SmsSender,
};
pub use persistence::{ApplicationDbContext, DbContextOptions, PersistenceError, PersistenceExt};

/// Connection string name read by [`configure_services`].
pub const DEFAULT_CONNECTION: &str = "DefaultConnection";

/// Registers the application's services.
///
/// The data protection discriminator is configured twice: `"my-app"` from the
/// setup callback and then `"app"` from `set_application_name`. Callbacks run
/// in registration order, so every provider captures `"app"`.
pub fn configure_services(
    services: &mut ServiceCollection,
    configuration: &AppConfiguration,
    environment: &HostingEnvironment,
) -> DiResult<()> {
    services
        .add_singleton(configuration.clone())?
        .add_singleton(environment.clone())?;

    let connection = configuration.connection_string(DEFAULT_CONNECTION).map(str::to_string);
    services.add_db_context(move |o| {
        if let Some(cs) = &connection {
            o.use_sql_server(cs.clone());
        }
    })?;

    services
        .add_identity()?
        .add_in_memory_stores()?
        .add_default_token_providers()?;
    #[cfg(feature = "config")]
    {
        if !configuration.section("Identity").is_empty() {
            let bound: IdentityOptions = configuration
                .bind("Identity")
                .map_err(|e| crate::DiError::factory_for::<IdentityOptions>(e))?;
            services.configure_options::<IdentityOptions, _>(move |_, o| *o = bound.clone())?;
        }
    }

    services
        .add_data_protection(|o| o.application_discriminator = Some("my-app".to_string()))?
        .set_application_name("app")?;

    add_message_senders(services)?;
    tracing::debug!(services = services.service_descriptors().len(), "services configured");
    Ok(())
}

/// Discriminators observed by two providers built from one registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReproReport {
    pub first: String,
    pub second: String,
    /// True when the second provider handed out its own protection provider.
    pub isolated: bool,
}

impl ReproReport {
    pub fn discriminators(&self) -> [&str; 2] {
        [&self.first, &self.second]
    }
}

/// Builds two providers from `registry` and reads the protection provider's
/// discriminator from each.
pub fn run_repro(registry: &Arc<FrozenRegistry>) -> DiResult<ReproReport> {
    let first_provider = registry.build_provider();
    let second_provider = registry.build_provider();

    let first = data_protection_provider(&first_provider)?;
    let second = data_protection_provider(&second_provider)?;
    let report = ReproReport {
        first: first.application_discriminator().to_string(),
        second: second.application_discriminator().to_string(),
        isolated: !Arc::ptr_eq(&first, &second),
    };
    tracing::info!(first = %report.first, second = %report.second, "discriminators captured");
    Ok(report)
}

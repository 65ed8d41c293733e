//! Database context registration.
//!
//! No database is opened; the context carries the captured connection
//! settings for the stores built on top of it.

use std::fmt;
use std::sync::Arc;

use crate::collection::ServiceCollection;
use crate::error::{DiError, DiResult};
use crate::traits::Resolver;

/// Connection settings captured once per provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbContextOptions {
    pub provider: Option<&'static str>,
    pub connection_string: Option<String>,
}

impl DbContextOptions {
    pub const SQL_SERVER: &'static str = "SqlServer";
    pub const IN_MEMORY: &'static str = "InMemory";

    pub fn use_sql_server(&mut self, connection_string: impl Into<String>) -> &mut Self {
        self.provider = Some(Self::SQL_SERVER);
        self.connection_string = Some(connection_string.into());
        self
    }

    pub fn use_in_memory(&mut self, name: impl Into<String>) -> &mut Self {
        self.provider = Some(Self::IN_MEMORY);
        self.connection_string = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// No provider was selected for the context
    ProviderMissing,
    /// The selected provider has an empty connection string
    ConnectionStringMissing(&'static str),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::ProviderMissing => write!(f, "No database provider configured"),
            PersistenceError::ConnectionStringMissing(provider) => {
                write!(f, "Connection string missing for provider {}", provider)
            }
        }
    }
}

impl std::error::Error for PersistenceError {}

/// Unit of work over the application database.
#[derive(Debug, Clone)]
pub struct ApplicationDbContext {
    options: Arc<DbContextOptions>,
}

impl ApplicationDbContext {
    pub fn new(options: Arc<DbContextOptions>) -> Result<Self, PersistenceError> {
        let provider = options.provider.ok_or(PersistenceError::ProviderMissing)?;
        match options.connection_string.as_deref() {
            Some(cs) if !cs.trim().is_empty() => Ok(Self { options }),
            _ => Err(PersistenceError::ConnectionStringMissing(provider)),
        }
    }

    pub fn options(&self) -> &Arc<DbContextOptions> {
        &self.options
    }

    pub fn provider(&self) -> &'static str {
        self.options.provider.unwrap_or(DbContextOptions::IN_MEMORY)
    }

    pub fn connection_string(&self) -> &str {
        self.options.connection_string.as_deref().unwrap_or_default()
    }
}

/// Registers [`ApplicationDbContext`] on a [`ServiceCollection`].
pub trait PersistenceExt {
    /// Appends `configure` to the [`DbContextOptions`] pipeline and registers
    /// the context as transient. Resolving the context fails while no
    /// provider or connection string is configured.
    fn add_db_context<F>(&mut self, configure: F) -> DiResult<&mut Self>
    where
        F: Fn(&mut DbContextOptions) + Send + Sync + 'static;
}

impl PersistenceExt for ServiceCollection {
    fn add_db_context<F>(&mut self, configure: F) -> DiResult<&mut Self>
    where
        F: Fn(&mut DbContextOptions) + Send + Sync + 'static,
    {
        self.configure_options::<DbContextOptions, _>(move |_, o| configure(o))?
            .add_transient_try_factory::<ApplicationDbContext, _>(|r| {
                ApplicationDbContext::new(r.get_options::<DbContextOptions>()?)
                    .map_err(|e| DiError::factory_for::<ApplicationDbContext>(e))
            })
    }
}

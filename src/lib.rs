//! # snapshot-di
//!
//! Dependency injection with per-provider singleton snapshots and deferred
//! options capture.
//!
//! ## Features
//!
//! - **Two-phase setup**: an open [`ServiceCollection`] is frozen into an
//!   immutable [`FrozenRegistry`]; registering after that is an error
//! - **Snapshot isolation**: every [`ServiceProvider`] built from a registry
//!   owns its singleton and options caches
//! - **Single evaluation**: singleton factories and options callbacks run at
//!   most once per provider, even under concurrent first access
//! - **Cycle detection**: on the resolution chain and across threads, reported
//!   as [`DiError::Circular`] with the full path
//! - **Terminal failures**: a failed singleton keeps its error; it is never retried
//!
//! ## Quick Start
//!
//! ```rust
//! use snapshot_di::{ServiceCollection, Resolver};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut services = ServiceCollection::new();
//! services
//!     .add_singleton(Database {
//!         connection_string: "postgres://localhost".to_string(),
//!     })
//!     .unwrap()
//!     .add_transient_factory::<UserService, _>(|resolver| UserService {
//!         db: resolver.get_required::<Database>(),
//!     })
//!     .unwrap();
//!
//! let provider = services.build().unwrap();
//! let user_service = provider.get_required::<UserService>();
//! assert_eq!(user_service.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Service Lifetimes
//!
//! - **Singleton**: created once per provider and shared by every resolution
//!   through it
//! - **Transient**: created fresh on every resolution
//!
//! ## Options Snapshots
//!
//! Configure callbacks are deferred until a provider first needs the value,
//! then run in registration order exactly once for that provider.
//!
//! ```rust
//! use snapshot_di::{ServiceCollection, Resolver};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct ProtectionOptions {
//!     discriminator: String,
//! }
//!
//! struct Protector {
//!     discriminator: String,
//! }
//!
//! let mut services = ServiceCollection::new();
//! services
//!     .configure_options::<ProtectionOptions, _>(|_, o| o.discriminator = "my-app".into())
//!     .unwrap()
//!     .configure_options::<ProtectionOptions, _>(|_, o| o.discriminator = "app".into())
//!     .unwrap()
//!     .add_singleton_try_factory::<Protector, _>(|r| {
//!         let options = r.get_options::<ProtectionOptions>()?;
//!         Ok(Protector { discriminator: options.discriminator.clone() })
//!     })
//!     .unwrap();
//!
//! let registry = services.freeze().unwrap();
//! let first = registry.build_provider();
//! let second = registry.build_provider();
//!
//! assert_eq!(first.get_required::<Protector>().discriminator, "app");
//! assert!(Arc::ptr_eq(&first.get_required::<Protector>(), &first.get_required::<Protector>()));
//! assert!(!Arc::ptr_eq(&first.get_required::<Protector>(), &second.get_required::<Protector>()));
//! ```

// Module declarations
pub mod collection;
pub mod descriptors;
pub mod error;
pub mod hosting;
pub mod key;
pub mod lifetime;
pub mod observer;
pub mod options;
pub mod provider;
pub mod traits;

// Internal modules
mod internal;
mod registration;

// Re-export core types
pub use collection::{ServiceCollection, ServiceModule};
pub use descriptors::ServiceDescriptor;
pub use error::{DiError, DiResult};
pub use key::{key_of_options, key_of_trait, key_of_type, Key};
pub use lifetime::Lifetime;
pub use observer::{DiObserver, LoggingObserver};
pub use options::{IOptions, Options, OptionsBuilder};
pub use provider::{ResolverContext, ServiceProvider, SnapshotCache};
pub use registration::{AnyArc, Ctor, FrozenRegistry};
pub use traits::{Dispose, Resolver, ResolverCore};

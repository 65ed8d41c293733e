//! Key-protection collaborator keyed by an application discriminator.
//!
//! The provider binds every payload it protects to a purpose chain whose
//! first element is the application discriminator. Payloads protected under
//! one discriminator do not unprotect under another, which is why the
//! discriminator a provider captures must never change during its lifetime.
//!
//! The envelope is a truncated SHA-256 tag over the purpose chain and the
//! payload, not encryption; payload bytes are carried in the clear.

use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::collection::ServiceCollection;
use crate::error::{DiError, DiResult};
use crate::key::key_of_trait;
use crate::traits::Resolver;

use super::environment::HostingEnvironment;

/// Options read once per provider when the protection provider is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataProtectionOptions {
    /// Isolates this application's payloads from other applications'.
    /// `None` or blank falls back to the content root path.
    pub application_discriminator: Option<String>,
}

/// Errors returned by [`DataProtectionProvider::unprotect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtectionError {
    /// Input shorter than the envelope header
    Truncated,
    /// Input does not start with the envelope magic
    UnknownFormat,
    /// Payload was protected under a different purpose chain
    PurposeMismatch,
}

impl fmt::Display for ProtectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtectionError::Truncated => write!(f, "Protected payload is truncated"),
            ProtectionError::UnknownFormat => write!(f, "Protected payload has an unknown format"),
            ProtectionError::PurposeMismatch => {
                write!(f, "Protected payload does not match the requested purposes")
            }
        }
    }
}

impl std::error::Error for ProtectionError {}

/// Protects payloads for a purpose chain rooted at the application discriminator.
pub trait DataProtectionProvider: Send + Sync {
    /// The discriminator captured when this provider was built.
    fn application_discriminator(&self) -> &str;

    /// Root purpose chain; the first element is the discriminator.
    fn purposes(&self) -> &[String];

    fn protect(&self, purposes: &[&str], plaintext: &[u8]) -> Vec<u8>;

    fn unprotect(&self, purposes: &[&str], protected: &[u8]) -> Result<Vec<u8>, ProtectionError>;
}

const MAGIC: [u8; 4] = *b"SDP\x01";
const TAG_LEN: usize = 8;
const HEADER_LEN: usize = MAGIC.len() + TAG_LEN;

/// In-process [`DataProtectionProvider`] with no persisted key ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EphemeralDataProtectionProvider {
    purposes: Vec<String>,
}

impl EphemeralDataProtectionProvider {
    pub fn new(application_discriminator: impl Into<String>) -> Self {
        Self {
            purposes: vec![application_discriminator.into()],
        }
    }

    /// Uses the configured discriminator, or the content root when none is set.
    pub fn from_options(options: &DataProtectionOptions, environment: &HostingEnvironment) -> Self {
        match options
            .application_discriminator
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
        {
            Some(discriminator) => Self::new(discriminator),
            None => Self::new(environment.content_root.display().to_string()),
        }
    }

    fn tag(&self, purposes: &[&str], payload: &[u8]) -> [u8; TAG_LEN] {
        let mut hasher = Sha256::new();
        for purpose in self.purposes.iter().map(String::as_str).chain(purposes.iter().copied()) {
            hasher.update((purpose.len() as u32).to_le_bytes());
            hasher.update(purpose.as_bytes());
        }
        hasher.update(payload);
        let digest = hasher.finalize();
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&digest[..TAG_LEN]);
        tag
    }
}

impl DataProtectionProvider for EphemeralDataProtectionProvider {
    fn application_discriminator(&self) -> &str {
        &self.purposes[0]
    }

    fn purposes(&self) -> &[String] {
        &self.purposes
    }

    fn protect(&self, purposes: &[&str], plaintext: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + plaintext.len());
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&self.tag(purposes, plaintext));
        out.extend_from_slice(plaintext);
        out
    }

    fn unprotect(&self, purposes: &[&str], protected: &[u8]) -> Result<Vec<u8>, ProtectionError> {
        if protected.len() < HEADER_LEN {
            return Err(ProtectionError::Truncated);
        }
        let (magic, rest) = protected.split_at(MAGIC.len());
        if magic != MAGIC {
            return Err(ProtectionError::UnknownFormat);
        }
        let (tag, payload) = rest.split_at(TAG_LEN);
        if tag != self.tag(purposes, payload) {
            return Err(ProtectionError::PurposeMismatch);
        }
        Ok(payload.to_vec())
    }
}

/// Returned by [`DataProtectionExt::add_data_protection`] for further setup.
pub struct DataProtectionBuilder<'a> {
    services: &'a mut ServiceCollection,
}

impl<'a> DataProtectionBuilder<'a> {
    /// Sets the application discriminator.
    ///
    /// Appends a configure callback, so it wins over any discriminator set
    /// by callbacks registered before it.
    pub fn set_application_name(self, name: impl Into<String>) -> DiResult<Self> {
        let name = name.into();
        self.services
            .configure_options::<DataProtectionOptions, _>(move |_, o| {
                o.application_discriminator = Some(name.clone());
            })?;
        Ok(self)
    }

    pub fn services(&mut self) -> &mut ServiceCollection {
        &mut *self.services
    }
}

/// Registers data protection on a [`ServiceCollection`].
pub trait DataProtectionExt {
    /// Appends `setup` to the [`DataProtectionOptions`] pipeline and registers
    /// the `dyn DataProtectionProvider` singleton once.
    fn add_data_protection<F>(&mut self, setup: F) -> DiResult<DataProtectionBuilder<'_>>
    where
        F: Fn(&mut DataProtectionOptions) + Send + Sync + 'static;
}

impl DataProtectionExt for ServiceCollection {
    fn add_data_protection<F>(&mut self, setup: F) -> DiResult<DataProtectionBuilder<'_>>
    where
        F: Fn(&mut DataProtectionOptions) + Send + Sync + 'static,
    {
        self.configure_options::<DataProtectionOptions, _>(move |_, o| setup(o))?;
        if !self.contains(&key_of_trait::<dyn DataProtectionProvider>()) {
            self.add_singleton_trait_try_factory::<dyn DataProtectionProvider, _>(|r| {
                let options = r.get_options::<DataProtectionOptions>()?;
                let environment = match r.get::<HostingEnvironment>() {
                    Ok(environment) => environment,
                    Err(DiError::NotFound(_)) => Arc::new(HostingEnvironment::from_env("")),
                    Err(other) => return Err(other),
                };
                let provider = EphemeralDataProtectionProvider::from_options(&options, &environment);
                tracing::debug!(
                    discriminator = provider.application_discriminator(),
                    "data protection provider created"
                );
                Ok(Arc::new(provider) as Arc<dyn DataProtectionProvider>)
            })?;
        }
        Ok(DataProtectionBuilder { services: self })
    }
}

/// Resolves the registered protection provider.
pub fn data_protection_provider<R: Resolver>(resolver: &R) -> DiResult<Arc<dyn DataProtectionProvider>> {
    resolver.get_trait::<dyn DataProtectionProvider>()
}

//! User accounts, their store and token providers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::collection::ServiceCollection;
use crate::error::DiResult;
use crate::traits::Resolver;

use super::data_protection::DataProtectionProvider;
use super::persistence::ApplicationDbContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationUser {
    pub id: String,
    pub user_name: String,
    pub email: String,
    pub email_confirmed: bool,
}

impl ApplicationUser {
    pub fn new(id: impl Into<String>, user_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_name: user_name.into(),
            email: email.into(),
            email_confirmed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default, rename_all = "PascalCase"))]
pub struct PasswordOptions {
    pub required_length: usize,
    pub require_digit: bool,
    pub require_uppercase: bool,
}

impl Default for PasswordOptions {
    fn default() -> Self {
        Self {
            required_length: 6,
            require_digit: true,
            require_uppercase: true,
        }
    }
}

/// Account rules, bound from the `Identity` configuration section when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default, rename_all = "PascalCase"))]
pub struct IdentityOptions {
    pub password: PasswordOptions,
    pub require_unique_email: bool,
}

impl IdentityOptions {
    pub fn validate_password(&self, password: &str) -> Result<(), IdentityError> {
        let rules = &self.password;
        if password.chars().count() < rules.required_length {
            return Err(IdentityError::InvalidPassword(format!(
                "must be at least {} characters",
                rules.required_length
            )));
        }
        if rules.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(IdentityError::InvalidPassword("must contain a digit".to_string()));
        }
        if rules.require_uppercase && !password.chars().any(char::is_uppercase) {
            return Err(IdentityError::InvalidPassword(
                "must contain an uppercase letter".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    DuplicateUserName(String),
    DuplicateEmail(String),
    InvalidPassword(String),
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityError::DuplicateUserName(name) => write!(f, "User name '{}' is already taken", name),
            IdentityError::DuplicateEmail(email) => write!(f, "Email '{}' is already taken", email),
            IdentityError::InvalidPassword(reason) => write!(f, "Password {}", reason),
        }
    }
}

impl std::error::Error for IdentityError {}

/// Persistence for [`ApplicationUser`]s.
pub trait UserStore: Send + Sync {
    fn create(&self, user: ApplicationUser, password: &str) -> Result<(), IdentityError>;
    fn find_by_name(&self, user_name: &str) -> Option<ApplicationUser>;
    fn count(&self) -> usize;
}

/// [`UserStore`] held in memory next to an [`ApplicationDbContext`].
pub struct InMemoryUserStore {
    context: ApplicationDbContext,
    options: Arc<IdentityOptions>,
    // keyed by normalized (upper-cased) user name
    users: RwLock<BTreeMap<String, ApplicationUser>>,
}

impl InMemoryUserStore {
    pub fn new(context: ApplicationDbContext, options: Arc<IdentityOptions>) -> Self {
        Self {
            context,
            options,
            users: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn context(&self) -> &ApplicationDbContext {
        &self.context
    }
}

impl UserStore for InMemoryUserStore {
    fn create(&self, user: ApplicationUser, password: &str) -> Result<(), IdentityError> {
        self.options.validate_password(password)?;
        let mut users = self.users.write();
        let normalized = user.user_name.to_uppercase();
        if users.contains_key(&normalized) {
            return Err(IdentityError::DuplicateUserName(user.user_name));
        }
        if self.options.require_unique_email
            && users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(IdentityError::DuplicateEmail(user.email));
        }
        tracing::debug!(user = %user.user_name, "user created");
        users.insert(normalized, user);
        Ok(())
    }

    fn find_by_name(&self, user_name: &str) -> Option<ApplicationUser> {
        self.users.read().get(&user_name.to_uppercase()).cloned()
    }

    fn count(&self) -> usize {
        self.users.read().len()
    }
}

/// Issues and checks purpose-bound tokens for a user.
pub struct DataProtectorTokenProvider {
    protector: Arc<dyn DataProtectionProvider>,
}

impl DataProtectorTokenProvider {
    pub const PURPOSE: &'static str = "DataProtectorTokenProvider";

    pub fn new(protector: Arc<dyn DataProtectionProvider>) -> Self {
        Self { protector }
    }

    pub fn protector(&self) -> &Arc<dyn DataProtectionProvider> {
        &self.protector
    }

    pub fn generate(&self, purpose: &str, user: &ApplicationUser) -> String {
        let protected = self.protector.protect(&[Self::PURPOSE, purpose], user.id.as_bytes());
        protected.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn validate(&self, purpose: &str, token: &str, user: &ApplicationUser) -> bool {
        let Some(bytes) = decode_hex(token) else {
            return false;
        };
        match self.protector.unprotect(&[Self::PURPOSE, purpose], &bytes) {
            Ok(payload) => payload == user.id.as_bytes(),
            Err(_) => false,
        }
    }
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(text.get(i..i + 2)?, 16).ok())
        .collect()
}

/// Returned by [`IdentityExt::add_identity`] for further setup.
pub struct IdentityBuilder<'a> {
    services: &'a mut ServiceCollection,
}

impl<'a> IdentityBuilder<'a> {
    /// Registers the `dyn UserStore` singleton over a fresh [`ApplicationDbContext`].
    pub fn add_in_memory_stores(self) -> DiResult<Self> {
        self.services
            .add_singleton_trait_try_factory::<dyn UserStore, _>(|r| {
                let context = r.get::<ApplicationDbContext>()?;
                let options = r.get_options::<IdentityOptions>()?;
                Ok(Arc::new(InMemoryUserStore::new((*context).clone(), options)) as Arc<dyn UserStore>)
            })?;
        Ok(self)
    }

    /// Registers [`DataProtectorTokenProvider`] as transient.
    pub fn add_default_token_providers(self) -> DiResult<Self> {
        self.services
            .add_transient_try_factory::<DataProtectorTokenProvider, _>(|r| {
                Ok(DataProtectorTokenProvider::new(
                    r.get_trait::<dyn DataProtectionProvider>()?,
                ))
            })?;
        Ok(self)
    }
}

/// Registers identity services on a [`ServiceCollection`].
pub trait IdentityExt {
    /// Registers [`IdentityOptions`] and returns a builder for stores and tokens.
    fn add_identity(&mut self) -> DiResult<IdentityBuilder<'_>>;
}

impl IdentityExt for ServiceCollection {
    fn add_identity(&mut self) -> DiResult<IdentityBuilder<'_>> {
        self.add_options::<IdentityOptions>().register()?;
        Ok(IdentityBuilder { services: self })
    }
}

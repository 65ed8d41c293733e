//! Hosting environment description.

use std::path::PathBuf;

/// Environment variable consulted by [`HostingEnvironment::from_env`].
pub const ENVIRONMENT_VARIABLE: &str = "APP_ENVIRONMENT";

/// Where and as what the application is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostingEnvironment {
    pub application_name: String,
    pub environment_name: String,
    /// Base directory for configuration files. Also the fallback data
    /// protection discriminator.
    pub content_root: PathBuf,
}

impl HostingEnvironment {
    pub const DEVELOPMENT: &'static str = "Development";
    pub const STAGING: &'static str = "Staging";
    pub const PRODUCTION: &'static str = "Production";

    /// A production environment rooted at `content_root`.
    pub fn new(application_name: impl Into<String>, content_root: impl Into<PathBuf>) -> Self {
        Self {
            application_name: application_name.into(),
            environment_name: Self::PRODUCTION.to_string(),
            content_root: content_root.into(),
        }
    }

    /// Reads the environment name from [`ENVIRONMENT_VARIABLE`] (default
    /// `Production`) and uses the current directory as content root.
    pub fn from_env(application_name: impl Into<String>) -> Self {
        let content_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let environment_name = std::env::var(ENVIRONMENT_VARIABLE)
            .ok()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| Self::PRODUCTION.to_string());
        Self {
            application_name: application_name.into(),
            environment_name,
            content_root,
        }
    }

    pub fn with_environment(mut self, environment_name: impl Into<String>) -> Self {
        self.environment_name = environment_name.into();
        self
    }

    /// Case-insensitive comparison against the environment name.
    pub fn is_environment(&self, name: &str) -> bool {
        self.environment_name.eq_ignore_ascii_case(name)
    }

    pub fn is_development(&self) -> bool {
        self.is_environment(Self::DEVELOPMENT)
    }

    pub fn is_production(&self) -> bool {
        self.is_environment(Self::PRODUCTION)
    }
}

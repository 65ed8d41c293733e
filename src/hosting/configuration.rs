//! Layered application configuration.
//!
//! Settings are flat `section:key` pairs. Sources are applied in the order
//! they were added to the [`ConfigurationBuilder`]; a later source overrides
//! any key an earlier one set. Key lookup ignores ASCII case.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[cfg(feature = "config")]
use super::binder::Node;
use super::environment::HostingEnvironment;

/// Separator between section names in a configuration key.
pub const KEY_DELIMITER: &str = ":";

/// Errors raised while loading configuration sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A required file does not exist
    MissingFile(PathBuf),
    /// A file exists but could not be read
    Io { path: PathBuf, message: String },
    /// A source could not be parsed
    Parse { source: String, message: String },
    /// A section could not be bound to the requested type
    Bind { section: String, message: String },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::MissingFile(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigurationError::Io { path, message } => {
                write!(f, "Failed to read {}: {}", path.display(), message)
            }
            ConfigurationError::Parse { source, message } => {
                write!(f, "Invalid configuration in {}: {}", source, message)
            }
            ConfigurationError::Bind { section, message } => {
                write!(f, "Cannot bind section '{}': {}", section, message)
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Immutable, flattened configuration.
///
/// # Examples
///
/// ```
/// use snapshot_di::hosting::AppConfiguration;
///
/// let config = AppConfiguration::builder()
///     .add_in_memory([
///         ("ConnectionStrings:DefaultConnection", "Server=(local);Database=app"),
///         ("Logging:LogLevel:Default", "Warning"),
///     ])
///     .build()
///     .unwrap();
///
/// assert_eq!(config.connection_string("DefaultConnection"), Some("Server=(local);Database=app"));
/// assert_eq!(config.section("logging").get("LogLevel:Default"), Some("Warning"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfiguration {
    // lowercased key -> (key as first written, value)
    values: BTreeMap<String, (String, String)>,
}

impl AppConfiguration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::new()
    }

    /// Standard host layering for `environment`.
    ///
    /// Reads `appsettings.json` (required) and `appsettings.{environment}.json`
    /// (optional) from the content root when the `config` feature is enabled,
    /// then applies environment variables starting with `env_prefix`.
    pub fn for_environment(
        environment: &HostingEnvironment,
        env_prefix: Option<&str>,
    ) -> Result<Self, ConfigurationError> {
        let builder = ConfigurationBuilder::new().set_base_path(&environment.content_root);
        #[cfg(feature = "config")]
        let builder = builder
            .add_json_file("appsettings.json", false)
            .add_json_file(
                format!("appsettings.{}.json", environment.environment_name),
                true,
            );
        builder.add_environment_variables(env_prefix).build()
    }

    /// Looks up a value by its full `section:key` path.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&key.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    /// Shorthand for `get("ConnectionStrings:{name}")`.
    pub fn connection_string(&self, name: &str) -> Option<&str> {
        self.get(&format!("ConnectionStrings{}{}", KEY_DELIMITER, name))
    }

    /// Returns the keys below `prefix`, with the prefix stripped.
    pub fn section(&self, prefix: &str) -> AppConfiguration {
        let wanted = format!("{}{}", prefix.to_ascii_lowercase(), KEY_DELIMITER);
        let values = self
            .values
            .iter()
            .filter(|(lower, _)| lower.starts_with(&wanted))
            .map(|(lower, (original, value))| {
                (
                    lower[wanted.len()..].to_string(),
                    (original[wanted.len()..].to_string(), value.clone()),
                )
            })
            .collect();
        AppConfiguration { values }
    }

    /// Iterates `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .values()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn set(&mut self, key: String, value: String) {
        self.values.insert(key.to_ascii_lowercase(), (key, value));
    }

    /// Deserializes the section under `prefix` into `T`.
    ///
    /// Values are parsed only when the target field is numeric or boolean;
    /// string fields receive the stored text unchanged.
    #[cfg(feature = "config")]
    pub fn bind<T: serde::de::DeserializeOwned>(&self, prefix: &str) -> Result<T, ConfigurationError> {
        let mut root = Node::section();
        for (key, value) in self.section(prefix).iter() {
            let path: Vec<&str> = key.split(KEY_DELIMITER).collect();
            root.insert(&path, value.to_string());
        }
        T::deserialize(root).map_err(|e| ConfigurationError::Bind {
            section: prefix.to_string(),
            message: e.to_string(),
        })
    }
}

enum Source {
    Memory(Vec<(String, String)>),
    #[cfg(feature = "config")]
    JsonFile { path: PathBuf, optional: bool },
    #[cfg(feature = "config")]
    JsonText { name: String, text: String },
    Environment { prefix: Option<String> },
}

/// Collects configuration sources and flattens them into an [`AppConfiguration`].
#[derive(Default)]
pub struct ConfigurationBuilder {
    #[cfg_attr(not(feature = "config"), allow(dead_code))]
    base_path: Option<PathBuf>,
    sources: Vec<Source>,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory that relative file paths are resolved against.
    pub fn set_base_path(mut self, path: impl AsRef<Path>) -> Self {
        self.base_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn add_in_memory<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.sources.push(Source::Memory(pairs));
        self
    }

    /// Adds a JSON file. Nested objects become `parent:child` keys and array
    /// elements become `parent:index` keys.
    #[cfg(feature = "config")]
    pub fn add_json_file(mut self, path: impl AsRef<Path>, optional: bool) -> Self {
        self.sources.push(Source::JsonFile {
            path: path.as_ref().to_path_buf(),
            optional,
        });
        self
    }

    /// Adds a JSON document held in memory; `name` is used in parse errors.
    #[cfg(feature = "config")]
    pub fn add_json_str(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.sources.push(Source::JsonText {
            name: name.into(),
            text: text.into(),
        });
        self
    }

    /// Adds process environment variables, read at `build` time.
    ///
    /// With a prefix, only variables starting with it (ignoring case) are
    /// used and the prefix is stripped. A double underscore in a variable
    /// name stands for the `:` separator, so `ConnectionStrings__Default`
    /// sets `ConnectionStrings:Default`.
    pub fn add_environment_variables(mut self, prefix: Option<&str>) -> Self {
        self.sources.push(Source::Environment {
            prefix: prefix.map(str::to_string),
        });
        self
    }

    pub fn build(self) -> Result<AppConfiguration, ConfigurationError> {
        let mut config = AppConfiguration::default();
        for source in self.sources {
            match source {
                Source::Memory(pairs) => {
                    for (key, value) in pairs {
                        config.set(key, value);
                    }
                }
                #[cfg(feature = "config")]
                Source::JsonFile { path, optional } => {
                    let path = match &self.base_path {
                        Some(base) if path.is_relative() => base.join(path),
                        _ => path,
                    };
                    if !path.exists() {
                        if optional {
                            tracing::debug!(path = %path.display(), "optional configuration file absent");
                            continue;
                        }
                        return Err(ConfigurationError::MissingFile(path));
                    }
                    let text = std::fs::read_to_string(&path).map_err(|e| ConfigurationError::Io {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;
                    load_json(&mut config, &path.display().to_string(), &text)?;
                }
                #[cfg(feature = "config")]
                Source::JsonText { name, text } => load_json(&mut config, &name, &text)?,
                Source::Environment { prefix } => {
                    for (name, value) in std::env::vars() {
                        if let Some(key) = env_key(&name, prefix.as_deref()) {
                            config.set(key, value);
                        }
                    }
                }
            }
        }
        tracing::debug!(keys = config.len(), "configuration built");
        Ok(config)
    }
}

fn env_key(name: &str, prefix: Option<&str>) -> Option<String> {
    let stripped = match prefix {
        Some(prefix) => {
            let head = name.get(..prefix.len())?;
            if !head.eq_ignore_ascii_case(prefix) {
                return None;
            }
            &name[prefix.len()..]
        }
        None => name,
    };
    if stripped.is_empty() {
        return None;
    }
    Some(stripped.replace("__", KEY_DELIMITER))
}

#[cfg(feature = "config")]
fn load_json(config: &mut AppConfiguration, name: &str, text: &str) -> Result<(), ConfigurationError> {
    let root: serde_json::Value = serde_json::from_str(text).map_err(|e| ConfigurationError::Parse {
        source: name.to_string(),
        message: e.to_string(),
    })?;
    if !root.is_object() {
        return Err(ConfigurationError::Parse {
            source: name.to_string(),
            message: "top-level value must be an object".to_string(),
        });
    }
    flatten(config, None, &root);
    Ok(())
}

#[cfg(feature = "config")]
fn flatten(config: &mut AppConfiguration, prefix: Option<&str>, value: &serde_json::Value) {
    let join = |child: &str| match prefix {
        Some(prefix) => format!("{}{}{}", prefix, KEY_DELIMITER, child),
        None => child.to_string(),
    };
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                flatten(config, Some(&join(key)), child);
            }
        }
        serde_json::Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten(config, Some(&join(&index.to_string())), child);
            }
        }
        leaf => {
            if let Some(key) = prefix {
                let text = match leaf {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                config.set(key.to_string(), text);
            }
        }
    }
}

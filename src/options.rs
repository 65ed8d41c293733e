//! Options pattern: deferred configuration captured once per provider.
//!
//! Configure callbacks are collected while the [`ServiceCollection`] is open
//! and run only when a provider first asks for the options value. The result
//! is stored in that provider's options cache; every later request through
//! the same provider, by any path, gets the same `Arc<T>`.

use std::any::Any;
use std::sync::Arc;

use crate::collection::ServiceCollection;
use crate::error::{DiError, DiResult};
use crate::key::{key_of_options, Key};
use crate::provider::ResolverContext;
use crate::registration::AnyArc;

/// Options interface for dependency injection.
///
/// Provides access to the options snapshot captured by the provider that
/// resolved it.
pub trait IOptions<T>: Send + Sync + 'static {
    /// Gets the configured options instance.
    fn get(&self) -> Arc<T>;
}

/// Immutable options wrapper that implements `IOptions<T>`.
///
/// Registered as a singleton for every options type that has a pipeline
/// (`add_options` or `configure_options`), so `get::<Options<T>>()` and
/// `get_options::<T>()` observe the same captured value. Types read only
/// through the default-options policy have no `Options<T>` service.
///
/// # Examples
///
/// ```
/// use snapshot_di::{ServiceCollection, Options, Resolver};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct AppSettings {
///     name: String,
/// }
///
/// let mut services = ServiceCollection::new();
/// services.configure_options::<AppSettings, _>(|_r, s| s.name = "MyApp".to_string()).unwrap();
///
/// let provider = services.build().unwrap();
/// let wrapped = provider.get_required::<Options<AppSettings>>();
/// let direct = provider.get_options::<AppSettings>().unwrap();
/// assert_eq!(wrapped.get().name, "MyApp");
/// assert!(Arc::ptr_eq(wrapped.value(), &direct));
/// ```
pub struct Options<T> {
    inner: Arc<T>,
}

impl<T> Options<T> {
    /// Creates a new `Options<T>` wrapping the given value.
    pub fn new(value: T) -> Self {
        Self { inner: Arc::new(value) }
    }

    pub(crate) fn from_arc(inner: Arc<T>) -> Self {
        Self { inner }
    }

    /// Gets a reference to the inner `Arc<T>`.
    pub fn value(&self) -> &Arc<T> {
        &self.inner
    }

    /// Gets a clone of the inner `Arc<T>` containing the configured options.
    pub fn get(&self) -> Arc<T> {
        self.inner.clone()
    }
}

impl<T> IOptions<T> for Options<T>
where
    T: Send + Sync + 'static,
{
    fn get(&self) -> Arc<T> {
        self.inner.clone()
    }
}

type AnyBox = Box<dyn Any + Send + Sync>;
type DefaultFn = Arc<dyn Fn() -> AnyBox + Send + Sync>;
type ConfigureFn = Arc<dyn Fn(&ResolverContext<'_>, &mut (dyn Any + Send + Sync)) + Send + Sync>;
type ValidateFn = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Result<(), String> + Send + Sync>;

/// Type-erased configuration pipeline for one options type.
#[derive(Clone)]
pub(crate) struct OptionsDescriptor {
    key: Key,
    default_maker: DefaultFn,
    configures: Vec<ConfigureFn>,
    post_configures: Vec<ConfigureFn>,
    validates: Vec<ValidateFn>,
    seal: fn(AnyBox) -> Option<AnyArc>,
}

fn seal<T: Send + Sync + 'static>(value: AnyBox) -> Option<AnyArc> {
    value.downcast::<T>().ok().map(|boxed| Arc::new(*boxed) as AnyArc)
}

fn erase_configure<T, F>(f: F) -> ConfigureFn
where
    T: Send + Sync + 'static,
    F: Fn(&ResolverContext<'_>, &mut T) + Send + Sync + 'static,
{
    Arc::new(move |ctx: &ResolverContext<'_>, value: &mut (dyn Any + Send + Sync)| {
        if let Some(value) = value.downcast_mut::<T>() {
            f(ctx, value);
        }
    })
}

impl OptionsDescriptor {
    pub(crate) fn new<T: Default + Send + Sync + 'static>() -> Self {
        Self {
            key: key_of_options::<T>(),
            default_maker: Arc::new(|| Box::new(T::default()) as AnyBox),
            configures: Vec::new(),
            post_configures: Vec::new(),
            validates: Vec::new(),
            seal: seal::<T>,
        }
    }

    pub(crate) fn configure_count(&self) -> usize {
        self.configures.len() + self.post_configures.len()
    }

    /// Runs default, configure, post-configure and validate steps in order.
    pub(crate) fn capture(&self, ctx: &ResolverContext<'_>) -> DiResult<AnyArc> {
        let mut value = (self.default_maker)();
        for configure in &self.configures {
            configure(ctx, &mut *value);
        }
        for post in &self.post_configures {
            post(ctx, &mut *value);
        }
        for validate in &self.validates {
            validate(&*value).map_err(|message| DiError::OptionsValidation {
                options: self.key.display_name(),
                message,
            })?;
        }
        (self.seal)(value).ok_or(DiError::TypeMismatch(self.key.display_name()))
    }
}

/// Options builder for configuring options that depend on other services.
///
/// Steps run in this order when a provider first captures the value:
/// 1. default value (`default_with` or `T::default()`)
/// 2. every `configure` callback, in registration order
/// 3. every `post_configure` callback
/// 4. every `validate` callback; the first failure becomes a terminal
///    [`DiError::OptionsValidation`] for that provider
///
/// Builders for the same `T` compose: a second `add_options::<T>()` appends
/// its callbacks after the first one's.
///
/// # Examples
///
/// ```
/// use snapshot_di::{ServiceCollection, Resolver};
///
/// #[derive(Default)]
/// struct UrlConfig {
///     base_url: String,
///     full_url: String,
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton("/v1/users".to_string()).unwrap();
/// services.add_options::<UrlConfig>()
///     .default_with(|| UrlConfig { base_url: "https://api.example.com".into(), ..Default::default() })
///     .post_configure(|r, config| {
///         let path = r.get_required::<String>();
///         config.full_url = format!("{}{}", config.base_url, path);
///     })
///     .validate(|config| {
///         if config.base_url.is_empty() { Err("base_url cannot be empty".into()) } else { Ok(()) }
///     })
///     .register()
///     .unwrap();
///
/// let provider = services.build().unwrap();
/// let config = provider.get_options::<UrlConfig>().unwrap();
/// assert_eq!(config.full_url, "https://api.example.com/v1/users");
/// ```
pub struct OptionsBuilder<'a, T>
where
    T: Default + Send + Sync + 'static,
{
    sc: &'a mut ServiceCollection,
    default_maker: Option<DefaultFn>,
    configures: Vec<ConfigureFn>,
    post_configures: Vec<ConfigureFn>,
    validates: Vec<ValidateFn>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<'a, T> OptionsBuilder<'a, T>
where
    T: Default + Send + Sync + 'static,
{
    pub(crate) fn new(sc: &'a mut ServiceCollection) -> Self {
        Self {
            sc,
            default_maker: None,
            configures: Vec::new(),
            post_configures: Vec::new(),
            validates: Vec::new(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Provide a custom default value creator (otherwise `T::default()`).
    pub fn default_with<F>(mut self, f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.default_maker = Some(Arc::new(move || Box::new(f()) as AnyBox));
        self
    }

    /// Configure options with a callback that can resolve other services.
    pub fn configure<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResolverContext<'_>, &mut T) + Send + Sync + 'static,
    {
        self.configures.push(erase_configure(f));
        self
    }

    /// Post-configure options after all configure actions have been applied.
    pub fn post_configure<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResolverContext<'_>, &mut T) + Send + Sync + 'static,
    {
        self.post_configures.push(erase_configure(f));
        self
    }

    /// Validate the final options after all configuration steps.
    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validates.push(Arc::new(move |value: &(dyn Any + Send + Sync)| {
            match value.downcast_ref::<T>() {
                Some(value) => f(value),
                None => Err(format!("expected {}", std::any::type_name::<T>())),
            }
        }));
        self
    }

    /// Finish building and append this pipeline to the collection.
    ///
    /// Fails with [`DiError::ConfigurationClosed`] once the collection is frozen.
    pub fn register(self) -> DiResult<()> {
        let OptionsBuilder {
            sc,
            default_maker,
            configures,
            post_configures,
            validates,
            ..
        } = self;
        let descriptor = sc.options_descriptor_mut::<T>()?;
        if let Some(default_maker) = default_maker {
            descriptor.default_maker = default_maker;
        }
        descriptor.configures.extend(configures);
        descriptor.post_configures.extend(post_configures);
        descriptor.validates.extend(validates);
        Ok(())
    }
}

impl ServiceCollection {
    /// Start building options for `T`. Call `.register()` to finalize.
    pub fn add_options<T>(&mut self) -> OptionsBuilder<'_, T>
    where
        T: Default + Send + Sync + 'static,
    {
        OptionsBuilder::new(self)
    }

    /// Appends one configure callback for options type `T`.
    ///
    /// Callbacks for the same type never replace each other; they run in the
    /// order they were registered.
    ///
    /// ```
    /// use snapshot_di::{ServiceCollection, Resolver};
    ///
    /// #[derive(Default)]
    /// struct Protection { discriminator: String }
    ///
    /// let mut services = ServiceCollection::new();
    /// services
    ///     .configure_options::<Protection, _>(|_, o| o.discriminator = "my-app".into()).unwrap()
    ///     .configure_options::<Protection, _>(|_, o| o.discriminator = "app".into()).unwrap();
    ///
    /// let provider = services.build().unwrap();
    /// assert_eq!(provider.get_options::<Protection>().unwrap().discriminator, "app");
    /// ```
    pub fn configure_options<T, F>(&mut self, f: F) -> DiResult<&mut Self>
    where
        T: Default + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>, &mut T) + Send + Sync + 'static,
    {
        self.options_descriptor_mut::<T>()?
            .configures
            .push(erase_configure(f));
        Ok(self)
    }
}

//! Service key types for the dependency injection container.

use std::any::TypeId;

/// Key for service storage and lookup.
///
/// Keys identify registrations in a registry and slots in a provider's
/// caches. Concrete types and options types are keyed by `TypeId`; trait
/// objects are keyed by their type name.
///
/// # Examples
///
/// ```rust
/// use snapshot_di::{Key, key_of_type, key_of_options};
///
/// struct Settings;
///
/// let service = key_of_type::<Settings>();
/// let options = key_of_options::<Settings>();
///
/// assert_eq!(service.display_name(), options.display_name());
/// assert_ne!(service, options);
/// assert!(options.is_options());
/// ```
#[derive(Debug, Clone, Copy)]
pub enum Key {
    /// Concrete type key with TypeId and name for diagnostics
    Type(TypeId, &'static str),
    /// Single trait binding key
    ///
    /// Only stores the trait name since `dyn Trait` keys are looked up by name.
    Trait(&'static str),
    /// Captured options value of a type
    ///
    /// Lives in a provider's options cache, separate from service singletons.
    Options(TypeId, &'static str),
}

impl Key {
    /// Get the type or trait name for display
    ///
    /// ```rust
    /// use snapshot_di::Key;
    /// use std::any::TypeId;
    ///
    /// let type_key = Key::Type(TypeId::of::<String>(), "alloc::string::String");
    /// assert_eq!(type_key.display_name(), "alloc::string::String");
    ///
    /// let trait_key = Key::Trait("dyn core::fmt::Debug");
    /// assert_eq!(trait_key.display_name(), "dyn core::fmt::Debug");
    /// ```
    pub fn display_name(&self) -> &'static str {
        match self {
            Key::Type(_, name) => name,
            Key::Trait(name) => name,
            Key::Options(_, name) => name,
        }
    }

    /// True for keys that address the options cache.
    pub fn is_options(&self) -> bool {
        matches!(self, Key::Options(_, _))
    }
}

// TypeId-only comparison for concrete types
impl PartialEq for Key {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Type(a, _), Key::Type(b, _)) => a == b,
            (Key::Options(a, _), Key::Options(b, _)) => a == b,
            (Key::Trait(a), Key::Trait(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl std::hash::Hash for Key {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Key::Type(id, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            Key::Trait(name) => {
                1u8.hash(state);
                name.hash(state);
            }
            Key::Options(id, _) => {
                2u8.hash(state);
                id.hash(state);
            }
        }
    }
}

#[inline(always)]
pub fn key_of_type<T: 'static>() -> Key {
    Key::Type(TypeId::of::<T>(), std::any::type_name::<T>())
}

#[inline(always)]
pub fn key_of_trait<T: ?Sized + 'static>() -> Key {
    Key::Trait(std::any::type_name::<T>())
}

#[inline(always)]
pub fn key_of_options<T: 'static>() -> Key {
    Key::Options(TypeId::of::<T>(), std::any::type_name::<T>())
}

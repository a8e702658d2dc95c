//! Pluggable leaf converters.
//!
//! A [`Surrogate`] takes over the text conversion of every type it
//! supports. Surrogates are consulted in registration order, the built-in
//! ones first:
//!
//! - [`EnumSurrogate`]: types declared with [`TypeMeta::enumeration`].
//! - [`ValueSurrogate`]: types declared with [`TypeMeta::external`].

// -----------------------------------------------------------------------------
// Modules

mod enums;
mod value;

// -----------------------------------------------------------------------------
// Exports

pub use enums::EnumSurrogate;
pub use value::ValueSurrogate;

// -----------------------------------------------------------------------------
// Surrogate

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt::{Debug, Formatter};

use crate::XmlError;
use crate::meta::TypeMeta;

/// Converts the values of the types it supports to and from text.
///
/// # Examples
///
/// ```
/// use core::any::Any;
/// use xb_serial::{Surrogate, SurrogateRegistry, TypeMeta, XmlError};
///
/// struct Upper;
///
/// impl Surrogate for Upper {
///     fn supports(&self, meta: &TypeMeta) -> bool {
///         meta.name() == Some("shout")
///     }
///
///     fn serialize(&self, value: &dyn Any, _: &TypeMeta) -> Result<String, XmlError> {
///         Ok(value.downcast_ref::<String>().map(|s| s.to_uppercase()).unwrap_or_default())
///     }
///
///     fn deserialize(&self, text: &str, _: &TypeMeta) -> Result<Box<dyn Any>, XmlError> {
///         Ok(Box::new(text.to_lowercase()))
///     }
/// }
///
/// let mut registry = SurrogateRegistry::new();
/// let index = registry.push(Upper);
///
/// let meta = TypeMeta::opaque::<String>().with_name("shout");
/// assert_eq!(registry.find(&meta), Some(index));
/// ```
pub trait Surrogate: Send + Sync + 'static {
    /// A name for diagnostics.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    fn supports(&self, meta: &TypeMeta) -> bool;

    fn serialize(&self, value: &dyn Any, meta: &TypeMeta) -> Result<String, XmlError>;

    fn deserialize(&self, text: &str, meta: &TypeMeta) -> Result<Box<dyn Any>, XmlError>;
}

// -----------------------------------------------------------------------------
// SurrogateRegistry

/// The ordered list of surrogates.
pub struct SurrogateRegistry {
    surrogates: Vec<Box<dyn Surrogate>>,
}

impl SurrogateRegistry {
    /// A registry holding the built-in surrogates.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.push(EnumSurrogate);
        registry.push(ValueSurrogate);
        registry
    }

    /// A registry without any surrogate.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            surrogates: Vec::new(),
        }
    }

    /// Appends a surrogate and returns its index.
    pub fn push(&mut self, surrogate: impl Surrogate) -> usize {
        self.push_boxed(Box::new(surrogate))
    }

    pub fn push_boxed(&mut self, surrogate: Box<dyn Surrogate>) -> usize {
        self.surrogates.push(surrogate);
        self.surrogates.len() - 1
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&dyn Surrogate> {
        self.surrogates.get(index).map(|s| &**s)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.surrogates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.surrogates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Surrogate> {
        self.surrogates.iter().map(|s| &**s)
    }

    /// The index of the first surrogate supporting `meta`.
    ///
    /// When several match, the first one wins and a warning names the
    /// others.
    pub fn find(&self, meta: &TypeMeta) -> Option<usize> {
        let mut matching = self
            .surrogates
            .iter()
            .enumerate()
            .filter(|(_, s)| s.supports(meta));
        let (index, first) = matching.next()?;
        let others: Vec<&str> = matching.map(|(_, s)| s.name()).collect();
        if !others.is_empty() {
            log::warn!(
                "`{}` is supported by several surrogates, using `{}` and ignoring {:?}",
                meta.type_path(),
                first.name(),
                others,
            );
        }
        Some(index)
    }
}

impl Default for SurrogateRegistry {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for SurrogateRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter().map(|s| s.name())).finish()
    }
}

fn mismatch(meta: &TypeMeta) -> XmlError {
    XmlError::invalid_type(meta.type_path(), "a value of another type")
}

#[cfg(test)]
mod tests {
    use super::{Surrogate, SurrogateRegistry};
    use crate::XmlError;
    use crate::meta::TypeMeta;
    use core::any::Any;

    struct Everything;

    impl Surrogate for Everything {
        fn name(&self) -> &str {
            "everything"
        }

        fn supports(&self, _: &TypeMeta) -> bool {
            true
        }

        fn serialize(&self, _: &dyn Any, _: &TypeMeta) -> Result<String, XmlError> {
            Ok(String::new())
        }

        fn deserialize(&self, _: &str, _: &TypeMeta) -> Result<Box<dyn Any>, XmlError> {
            Ok(Box::new(()))
        }
    }

    #[test]
    fn first_match_wins() {
        let mut registry = SurrogateRegistry::new();
        let index = registry.push(Everything);
        assert_eq!(index, 2);

        // The value surrogate is ahead of the user one.
        let meta = TypeMeta::external::<core::net::Ipv4Addr>();
        assert_eq!(registry.find(&meta), Some(1));
        assert_eq!(registry.find(&TypeMeta::opaque::<u8>()), Some(2));
        assert_eq!(SurrogateRegistry::new().find(&TypeMeta::opaque::<u8>()), None);
    }

    #[test]
    fn names() {
        let registry = SurrogateRegistry::new();
        let names: Vec<_> = registry.iter().map(|s| s.name().to_owned()).collect();
        assert_eq!(names, ["enum", "value"]);
    }
}

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use core::any::Any;
use core::fmt::Display;
use core::str::FromStr;

use crate::meta::{FromType, TypeTrait};

// -----------------------------------------------------------------------------
// XmlText

/// A type that converts to and from a single text value.
///
/// Text convertible types are leaves: they can be placed as attributes or
/// as the text content of their owner, and as elements they serialize to
/// an element holding just the text.
///
/// Declare them with [`TypeMeta::text`](crate::meta::TypeMeta::text).
pub trait XmlText: Sized {
    type Error: Display;

    fn to_xml_text(&self) -> String;

    fn from_xml_text(text: &str) -> Result<Self, Self::Error>;
}

// -----------------------------------------------------------------------------
// TypeTraitText

/// Type erased text conversion.
///
/// Built from [`XmlText`] through [`FromType`], or from [`Display`] and
/// [`FromStr`] with [`TypeTraitText::display`].
#[derive(Clone, Copy)]
pub struct TypeTraitText {
    to_text: fn(&dyn Any) -> Option<String>,
    from_text: fn(&str) -> Result<Box<dyn Any>, String>,
}

impl TypeTrait for TypeTraitText {}

impl TypeTraitText {
    #[inline]
    pub const fn new(
        to_text: fn(&dyn Any) -> Option<String>,
        from_text: fn(&str) -> Result<Box<dyn Any>, String>,
    ) -> Self {
        Self { to_text, from_text }
    }

    /// Conversion through [`Display`] and [`FromStr`].
    pub fn display<T>() -> Self
    where
        T: Display + FromStr + Any,
        T::Err: Display,
    {
        Self {
            to_text: |value| value.downcast_ref::<T>().map(ToString::to_string),
            from_text: |text| {
                T::from_str(text)
                    .map(|v| Box::new(v) as Box<dyn Any>)
                    .map_err(|e| e.to_string())
            },
        }
    }

    /// Renders `value`, returns `None` if it is not of the expected type.
    #[inline]
    pub fn to_text(&self, value: &dyn Any) -> Option<String> {
        (self.to_text)(value)
    }

    /// Parses `text` into a boxed value, the error is a readable reason.
    #[inline]
    pub fn from_text(&self, text: &str) -> Result<Box<dyn Any>, String> {
        (self.from_text)(text)
    }
}

impl<T: XmlText + Any> FromType<T> for TypeTraitText {
    fn from_type() -> Self {
        Self {
            to_text: |value| value.downcast_ref::<T>().map(T::to_xml_text),
            from_text: |text| {
                T::from_xml_text(text)
                    .map(|v| Box::new(v) as Box<dyn Any>)
                    .map_err(|e| e.to_string())
            },
        }
    }
}

// -----------------------------------------------------------------------------
// TypeTraitExternal

/// Marks a type converted by the built-in value surrogate.
///
/// Used for foreign types that only offer [`Display`] and [`FromStr`].
/// Unlike [`TypeTraitText`], these are matched during the surrogate pass of
/// classification, so a user surrogate registered for the same type is
/// reported as ambiguous.
#[derive(Clone, Copy)]
pub struct TypeTraitExternal(pub(crate) TypeTraitText);

impl TypeTrait for TypeTraitExternal {}

impl TypeTraitExternal {
    #[inline]
    pub fn codec(&self) -> &TypeTraitText {
        &self.0
    }
}

impl<T> FromType<T> for TypeTraitExternal
where
    T: Display + FromStr + Any,
    T::Err: Display,
{
    fn from_type() -> Self {
        Self(TypeTraitText::display::<T>())
    }
}

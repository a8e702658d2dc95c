use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;

use crate::meta::{FromType, TypeTrait};

// -----------------------------------------------------------------------------
// XmlEnum

/// An enumeration written as the token of its member.
///
/// Values outside [`members`](Self::members) are written as their number.
/// Set [`FLAGS`](Self::FLAGS) for bit sets: a value that is not exactly one
/// declared member is rejected in both directions.
///
/// Plain `#[repr]` enums can use [`impl_xml_enum!`](crate::impl_xml_enum).
pub trait XmlEnum: Copy + Any {
    const FLAGS: bool = false;

    /// Declared members and their tokens.
    fn members() -> &'static [(Self, &'static str)];

    fn to_bits(self) -> u64;

    fn from_bits(bits: u64) -> Option<Self>;
}

// -----------------------------------------------------------------------------
// TypeTraitEnum

/// Type erased [`XmlEnum`].
#[derive(Clone, Copy)]
pub struct TypeTraitEnum {
    flags: bool,
    tokens: fn() -> Vec<(u64, &'static str)>,
    bits_of: fn(&dyn Any) -> Option<u64>,
    from_bits: fn(u64) -> Option<Box<dyn Any>>,
}

impl TypeTrait for TypeTraitEnum {}

impl TypeTraitEnum {
    #[inline]
    pub fn is_flags(&self) -> bool {
        self.flags
    }

    /// The declared members as `(bits, token)` pairs.
    #[inline]
    pub fn tokens(&self) -> Vec<(u64, &'static str)> {
        (self.tokens)()
    }

    #[inline]
    pub fn bits_of(&self, value: &dyn Any) -> Option<u64> {
        (self.bits_of)(value)
    }

    #[inline]
    pub fn from_bits(&self, bits: u64) -> Option<Box<dyn Any>> {
        (self.from_bits)(bits)
    }
}

impl<T: XmlEnum> FromType<T> for TypeTraitEnum {
    fn from_type() -> Self {
        Self {
            flags: T::FLAGS,
            tokens: || T::members().iter().map(|(v, t)| (v.to_bits(), *t)).collect(),
            bits_of: |value| value.downcast_ref::<T>().map(|v| v.to_bits()),
            from_bits: |bits| T::from_bits(bits).map(|v| Box::new(v) as Box<dyn Any>),
        }
    }
}

// -----------------------------------------------------------------------------
// impl_xml_enum

/// Implements [`XmlEnum`] and [`XmlType`](crate::XmlType) for a fieldless
/// enum, mapping each variant to a token.
///
/// # Examples
///
/// ```
/// use xb_serial::meta::XmlEnum;
/// use xb_serial::impl_xml_enum;
///
/// #[derive(Clone, Copy, Debug, PartialEq)]
/// enum Color {
///     Red = 1,
///     Green = 2,
/// }
///
/// impl_xml_enum!(Color { Red = "red", Green = "green" });
///
/// assert_eq!(Color::members()[1], (Color::Green, "green"));
/// assert_eq!(Color::from_bits(1), Some(Color::Red));
/// assert_eq!(Color::from_bits(3), None);
/// ```
#[macro_export]
macro_rules! impl_xml_enum {
    ($ty:ident { $($variant:ident = $token:literal),+ $(,)? }) => {
        impl $crate::meta::XmlEnum for $ty {
            fn members() -> &'static [(Self, &'static str)] {
                &[$(($ty::$variant, $token)),+]
            }

            fn to_bits(self) -> u64 {
                self as u64
            }

            fn from_bits(bits: u64) -> ::core::option::Option<Self> {
                $(
                    if bits == $ty::$variant as u64 {
                        return ::core::option::Option::Some($ty::$variant);
                    }
                )+
                ::core::option::Option::None
            }
        }

        impl $crate::XmlType for $ty {
            fn type_meta() -> $crate::meta::TypeMeta {
                $crate::meta::TypeMeta::enumeration::<Self>()
            }
        }
    };
}

use alloc::boxed::Box;
use core::any::Any;

use crate::XmlError;
use crate::meta::{TypeHandle, TypeTrait};

/// Hands the wrapped value, or `None` for an empty wrapper, to the visitor.
pub type ReadFn = fn(
    &dyn Any,
    &mut dyn FnMut(Option<&dyn Any>) -> Result<(), XmlError>,
) -> Result<(), XmlError>;

/// Mutable form of [`ReadFn`].
pub type WriteFn = fn(
    &mut dyn Any,
    &mut dyn FnMut(Option<&mut dyn Any>) -> Result<(), XmlError>,
) -> Result<(), XmlError>;

/// Wraps a boxed inner value, handing it back on a type mismatch.
pub type WrapFn = fn(Box<dyn Any>) -> Result<Box<dyn Any>, Box<dyn Any>>;

// -----------------------------------------------------------------------------
// TypeTraitWrapper

/// A transparent wrapper around another type.
///
/// Wrappers never produce XML of their own: an empty wrapper produces no
/// node at all, a full one produces whatever its content produces. Nullable
/// values, boxes and shared pointers are wrappers.
///
/// Access goes through visitors so wrappers that lend their content out
/// through a guard, like `RefCell`, fit the same interface.
#[derive(Clone, Copy)]
pub struct TypeTraitWrapper {
    inner: TypeHandle,
    read: ReadFn,
    write: WriteFn,
    wrap: WrapFn,
}

impl TypeTrait for TypeTraitWrapper {}

impl TypeTraitWrapper {
    #[inline]
    pub const fn new(inner: TypeHandle, read: ReadFn, write: WriteFn, wrap: WrapFn) -> Self {
        Self {
            inner,
            read,
            write,
            wrap,
        }
    }

    /// The wrapped type.
    #[inline]
    pub fn inner(&self) -> TypeHandle {
        self.inner
    }

    #[inline]
    pub fn read(
        &self,
        value: &dyn Any,
        visitor: &mut dyn FnMut(Option<&dyn Any>) -> Result<(), XmlError>,
    ) -> Result<(), XmlError> {
        (self.read)(value, visitor)
    }

    #[inline]
    pub fn write(
        &self,
        value: &mut dyn Any,
        visitor: &mut dyn FnMut(Option<&mut dyn Any>) -> Result<(), XmlError>,
    ) -> Result<(), XmlError> {
        (self.write)(value, visitor)
    }

    /// Wraps a value of the inner type.
    #[inline]
    pub fn wrap(&self, inner: Box<dyn Any>) -> Result<Box<dyn Any>, Box<dyn Any>> {
        (self.wrap)(inner)
    }
}

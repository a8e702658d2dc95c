use crate::meta::{TypeHandle, XmlType};

// -----------------------------------------------------------------------------
// AutoRegistration

/// A type submitted for [`XSerializerBuilder::auto_register`].
///
/// Created by [`submit_type!`](crate::submit_type), rarely by hand.
///
/// [`XSerializerBuilder::auto_register`]: crate::XSerializerBuilder::auto_register
#[derive(Clone, Copy, Debug)]
pub struct AutoRegistration {
    pub(crate) handle: fn() -> TypeHandle,
}

impl AutoRegistration {
    #[inline]
    pub const fn of<T: XmlType>() -> Self {
        Self {
            handle: TypeHandle::of::<T>,
        }
    }

    #[inline]
    pub fn handle(&self) -> TypeHandle {
        (self.handle)()
    }
}

#[cfg(feature = "auto_register")]
inventory::collect!(AutoRegistration);

/// Submits types for [`XSerializerBuilder::auto_register`].
///
/// Expands to nothing without the `auto_register` feature.
///
/// ```
/// use xb_serial::{TypeMeta, XmlType, submit_type};
///
/// struct Tag;
///
/// impl XmlType for Tag {
///     fn type_meta() -> TypeMeta {
///         TypeMeta::composite::<Self>().build()
///     }
/// }
///
/// submit_type!(Tag);
/// ```
///
/// [`XSerializerBuilder::auto_register`]: crate::XSerializerBuilder::auto_register
#[cfg(feature = "auto_register")]
#[macro_export]
macro_rules! submit_type {
    ($($ty:ty),+ $(,)?) => {
        $(
            $crate::__macro_exports::inventory::submit! {
                $crate::registry::AutoRegistration::of::<$ty>()
            }
        )+
    };
}

#[cfg(not(feature = "auto_register"))]
#[macro_export]
macro_rules! submit_type {
    ($($ty:ty),+ $(,)?) => {};
}

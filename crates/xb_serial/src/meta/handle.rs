use core::any::{Any, TypeId};
use core::fmt::{Debug, Formatter};

use crate::meta::TypeMeta;

// -----------------------------------------------------------------------------
// XmlType

/// A type that can describe itself to the serializer.
///
/// Implementations return a fresh [`TypeMeta`] each time they are called.
/// The builder calls it once per type while registering.
///
/// # Examples
///
/// ```
/// use xb_serial::{Member, TypeMeta, XmlType};
///
/// #[derive(Default)]
/// struct Circle {
///     radius: f64,
/// }
///
/// impl XmlType for Circle {
///     fn type_meta() -> TypeMeta {
///         TypeMeta::composite::<Self>()
///             .default_constructor()
///             .member(Member::new("Radius", |c: &Circle| &c.radius, |c| &mut c.radius).attribute())
///             .build()
///     }
/// }
///
/// assert_eq!(Circle::type_meta().members().len(), 1);
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `XmlType` so it cannot be mapped to XML",
    note = "implement `XmlType::type_meta` for `{Self}`"
)]
pub trait XmlType: Any {
    fn type_meta() -> TypeMeta;
}

// -----------------------------------------------------------------------------
// TypeHandle

/// A lazy reference to a type's metadata.
///
/// Metadata refers to other types through handles rather than through
/// their [`TypeMeta`], so self referential and mutually recursive types can
/// be described without building metadata eagerly.
#[derive(Clone, Copy)]
pub struct TypeHandle {
    id: fn() -> TypeId,
    path: fn() -> &'static str,
    meta: fn() -> TypeMeta,
}

impl TypeHandle {
    #[inline]
    pub const fn of<T: XmlType>() -> Self {
        Self {
            id: TypeId::of::<T>,
            path: core::any::type_name::<T>,
            meta: T::type_meta,
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        (self.id)()
    }

    #[inline]
    pub fn type_path(&self) -> &'static str {
        (self.path)()
    }

    /// Builds the metadata of the referenced type.
    #[inline]
    pub fn meta(&self) -> TypeMeta {
        (self.meta)()
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id()
    }
}

impl Eq for TypeHandle {}

impl Debug for TypeHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("TypeHandle").field(&self.type_path()).finish()
    }
}

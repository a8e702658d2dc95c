//! Type metadata: what a type looks like in XML.
//!
//! ## Menu
//!
//! - [`XmlType`]: implemented by every mappable type, returns its [`TypeMeta`].
//! - [`TypeMeta`]: names, flags, members, callbacks and a capability table.
//! - [`TypeHandle`]: a lazy reference to another type's metadata.
//! - [`Member`]: declares one member of a composite type.
//! - [`TypeTrait`]: a capability. The built-in ones are:
//!     - [`TypeTraitText`]: text conversion through [`XmlText`].
//!     - [`TypeTraitExternal`]: text conversion for foreign types.
//!     - [`TypeTraitEnum`]: token conversion through [`XmlEnum`].
//!     - [`TypeTraitCollection`]: sequence or dictionary access.
//!     - [`TypeTraitWrapper`]: nullable and pointer wrappers.
//!     - [`TypeTraitPolymorphic`]: slots holding one of several types.

// -----------------------------------------------------------------------------
// Modules

mod builder;
pub(crate) mod callback;
mod handle;
pub(crate) mod member;
mod traits;
mod type_meta;
mod type_trait;

// -----------------------------------------------------------------------------
// Exports

pub(crate) use traits::{TypedUpcast, TypedView};
pub(crate) use type_meta::default_name;

pub use builder::{CompositeBuilder, PolymorphicBuilder};
pub use handle::{TypeHandle, XmlType};
pub use member::{ItemMeta, Member, MemberFlags, MemberMeta, Placement};
pub use traits::{
    CollectionOps, ForEachEntryFn, ForEachFn, InsertFn, PushFn, ReadFn, TypeTraitCollection,
    TypeTraitEnum, TypeTraitExternal, TypeTraitPolymorphic, TypeTraitText, TypeTraitWrapper,
    Variant, WrapFn, WriteFn, XmlEnum, XmlText,
};
pub use type_meta::{TypeFlags, TypeMeta};
pub use type_trait::{FromType, TypeTrait};

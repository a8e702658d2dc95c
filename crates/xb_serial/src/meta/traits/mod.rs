// -----------------------------------------------------------------------------
// Modules

mod collection;
mod enums;
mod polymorphic;
mod text;
mod wrapper;

// -----------------------------------------------------------------------------
// Exports

pub(crate) use polymorphic::{TypedUpcast, TypedView};

pub use collection::{
    CollectionOps, ForEachEntryFn, ForEachFn, InsertFn, PushFn, TypeTraitCollection,
};
pub use enums::{TypeTraitEnum, XmlEnum};
pub use polymorphic::{TypeTraitPolymorphic, Variant};
pub use text::{TypeTraitExternal, TypeTraitText, XmlText};
pub use wrapper::{ReadFn, TypeTraitWrapper, WrapFn, WriteFn};

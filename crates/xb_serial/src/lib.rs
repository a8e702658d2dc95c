#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod classify;
mod context;
mod error;
mod impls;
mod scalar;
mod scope;
mod serializer;

pub mod meta;
pub mod registry;
pub mod session;
pub mod surrogate;

// -----------------------------------------------------------------------------
// Top-level exports

pub use classify::{Classifier, TypeKind};
pub use context::Context;
pub use error::{TypeTrail, XmlError};
pub use meta::{Member, Placement, TypeMeta, XmlEnum, XmlText, XmlType};
pub use registry::{TypeRegistry, XSerializerBuilder};
pub use scalar::{ScalarEntry, ScalarTable};
pub use scope::Scope;
pub use serializer::{NamespaceBinding, NamespaceBindings, SerializerOptions, XSerializer};
pub use session::Session;
pub use surrogate::{EnumSurrogate, Surrogate, SurrogateRegistry, ValueSurrogate};

/// The concrete type behind a trait object.
#[inline(always)]
pub(crate) fn type_of(value: &dyn core::any::Any) -> core::any::TypeId {
    value.type_id()
}

#[doc(hidden)]
pub mod __macro_exports {
    #[cfg(feature = "auto_register")]
    pub use inventory;
}

//! Type registration.
//!
//! ## Menu
//!
//! - [`XSerializerBuilder`]: declares and validates types in two phases.
//! - [`TypeRegistry`]: the frozen result, shared by every session.
//! - [`TypeDescriptor`]: a registered type with its compiled members.
//! - [`MemberDescriptor`]: a validated member.
//! - [`submit_type!`]: static registration through [`inventory`], picked
//!   up by [`XSerializerBuilder::auto_register`].
//!
//! Not every platform supports static registration. Where it does not,
//! `auto_register` finds nothing, and types must be registered by hand.
//!
//! [`submit_type!`]: crate::submit_type
//! [`inventory`]: https://docs.rs/inventory

// -----------------------------------------------------------------------------
// Modules

mod auto_register;
mod builder;
mod descriptor;
mod type_registry;

// -----------------------------------------------------------------------------
// Exports

pub use auto_register::AutoRegistration;
pub use builder::XSerializerBuilder;
pub use descriptor::{CollectionShape, MemberDescriptor, Slot, TypeDescriptor};
pub use type_registry::TypeRegistry;

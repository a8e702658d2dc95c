use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::TypeId;
use core::fmt::{Debug, Formatter};

use xb_tree::XName;

use crate::meta::member::Accessor;
use crate::meta::{MemberFlags, Placement, TypeMeta};
use crate::{Scope, TypeKind};

// -----------------------------------------------------------------------------
// Slot

/// A declared storage type and the type left after peeling its wrappers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot {
    pub storage: TypeId,
    pub core: TypeId,
}

// -----------------------------------------------------------------------------
// CollectionShape

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionShape {
    Sequence { item: Slot },
    Dictionary { key: Slot, value: Slot },
}

// -----------------------------------------------------------------------------
// MemberDescriptor

/// A validated member, ready for the session.
pub struct MemberDescriptor {
    pub(crate) label: String,
    pub(crate) name: XName,
    pub(crate) placement: Placement,
    pub(crate) flags: MemberFlags,
    pub(crate) slot: Slot,
    pub(crate) core_kind: TypeKind,
    pub(crate) scope: Option<Scope>,
    pub(crate) access: Arc<dyn Accessor>,
}

impl MemberDescriptor {
    /// The member name as declared.
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The element or attribute name.
    #[inline]
    pub fn name(&self) -> &XName {
        &self.name
    }

    /// Exactly one placement flag.
    #[inline]
    pub fn placement(&self) -> Placement {
        self.placement
    }

    #[inline]
    pub fn flags(&self) -> MemberFlags {
        self.flags
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.flags.contains(MemberFlags::READ_ONLY)
    }

    #[inline]
    pub fn is_required(&self) -> bool {
        self.flags.contains(MemberFlags::REQUIRED)
    }

    #[inline]
    pub fn slot(&self) -> Slot {
        self.slot
    }

    #[inline]
    pub fn core_kind(&self) -> TypeKind {
        self.core_kind
    }

    /// The local scope naming the items of a collection member.
    #[inline]
    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }
}

impl Debug for MemberDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("placement", &self.placement)
            .field("flags", &self.flags)
            .field("core_kind", &self.core_kind)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// TypeDescriptor

/// A registered type: its metadata, classification and compiled members.
pub struct TypeDescriptor {
    pub(crate) meta: TypeMeta,
    pub(crate) name: Option<XName>,
    pub(crate) kind: TypeKind,
    pub(crate) wrapper: bool,
    pub(crate) members: Vec<MemberDescriptor>,
    pub(crate) collection: Option<CollectionShape>,
    pub(crate) implemented: bool,
}

impl TypeDescriptor {
    pub(crate) fn declared(meta: TypeMeta, name: Option<XName>, kind: TypeKind, wrapper: bool) -> Self {
        Self {
            meta,
            name,
            kind,
            wrapper,
            members: Vec::new(),
            collection: None,
            implemented: wrapper || kind.is_leaf(),
        }
    }

    #[inline]
    pub fn meta(&self) -> &TypeMeta {
        &self.meta
    }

    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.meta.type_path()
    }

    /// The global name, `None` for wrappers.
    #[inline]
    pub fn name(&self) -> Option<&XName> {
        self.name.as_ref()
    }

    /// For wrappers, the kind of the wrapped type.
    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    #[inline]
    pub fn is_wrapper(&self) -> bool {
        self.wrapper
    }

    #[inline]
    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    /// Looks a member up by its declared name.
    pub fn member(&self, label: &str) -> Option<&MemberDescriptor> {
        self.members.iter().find(|m| m.label == label)
    }

    #[inline]
    pub fn collection(&self) -> Option<&CollectionShape> {
        self.collection.as_ref()
    }
}

impl Debug for TypeDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_path", &self.type_path())
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("members", &self.members)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

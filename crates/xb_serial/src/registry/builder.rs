use alloc::format;
use alloc::vec;
use alloc::vec::Vec;
use core::any::TypeId;

use xb_tree::{Attribute, Element, XName};
use xb_utils::hash::HashSet;

use crate::meta::{
    CollectionOps, ItemMeta, MemberFlags, MemberMeta, Placement, TypeFlags, TypeHandle, TypeMeta,
    TypeTraitCollection, TypeTraitWrapper, XmlType,
};
use crate::registry::{CollectionShape, MemberDescriptor, Slot, TypeDescriptor, TypeRegistry};
use crate::{
    Classifier, ScalarTable, Scope, Surrogate, SurrogateRegistry, TypeKind, XSerializer, XmlError,
};

// -----------------------------------------------------------------------------
// XSerializerBuilder

/// Registers types and produces an [`XSerializer`].
///
/// Registration runs in two phases. The declare phase walks the type graph
/// from the registered type, classifies every type it reaches and names it
/// in the global scope. The implement phase then compiles the members of the
/// newly declared composite types and validates them. Recursive types work
/// because every type is declared before any member refers to it.
///
/// Surrogates must be added before the first type, since classification
/// consults them.
///
/// After an error the builder should be dropped: the types declared before
/// the failure stay declared, and [`build`](Self::build) refuses types whose
/// members were never compiled.
///
/// # Examples
///
/// ```
/// use xb_serial::{Member, TypeMeta, XSerializerBuilder, XmlError, XmlType};
///
/// #[derive(Default)]
/// struct Note {
///     body: String,
/// }
///
/// impl XmlType for Note {
///     fn type_meta() -> TypeMeta {
///         TypeMeta::composite::<Self>()
///             .default_constructor()
///             .member(Member::new("Body", |n: &Note| &n.body, |n| &mut n.body))
///             .build()
///     }
/// }
///
/// let mut builder = XSerializerBuilder::new();
/// builder.register_root_type::<Note>()?;
/// let serializer = builder.build()?;
/// assert!(serializer.registry().get_type::<Note>().is_some());
/// # Ok::<(), XmlError>(())
/// ```
pub struct XSerializerBuilder {
    registry: TypeRegistry,
    classifier: Classifier,
    seeded: bool,
}

impl Default for XSerializerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for XSerializerBuilder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("XSerializerBuilder")
            .field("registry", &self.registry)
            .field("seeded", &self.seeded)
            .finish_non_exhaustive()
    }
}

impl XSerializerBuilder {
    /// A builder with the built-in scalars and surrogates.
    pub fn new() -> Self {
        Self::with_tables(ScalarTable::builtin(), SurrogateRegistry::new())
    }

    /// A builder with custom tables, for instance without the built-in
    /// surrogates.
    pub fn with_tables(scalars: ScalarTable, surrogates: SurrogateRegistry) -> Self {
        Self {
            registry: TypeRegistry::new(scalars, surrogates),
            classifier: Classifier::new(),
            seeded: false,
        }
    }

    #[inline]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Appends a surrogate, after the ones already present.
    pub fn register_surrogate(&mut self, surrogate: impl Surrogate) -> Result<&mut Self, XmlError> {
        if self.seeded {
            return Err(XmlError::invalid_operation(format!(
                "surrogate `{}` added after types were registered",
                surrogate.name()
            )));
        }
        self.registry.surrogates.push(surrogate);
        Ok(self)
    }

    /// Registers `T` as the type of document roots.
    ///
    /// Only one root type is allowed, and it cannot be a wrapper.
    pub fn register_root_type<T: XmlType>(&mut self) -> Result<&mut Self, XmlError> {
        if let Some(root) = self.registry.root {
            return Err(XmlError::invalid_operation(format!(
                "root type already registered as `{}`",
                self.registry.type_path(&root)
            )));
        }
        let handle = TypeHandle::of::<T>();
        self.register_handle(handle)?;
        let desc = self.registry.descriptor(&handle.type_id())?;
        if desc.is_wrapper() {
            return Err(XmlError::invalid_operation(format!(
                "root type `{}` is a wrapper",
                handle.type_path()
            )));
        }
        self.registry.root = Some(handle.type_id());
        Ok(self)
    }

    /// Registers `T` and every type it refers to.
    #[inline]
    pub fn register_type<T: XmlType>(&mut self) -> Result<&mut Self, XmlError> {
        self.register_handle(TypeHandle::of::<T>())?;
        Ok(self)
    }

    /// Registers the type behind `handle` and every type it refers to.
    pub fn register_handle(&mut self, handle: TypeHandle) -> Result<(), XmlError> {
        self.seed();
        let mut pending = Vec::new();
        self.declare(handle, &mut pending)?;
        for type_id in pending {
            self.implement(type_id)?;
        }
        Ok(())
    }

    /// Registers every type submitted with [`submit_type!`](crate::submit_type).
    ///
    /// Returns `false` when the `auto_register` feature is disabled or the
    /// platform does not support it.
    pub fn auto_register(&mut self) -> Result<bool, XmlError> {
        #[cfg(feature = "auto_register")]
        {
            let mut any = false;
            for entry in inventory::iter::<crate::registry::AutoRegistration> {
                self.register_handle((entry.handle)())?;
                any = true;
            }
            if !any {
                log::debug!("auto registration found no submitted types");
            }
            Ok(true)
        }
        #[cfg(not(feature = "auto_register"))]
        {
            Ok(false)
        }
    }

    /// Freezes the registry.
    pub fn build(mut self) -> Result<XSerializer, XmlError> {
        self.seed();
        let Some(root) = self.registry.root else {
            return Err(XmlError::invalid_operation("no root type registered"));
        };
        if let Some(desc) = self.registry.iter().find(|d| !d.implemented) {
            return Err(XmlError::invalid_operation(format!(
                "registration of `{}` did not complete",
                desc.type_path()
            )));
        }
        log::debug!(
            "serializer for `{}` built with {} types",
            self.registry.type_path(&root),
            self.registry.len()
        );
        Ok(XSerializer::from_registry(self.registry))
    }

    // -------------------------------------------------------------------------
    // Declare

    /// Declares the scalars so their names resolve before anything refers
    /// to them.
    fn seed(&mut self) {
        if self.seeded {
            return;
        }
        self.seeded = true;
        let handles: Vec<TypeHandle> = self.registry.scalars.iter().map(|e| e.handle()).collect();
        let mut pending = Vec::new();
        for handle in handles {
            if let Err(err) = self.declare(handle, &mut pending) {
                log::warn!("scalar `{}` was not declared: {err}", handle.type_path());
            }
        }
    }

    fn declare(&mut self, root: TypeHandle, pending: &mut Vec<TypeId>) -> Result<(), XmlError> {
        let mut stack = vec![root];
        let mut wrappers: Vec<(TypeId, TypeId)> = Vec::new();

        while let Some(handle) = stack.pop() {
            let type_id = handle.type_id();
            if self.registry.contains(&type_id) {
                continue;
            }
            let meta = handle.meta();
            if meta.type_id() != type_id {
                return Err(XmlError::invalid_operation(format!(
                    "`{}` describes itself with the metadata of `{}`",
                    handle.type_path(),
                    meta.type_path()
                )));
            }
            let dependencies = dependencies(&meta);

            let desc = if let Some(wrapper) = meta.get_trait::<TypeTraitWrapper>() {
                wrappers.push((type_id, wrapper.inner().type_id()));
                TypeDescriptor::declared(meta, None, TypeKind::Composite, true)
            } else {
                let kind = self.classifier.classify(
                    &meta,
                    &self.registry.scalars,
                    &self.registry.surrogates,
                );
                let name = match self.registry.scalars.get(&type_id) {
                    Some(entry) => entry.name().clone(),
                    None => meta.xml_name(),
                };
                self.registry
                    .global
                    .register(type_id, meta.type_path(), name.clone())?;
                if !kind.is_leaf() {
                    pending.push(type_id);
                }
                TypeDescriptor::declared(meta, Some(name), kind, false)
            };
            self.registry.descriptors.insert(type_id, desc);
            stack.extend(dependencies.into_iter().rev());
        }

        // Every wrapped type is declared by now.
        for (wrapper, _) in wrappers {
            let core = self.registry.core_of(wrapper);
            let kind = self.registry.descriptor(&core)?.kind;
            self.classifier.alias(wrapper, kind);
            if let Some(desc) = self.registry.descriptors.get_mut(&wrapper) {
                desc.kind = kind;
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Implement

    fn implement(&mut self, type_id: TypeId) -> Result<(), XmlError> {
        let desc = self.registry.descriptor(&type_id)?;
        if desc.implemented {
            return Ok(());
        }
        let (members, collection) = match desc.kind {
            TypeKind::Collection => (
                self.compile_collection_members(&desc.meta)?,
                Some(self.collection_shape(&desc.meta)?),
            ),
            TypeKind::Composite => (self.compile_members(&desc.meta)?, None),
            _ => (Vec::new(), None),
        };
        if let Some(desc) = self.registry.descriptors.get_mut(&type_id) {
            desc.members = members;
            desc.collection = collection;
            desc.implemented = true;
        }
        Ok(())
    }

    fn slot(&self, storage: TypeId) -> Slot {
        Slot {
            storage,
            core: self.registry.core_of(storage),
        }
    }

    fn collection_shape(&self, meta: &TypeMeta) -> Result<CollectionShape, XmlError> {
        let ops = meta
            .get_trait::<TypeTraitCollection>()
            .ok_or(XmlError::UnsupportedType(meta.type_path()))?;
        Ok(match *ops.ops() {
            CollectionOps::Sequence { item, .. } => CollectionShape::Sequence {
                item: self.slot(item.type_id()),
            },
            CollectionOps::Dictionary { key, value, .. } => CollectionShape::Dictionary {
                key: self.slot(key.type_id()),
                value: self.slot(value.type_id()),
            },
        })
    }

    fn compile_members(&self, meta: &TypeMeta) -> Result<Vec<MemberDescriptor>, XmlError> {
        let include_private = meta.flags().contains(TypeFlags::INCLUDE_PRIVATE);
        let mut members = Vec::with_capacity(meta.members().len());
        for member in meta.members() {
            if member.flags().contains(MemberFlags::PRIVATE) && !include_private {
                continue;
            }
            members.push(self.compile_member(meta, member)?);
        }
        resolve_shadowing(meta.type_path(), members)
    }

    /// The items of a collection are its children, so its own members can
    /// only live in attributes.
    fn compile_collection_members(&self, meta: &TypeMeta) -> Result<Vec<MemberDescriptor>, XmlError> {
        let members = self.compile_members(meta)?;
        let attributes = Placement::ATTRIBUTE | Placement::ANY_ATTRIBUTES;
        if let Some(member) = members.iter().find(|m| !attributes.contains(m.placement())) {
            return Err(XmlError::NotSupported(format!(
                "member `{}` of collection `{}` must be placed in an attribute",
                member.label(),
                meta.type_path()
            )));
        }
        Ok(members)
    }

    fn compile_member(&self, owner: &TypeMeta, member: &MemberMeta) -> Result<MemberDescriptor, XmlError> {
        let owner_path = owner.type_path();
        let placement = member.placement();
        if placement.bits().count_ones() > 1 {
            return Err(XmlError::ConflictingPlacement {
                owner: owner_path,
                member: member.name().into(),
                placements: placement.describe(),
            });
        }

        let storage = member.target().type_id();
        let passthrough = if placement == Placement::ANY_ELEMENTS {
            Some((TypeId::of::<Vec<Element>>(), "Vec<Element>"))
        } else if placement == Placement::ANY_ATTRIBUTES {
            Some((TypeId::of::<Vec<Attribute>>(), "Vec<Attribute>"))
        } else {
            None
        };

        let (slot, core_kind) = match passthrough {
            Some((expected_id, expected)) => {
                if storage != expected_id {
                    return Err(XmlError::InvalidPassthrough {
                        owner: owner_path,
                        member: member.name().into(),
                        expected,
                    });
                }
                (Slot { storage, core: storage }, TypeKind::Collection)
            }
            None => {
                let slot = self.slot(storage);
                (slot, self.registry.descriptor(&slot.core)?.kind)
            }
        };
        let core_desc = self.registry.get(&slot.core);
        let core_path = core_desc.map_or(member.target().type_path(), TypeDescriptor::type_path);

        if placement.intersects(Placement::ATTRIBUTE | Placement::TEXT) && !core_kind.is_leaf() {
            return Err(XmlError::NotLeaf {
                owner: owner_path,
                member: member.name().into(),
                placement: if placement == Placement::ATTRIBUTE { "attribute" } else { "text" },
                target: core_path,
            });
        }

        let read_only = member.flags().contains(MemberFlags::READ_ONLY);
        if read_only
            && passthrough.is_none()
            && (core_kind.is_leaf() || core_desc.is_some_and(|d| d.meta.is_value_type()))
        {
            return Err(XmlError::ReadOnlyValueMember {
                owner: owner_path,
                member: member.name().into(),
                target: core_path,
            });
        }

        let scope = if member.items().is_empty() {
            None
        } else {
            Some(self.item_scope(owner_path, member, slot.core)?)
        };

        Ok(MemberDescriptor {
            label: member.name().into(),
            name: XName::new(member.namespace().unwrap_or(""), member.name()),
            placement,
            flags: member.flags(),
            slot,
            core_kind,
            scope,
            access: member.access.clone(),
        })
    }

    /// Builds the local scope naming the declared items of a collection
    /// member. The collection's own item type is always part of it.
    fn item_scope(&self, owner: &'static str, member: &MemberMeta, core: TypeId) -> Result<Scope, XmlError> {
        let not_a_sequence = || {
            XmlError::invalid_operation(format!(
                "member `{}` of `{owner}` declares items but is not a sequence",
                member.name()
            ))
        };
        let ops = self
            .registry
            .descriptor(&core)?
            .meta
            .get_trait::<TypeTraitCollection>()
            .ok_or_else(not_a_sequence)?;
        let CollectionOps::Sequence { item, .. } = *ops.ops() else {
            return Err(not_a_sequence());
        };
        let item = self.slot(item.type_id());

        let mut scope = Scope::new(format!("{owner}::{}", member.name()));
        let mut declared_named = false;
        for entry in member.items() {
            let ty = self.registry.core_of(entry.ty().map_or(item.core, |h| h.type_id()));
            let path = self.registry.descriptor(&ty)?.type_path();
            if !self.registry.can_coerce(ty, item.storage) {
                return Err(XmlError::invalid_type(
                    self.registry.type_path(&item.storage),
                    path,
                ));
            }
            let name = self.item_name(entry, ty, path)?;
            scope.register(ty, path, name)?;
            declared_named |= ty == item.core;
        }
        if !declared_named {
            let path = self.registry.descriptor(&item.core)?.type_path();
            let name = self.registry.global.name_of(&item.core, path)?.clone();
            scope.register(item.core, path, name)?;
        }
        Ok(scope)
    }

    fn item_name(&self, entry: &ItemMeta, ty: TypeId, path: &'static str) -> Result<XName, XmlError> {
        match entry.name() {
            Some(local) => Ok(XName::new(entry.namespace().unwrap_or(""), local)),
            None => {
                let global = self.registry.global.name_of(&ty, path)?;
                Ok(match entry.namespace() {
                    Some(namespace) => XName::new(namespace, global.local_name()),
                    None => global.clone(),
                })
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Helpers

/// The types `meta` refers to, in declaration order.
fn dependencies(meta: &TypeMeta) -> Vec<TypeHandle> {
    let include_private = meta.flags().contains(TypeFlags::INCLUDE_PRIVATE);
    let mut deps = meta.includes().to_vec();
    for member in meta.members() {
        if member.flags().contains(MemberFlags::PRIVATE) && !include_private {
            continue;
        }
        if member
            .placement()
            .intersects(Placement::ANY_ELEMENTS | Placement::ANY_ATTRIBUTES)
        {
            continue;
        }
        deps.push(member.target());
        deps.extend(member.items().iter().filter_map(ItemMeta::ty));
    }
    if let Some(ops) = meta.get_trait::<TypeTraitCollection>() {
        match *ops.ops() {
            CollectionOps::Sequence { item, .. } => deps.push(item),
            CollectionOps::Dictionary { key, value, .. } => {
                deps.push(key);
                deps.push(value);
            }
        }
    }
    if let Some(wrapper) = meta.get_trait::<TypeTraitWrapper>() {
        deps.push(wrapper.inner());
    }
    deps
}

/// The key under which two members would collide.
fn collision_key(member: &MemberDescriptor) -> (Placement, Option<XName>) {
    if member.placement.intersects(Placement::ELEMENT | Placement::ATTRIBUTE) {
        (member.placement, Some(member.name.clone()))
    } else {
        (member.placement, None)
    }
}

fn duplicate(owner: &'static str, member: &MemberDescriptor) -> XmlError {
    let placement = match member.placement {
        p if p == Placement::ELEMENT => "element",
        p if p == Placement::ATTRIBUTE => "attribute",
        p if p == Placement::TEXT => "a text member",
        p if p == Placement::ANY_ELEMENTS => "an element collector",
        _ => "an attribute collector",
    };
    XmlError::DuplicateMember {
        owner,
        name: member.name.clone(),
        placement,
    }
}

/// Rejects colliding members, except that a direct member hides an
/// inherited one with the same key.
fn resolve_shadowing(
    owner: &'static str,
    members: Vec<MemberDescriptor>,
) -> Result<Vec<MemberDescriptor>, XmlError> {
    let mut direct: HashSet<_> = HashSet::default();
    for member in members.iter().filter(|m| !m.flags.contains(MemberFlags::FLATTENED)) {
        if !direct.insert(collision_key(member)) {
            return Err(duplicate(owner, member));
        }
    }
    let mut inherited: HashSet<_> = HashSet::default();
    let mut kept = Vec::with_capacity(members.len());
    for member in members {
        if member.flags.contains(MemberFlags::FLATTENED) {
            let key = collision_key(&member);
            if direct.contains(&key) {
                log::debug!("`{owner}` hides inherited member `{}`", member.label);
                continue;
            }
            if !inherited.insert(key) {
                return Err(duplicate(owner, &member));
            }
        }
        kept.push(member);
    }
    Ok(kept)
}

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt::{Debug, Formatter};
use core::marker::PhantomData;

use bitflags::bitflags;

use crate::meta::{TypeHandle, XmlType};

// -----------------------------------------------------------------------------
// Flags

bitflags! {
    /// Where a member lives in its owner's element.
    ///
    /// A member carries exactly one placement. Combinations are kept as
    /// declared so the builder can report them.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Placement: u8 {
        /// A child element, the default.
        const ELEMENT = 1 << 0;
        /// An attribute of the owner, leaf types only.
        const ATTRIBUTE = 1 << 1;
        /// The text content of the owner, leaf types only.
        const TEXT = 1 << 2;
        /// Collects child elements no other member claims.
        const ANY_ELEMENTS = 1 << 3;
        /// Collects attributes no other member claims.
        const ANY_ATTRIBUTES = 1 << 4;
    }
}

impl Placement {
    /// Lowercase names of the set placements, separated by `+`.
    pub fn describe(self) -> String {
        let mut out = String::new();
        for (name, _) in self.iter_names() {
            if !out.is_empty() {
                out.push('+');
            }
            out.push_str(&name.to_ascii_lowercase());
        }
        out
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MemberFlags: u8 {
        /// Filled in place on the existing value instead of being assigned.
        const READ_ONLY = 1 << 0;
        /// Absence in a document is an error.
        const REQUIRED = 1 << 1;
        /// Skipped unless the owner includes private members.
        const PRIVATE = 1 << 2;
        /// Inherited through `flatten`.
        const FLATTENED = 1 << 3;
    }
}

// -----------------------------------------------------------------------------
// Accessor

/// Type erased access to a member of its owner.
pub(crate) trait Accessor: Send + Sync {
    fn get<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Any>;

    fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Option<&'a mut dyn Any>;

    /// Replaces the member value, handing `value` back on a type mismatch.
    fn set(&self, owner: &mut dyn Any, value: Box<dyn Any>) -> Result<(), Box<dyn Any>>;
}

struct FieldAccess<T, M> {
    get: fn(&T) -> &M,
    get_mut: fn(&mut T) -> &mut M,
}

impl<T: Any, M: Any> Accessor for FieldAccess<T, M> {
    fn get<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Any> {
        owner
            .downcast_ref::<T>()
            .map(|owner| (self.get)(owner) as &dyn Any)
    }

    fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        owner
            .downcast_mut::<T>()
            .map(|owner| (self.get_mut)(owner) as &mut dyn Any)
    }

    fn set(&self, owner: &mut dyn Any, value: Box<dyn Any>) -> Result<(), Box<dyn Any>> {
        let Some(owner) = owner.downcast_mut::<T>() else {
            return Err(value);
        };
        let value = value.downcast::<M>()?;
        *(self.get_mut)(owner) = *value;
        Ok(())
    }
}

/// Reaches a member of an embedded value.
struct Chained {
    outer: Arc<dyn Accessor>,
    inner: Arc<dyn Accessor>,
}

impl Accessor for Chained {
    fn get<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Any> {
        self.outer.get(owner).and_then(|base| self.inner.get(base))
    }

    fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        let inner = &self.inner;
        self.outer.get_mut(owner).and_then(|base| inner.get_mut(base))
    }

    fn set(&self, owner: &mut dyn Any, value: Box<dyn Any>) -> Result<(), Box<dyn Any>> {
        match self.outer.get_mut(owner) {
            Some(base) => self.inner.set(base, value),
            None => Err(value),
        }
    }
}

pub(crate) fn field_access<T: Any, M: Any>(
    get: fn(&T) -> &M,
    get_mut: fn(&mut T) -> &mut M,
) -> Arc<dyn Accessor> {
    Arc::new(FieldAccess { get, get_mut })
}

// -----------------------------------------------------------------------------
// ItemMeta

/// A type accepted as an item of a collection member.
#[derive(Clone, Debug)]
pub struct ItemMeta {
    pub(crate) ty: Option<TypeHandle>,
    pub(crate) name: Option<String>,
    pub(crate) namespace: Option<String>,
}

impl ItemMeta {
    /// The item type, `None` stands for the collection's declared item type.
    #[inline]
    pub fn ty(&self) -> Option<TypeHandle> {
        self.ty
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

// -----------------------------------------------------------------------------
// MemberMeta

/// A declared member of a composite type.
#[derive(Clone)]
pub struct MemberMeta {
    pub(crate) name: String,
    pub(crate) namespace: Option<String>,
    pub(crate) placement: Placement,
    pub(crate) flags: MemberFlags,
    pub(crate) target: TypeHandle,
    pub(crate) items: Vec<ItemMeta>,
    pub(crate) access: Arc<dyn Accessor>,
}

impl MemberMeta {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The declared placement, [`Placement::ELEMENT`] when none was given.
    #[inline]
    pub fn placement(&self) -> Placement {
        if self.placement.is_empty() {
            Placement::ELEMENT
        } else {
            self.placement
        }
    }

    #[inline]
    pub fn flags(&self) -> MemberFlags {
        self.flags
    }

    /// The stored type of the member.
    #[inline]
    pub fn target(&self) -> TypeHandle {
        self.target
    }

    #[inline]
    pub fn items(&self) -> &[ItemMeta] {
        &self.items
    }

    /// Rebinds the accessor so the member is reached through `outer`.
    pub(crate) fn flattened(&self, outer: &Arc<dyn Accessor>) -> Self {
        let mut member = self.clone();
        member.access = Arc::new(Chained {
            outer: outer.clone(),
            inner: self.access.clone(),
        });
        member.flags |= MemberFlags::FLATTENED;
        member
    }
}

impl Debug for MemberMeta {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemberMeta")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("placement", &self.placement)
            .field("flags", &self.flags)
            .field("target", &self.target)
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Member

/// Declares a member of `T`, consumed by
/// [`CompositeBuilder::member`](crate::meta::CompositeBuilder::member).
///
/// A member is a pair of accessors to a field plus its XML placement.
/// Without an explicit placement it becomes a child element.
///
/// # Examples
///
/// ```
/// use xb_serial::{Member, Placement};
///
/// struct Point {
///     x: i32,
///     tags: Vec<String>,
/// }
///
/// let x = Member::new("X", |p: &Point| &p.x, |p| &mut p.x).attribute().required();
/// let tags = Member::new("Tags", |p: &Point| &p.tags, |p| &mut p.tags).item_named::<String>("Tag");
///
/// assert_eq!(x.meta().placement(), Placement::ATTRIBUTE);
/// assert_eq!(tags.meta().items()[0].name(), Some("Tag"));
/// ```
pub struct Member<T> {
    meta: MemberMeta,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Any> Member<T> {
    pub fn new<M: XmlType>(
        name: impl Into<String>,
        get: fn(&T) -> &M,
        get_mut: fn(&mut T) -> &mut M,
    ) -> Self {
        Self {
            meta: MemberMeta {
                name: name.into(),
                namespace: None,
                placement: Placement::empty(),
                flags: MemberFlags::empty(),
                target: TypeHandle::of::<M>(),
                items: Vec::new(),
                access: field_access(get, get_mut),
            },
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn meta(&self) -> &MemberMeta {
        &self.meta
    }

    #[inline]
    pub(crate) fn into_meta(self) -> MemberMeta {
        self.meta
    }

    #[inline]
    fn place(mut self, placement: Placement) -> Self {
        self.meta.placement |= placement;
        self
    }

    #[inline]
    fn flag(mut self, flag: MemberFlags) -> Self {
        self.meta.flags |= flag;
        self
    }

    pub fn element(self) -> Self {
        self.place(Placement::ELEMENT)
    }

    pub fn attribute(self) -> Self {
        self.place(Placement::ATTRIBUTE)
    }

    pub fn text(self) -> Self {
        self.place(Placement::TEXT)
    }

    /// The member must be a `Vec<Element>`.
    pub fn any_elements(self) -> Self {
        self.place(Placement::ANY_ELEMENTS)
    }

    /// The member must be a `Vec<Attribute>`.
    pub fn any_attributes(self) -> Self {
        self.place(Placement::ANY_ATTRIBUTES)
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.meta.namespace = Some(namespace.into());
        self
    }

    pub fn read_only(self) -> Self {
        self.flag(MemberFlags::READ_ONLY)
    }

    pub fn required(self) -> Self {
        self.flag(MemberFlags::REQUIRED)
    }

    pub fn private(self) -> Self {
        self.flag(MemberFlags::PRIVATE)
    }

    /// Accepts items of type `I`, named by their type name.
    pub fn item<I: XmlType>(mut self) -> Self {
        self.meta.items.push(ItemMeta {
            ty: Some(TypeHandle::of::<I>()),
            name: None,
            namespace: None,
        });
        self
    }

    /// Accepts items of type `I` under the element name `name`.
    pub fn item_named<I: XmlType>(mut self, name: impl Into<String>) -> Self {
        self.meta.items.push(ItemMeta {
            ty: Some(TypeHandle::of::<I>()),
            name: Some(name.into()),
            namespace: None,
        });
        self
    }

    /// Renames the collection's declared item type.
    pub fn item_name(mut self, name: impl Into<String>) -> Self {
        self.meta.items.push(ItemMeta {
            ty: None,
            name: Some(name.into()),
            namespace: None,
        });
        self
    }

    /// Sets the namespace of the last declared item.
    pub fn item_namespace(mut self, namespace: impl Into<String>) -> Self {
        if let Some(item) = self.meta.items.last_mut() {
            item.namespace = Some(namespace.into());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{Accessor, MemberFlags, Placement, field_access};
    use alloc::boxed::Box;
    use alloc::sync::Arc;
    use core::any::Any;

    struct Outer {
        inner: Inner,
    }

    struct Inner {
        value: i32,
    }

    #[test]
    fn placements_describe_themselves() {
        assert_eq!(Placement::ATTRIBUTE.describe(), "attribute");
        assert_eq!((Placement::ELEMENT | Placement::TEXT).describe(), "element+text");
    }

    #[test]
    fn field_access_round_trip() {
        let access = field_access(|o: &Inner| &o.value, |o: &mut Inner| &mut o.value);
        let mut inner = Inner { value: 3 };
        assert_eq!(access.get(&inner).unwrap().downcast_ref::<i32>(), Some(&3));

        access.set(&mut inner, Box::new(9_i32)).unwrap();
        assert_eq!(inner.value, 9);
        assert!(access.set(&mut inner, Box::new(9_u8)).is_err());
        assert!(access.get(&5_u8 as &dyn Any).is_none());
    }

    #[test]
    fn flattened_members_reach_through_the_base() {
        let outer_access = field_access(|o: &Outer| &o.inner, |o: &mut Outer| &mut o.inner);
        let base = super::MemberMeta {
            name: "Value".into(),
            namespace: None,
            placement: Placement::ATTRIBUTE,
            flags: MemberFlags::empty(),
            target: crate::meta::TypeHandle::of::<i32>(),
            items: Vec::new(),
            access: field_access(|o: &Inner| &o.value, |o: &mut Inner| &mut o.value),
        };
        let member = base.flattened(&outer_access);
        assert!(member.flags().contains(MemberFlags::FLATTENED));

        let mut outer = Outer {
            inner: Inner { value: 1 },
        };
        member.access.set(&mut outer, Box::new(4_i32)).unwrap();
        assert_eq!(outer.inner.value, 4);
        let seen = member.access.get(&outer).unwrap();
        assert_eq!(seen.downcast_ref::<i32>(), Some(&4));
        let _: Arc<dyn Accessor> = member.access.clone();
    }
}

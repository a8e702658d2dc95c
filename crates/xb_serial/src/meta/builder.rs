use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::marker::PhantomData;

use crate::Context;
use crate::meta::callback::{MutHook, RefHook};
use crate::meta::member::field_access;
use crate::meta::{
    Member, TypeFlags, TypeHandle, TypeMeta, TypeTrait, TypeTraitPolymorphic, TypedUpcast,
    TypedView, Variant, XmlType,
};

// -----------------------------------------------------------------------------
// CompositeBuilder

/// Describes a composite type, see [`TypeMeta::composite`].
///
/// # Examples
///
/// ```
/// use xb_serial::{Context, Member, TypeMeta, XmlType};
///
/// #[derive(Default)]
/// struct Audit {
///     stamp: u64,
/// }
///
/// #[derive(Default)]
/// struct Order {
///     audit: Audit,
///     id: u32,
/// }
///
/// impl XmlType for Audit {
///     fn type_meta() -> TypeMeta {
///         TypeMeta::composite::<Self>()
///             .default_constructor()
///             .member(Member::new("Stamp", |a: &Audit| &a.stamp, |a| &mut a.stamp).attribute())
///             .build()
///     }
/// }
///
/// impl XmlType for Order {
///     fn type_meta() -> TypeMeta {
///         TypeMeta::composite::<Self>()
///             .name("order")
///             .namespace("urn:shop")
///             .default_constructor()
///             .flatten(|o: &Order| &o.audit, |o| &mut o.audit)
///             .member(Member::new("Id", |o: &Order| &o.id, |o| &mut o.id).attribute())
///             .on_deserialized(|o: &mut Order, _: &Context<'_>| o.id += 1)
///             .build()
///     }
/// }
///
/// let meta = Order::type_meta();
/// assert_eq!(meta.xml_name().to_string(), "{urn:shop}order");
/// assert_eq!(meta.members().len(), 2);
/// assert_eq!(meta.callback_len(), 1);
/// ```
pub struct CompositeBuilder<T> {
    meta: TypeMeta,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Any> CompositeBuilder<T> {
    #[inline]
    pub(crate) fn new(meta: TypeMeta) -> Self {
        Self {
            meta,
            _marker: PhantomData,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.meta.set_name(name.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.meta.set_namespace(namespace.into());
        self
    }

    /// Registers `U` whenever this type is registered.
    pub fn include<U: XmlType>(mut self) -> Self {
        self.meta.includes.push(TypeHandle::of::<U>());
        self
    }

    /// See [`TypeFlags::VALUE_TYPE`].
    pub fn value_type(mut self) -> Self {
        *self.meta.flags_mut() |= TypeFlags::VALUE_TYPE;
        self
    }

    /// See [`TypeFlags::INCLUDE_PRIVATE`].
    pub fn include_private(mut self) -> Self {
        *self.meta.flags_mut() |= TypeFlags::INCLUDE_PRIVATE;
        self
    }

    /// Creates instances with `f`.
    pub fn constructor(mut self, f: fn() -> T) -> Self {
        self.meta.constructor = Some(Arc::new(move || Box::new(f()) as Box<dyn Any>));
        self
    }

    /// Creates instances with [`Default`].
    pub fn default_constructor(mut self) -> Self
    where
        T: Default,
    {
        self.meta.constructor = Some(Arc::new(|| Box::new(T::default()) as Box<dyn Any>));
        self
    }

    pub fn member(mut self, member: Member<T>) -> Self {
        self.meta.members.push(member.into_meta());
        self
    }

    /// Maps the members and callbacks of an embedded `B` as if they were
    /// declared on `T`.
    ///
    /// Members declared directly on `T` take precedence over flattened
    /// members of the same name and placement.
    pub fn flatten<B: XmlType>(mut self, get: fn(&T) -> &B, get_mut: fn(&mut T) -> &mut B) -> Self {
        let base = B::type_meta();
        let outer = field_access(get, get_mut);
        self.meta
            .members
            .extend(base.members.iter().map(|m| m.flattened(&outer)));
        self.meta.callbacks.extend_embedded(&base.callbacks, &outer);
        self.meta.includes.extend_from_slice(&base.includes);
        self
    }

    /// Runs before the members of a value are written.
    pub fn on_serializing(mut self, f: fn(&T, &Context<'_>)) -> Self {
        self.meta.callbacks.serializing.push(Arc::new(RefHook(f)));
        self
    }

    /// Runs after the members of a value are written.
    pub fn on_serialized(mut self, f: fn(&T, &Context<'_>)) -> Self {
        self.meta.callbacks.serialized.push(Arc::new(RefHook(f)));
        self
    }

    /// Runs before the members of a value are read.
    pub fn on_deserializing(mut self, f: fn(&mut T, &Context<'_>)) -> Self {
        self.meta.callbacks.deserializing.push(Arc::new(MutHook(f)));
        self
    }

    /// Runs after the members of a value are read.
    pub fn on_deserialized(mut self, f: fn(&mut T, &Context<'_>)) -> Self {
        self.meta.callbacks.deserialized.push(Arc::new(MutHook(f)));
        self
    }

    /// Attaches an extra capability.
    pub fn with_trait<C: TypeTrait>(mut self, capability: C) -> Self {
        self.meta.insert_trait(capability);
        self
    }

    #[inline]
    pub fn build(self) -> TypeMeta {
        self.meta
    }
}

impl<T: Any> From<CompositeBuilder<T>> for TypeMeta {
    #[inline]
    fn from(value: CompositeBuilder<T>) -> Self {
        value.build()
    }
}

// -----------------------------------------------------------------------------
// PolymorphicBuilder

/// Describes a polymorphic slot, see [`TypeMeta::polymorphic`] and
/// [`impl_xml_polymorphic!`](crate::impl_xml_polymorphic).
pub struct PolymorphicBuilder<P> {
    meta: TypeMeta,
    view: TypedView<P>,
    variants: Vec<Variant>,
}

impl<P: Any> PolymorphicBuilder<P> {
    pub(crate) fn new(
        meta: TypeMeta,
        view: fn(&P) -> &dyn Any,
        view_mut: fn(&mut P) -> &mut dyn Any,
    ) -> Self {
        Self {
            meta,
            view: TypedView { view, view_mut },
            variants: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.meta.set_name(name.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.meta.set_namespace(namespace.into());
        self
    }

    /// Accepts `V`, converted into the slot with `upcast`.
    pub fn variant<V: XmlType>(mut self, upcast: fn(V) -> P) -> Self {
        let ty = TypeHandle::of::<V>();
        self.meta.includes.push(ty);
        self.variants
            .push(Variant::new(ty, Arc::new(TypedUpcast(upcast))));
        self
    }

    pub fn build(self) -> TypeMeta {
        let mut meta = self.meta;
        meta.insert_trait(TypeTraitPolymorphic::new(Arc::new(self.view), self.variants));
        meta
    }
}

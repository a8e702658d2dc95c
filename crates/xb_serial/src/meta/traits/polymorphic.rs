use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, TypeId};

use crate::meta::{TypeHandle, TypeTrait};

// -----------------------------------------------------------------------------
// Erasure

pub(crate) trait Upcast: Send + Sync {
    fn upcast(&self, value: Box<dyn Any>) -> Result<Box<dyn Any>, Box<dyn Any>>;
}

pub(crate) struct TypedUpcast<V, P>(pub(crate) fn(V) -> P);

impl<V: Any, P: Any> Upcast for TypedUpcast<V, P> {
    fn upcast(&self, value: Box<dyn Any>) -> Result<Box<dyn Any>, Box<dyn Any>> {
        let value = value.downcast::<V>()?;
        Ok(Box::new((self.0)(*value)))
    }
}

pub(crate) trait View: Send + Sync {
    fn view<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Any>;

    fn view_mut<'a>(&self, value: &'a mut dyn Any) -> Option<&'a mut dyn Any>;
}

pub(crate) struct TypedView<P> {
    pub(crate) view: fn(&P) -> &dyn Any,
    pub(crate) view_mut: fn(&mut P) -> &mut dyn Any,
}

impl<P: Any> View for TypedView<P> {
    fn view<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Any> {
        value.downcast_ref::<P>().map(self.view)
    }

    fn view_mut<'a>(&self, value: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        value.downcast_mut::<P>().map(self.view_mut)
    }
}

// -----------------------------------------------------------------------------
// Variant

/// A concrete type a polymorphic slot accepts.
#[derive(Clone)]
pub struct Variant {
    ty: TypeHandle,
    upcast: Arc<dyn Upcast>,
}

impl Variant {
    pub(crate) fn new(ty: TypeHandle, upcast: Arc<dyn Upcast>) -> Self {
        Self { ty, upcast }
    }

    #[inline]
    pub fn ty(&self) -> TypeHandle {
        self.ty
    }
}

// -----------------------------------------------------------------------------
// TypeTraitPolymorphic

/// A slot holding one of several concrete types, typically `Box<dyn Trait>`.
///
/// The slot is never serialized itself: the session looks through it with
/// [`view`](Self::view) and works on the concrete value, and on the way back
/// converts a concrete value into the slot with [`upcast`](Self::upcast).
#[derive(Clone)]
pub struct TypeTraitPolymorphic {
    view: Arc<dyn View>,
    variants: Vec<Variant>,
}

impl TypeTrait for TypeTraitPolymorphic {}

impl TypeTraitPolymorphic {
    pub(crate) fn new(view: Arc<dyn View>, variants: Vec<Variant>) -> Self {
        Self { view, variants }
    }

    /// The concrete value inside the slot.
    #[inline]
    pub fn view<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Any> {
        self.view.view(value)
    }

    #[inline]
    pub fn view_mut<'a>(&self, value: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        self.view.view_mut(value)
    }

    #[inline]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn variant(&self, type_id: TypeId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.ty.type_id() == type_id)
    }

    /// Converts a boxed concrete value into the slot type.
    pub fn upcast(&self, value: Box<dyn Any>) -> Result<Box<dyn Any>, Box<dyn Any>> {
        let found = crate::type_of(&*value);
        match self.variant(found) {
            Some(variant) => variant.upcast.upcast(value),
            None => Err(value),
        }
    }
}

// -----------------------------------------------------------------------------
// impl_xml_polymorphic

/// Implements [`XmlType`](crate::XmlType) for `Box<dyn Trait>`.
///
/// `Trait` must have `Any` as a supertrait. Each listed type must implement
/// `Trait` and [`XmlType`](crate::XmlType).
///
/// # Examples
///
/// ```
/// use core::any::Any;
/// use xb_serial::{Member, TypeMeta, XmlType, impl_xml_polymorphic};
///
/// trait Shape: Any {
///     fn area(&self) -> f64;
/// }
///
/// #[derive(Default)]
/// struct Square {
///     side: f64,
/// }
///
/// impl Shape for Square {
///     fn area(&self) -> f64 {
///         self.side * self.side
///     }
/// }
///
/// impl XmlType for Square {
///     fn type_meta() -> TypeMeta {
///         TypeMeta::composite::<Self>()
///             .default_constructor()
///             .member(Member::new("Side", |s: &Square| &s.side, |s| &mut s.side))
///             .build()
///     }
/// }
///
/// impl_xml_polymorphic!(Shape as "Shape" => [Square]);
///
/// let meta = <Box<dyn Shape>>::type_meta();
/// assert_eq!(meta.xml_name().local_name(), "Shape");
/// ```
#[macro_export]
macro_rules! impl_xml_polymorphic {
    ($base:path as $name:literal => [$($variant:ty),* $(,)?]) => {
        impl $crate::XmlType for ::std::boxed::Box<dyn $base> {
            fn type_meta() -> $crate::meta::TypeMeta {
                $crate::meta::TypeMeta::polymorphic::<Self>(|slot| &**slot, |slot| &mut **slot)
                    .name($name)
                    $(.variant::<$variant>(|value| ::std::boxed::Box::new(value)))*
                    .build()
            }
        }
    };
    ($base:path => [$($variant:ty),* $(,)?]) => {
        impl $crate::XmlType for ::std::boxed::Box<dyn $base> {
            fn type_meta() -> $crate::meta::TypeMeta {
                $crate::meta::TypeMeta::polymorphic::<Self>(|slot| &**slot, |slot| &mut **slot)
                    $(.variant::<$variant>(|value| ::std::boxed::Box::new(value)))*
                    .build()
            }
        }
    };
}

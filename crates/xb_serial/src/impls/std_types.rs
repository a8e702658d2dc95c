use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::rc::Rc;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, type_name};
use core::cell::RefCell;
use core::hash::{BuildHasher, Hash};
use core::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::collections::{HashMap, HashSet};

use xb_tree::{Attribute, Element};

use crate::XmlError;
use crate::meta::{TypeHandle, TypeMeta, TypeTraitCollection, TypeTraitWrapper, XmlType};

fn mismatch<T>() -> XmlError {
    XmlError::invalid_type(type_name::<T>(), "a value of another type")
}

// -----------------------------------------------------------------------------
// Wrappers

impl<T: XmlType> XmlType for Option<T> {
    fn type_meta() -> TypeMeta {
        let mut meta = TypeMeta::opaque::<Self>();
        meta.insert_trait(TypeTraitWrapper::new(
            TypeHandle::of::<T>(),
            |value, visit| match value.downcast_ref::<Option<T>>() {
                Some(inner) => visit(inner.as_ref().map(|v| v as &dyn Any)),
                None => Err(mismatch::<Option<T>>()),
            },
            |value, visit| match value.downcast_mut::<Option<T>>() {
                Some(inner) => visit(inner.as_mut().map(|v| v as &mut dyn Any)),
                None => Err(mismatch::<Option<T>>()),
            },
            |inner| {
                inner
                    .downcast::<T>()
                    .map(|v| Box::new(Some(*v)) as Box<dyn Any>)
            },
        ));
        meta
    }
}

impl<T: XmlType> XmlType for Box<T> {
    fn type_meta() -> TypeMeta {
        let mut meta = TypeMeta::opaque::<Self>();
        meta.insert_trait(TypeTraitWrapper::new(
            TypeHandle::of::<T>(),
            |value, visit| match value.downcast_ref::<Box<T>>() {
                Some(inner) => visit(Some(&**inner)),
                None => Err(mismatch::<Box<T>>()),
            },
            |value, visit| match value.downcast_mut::<Box<T>>() {
                Some(inner) => visit(Some(&mut **inner)),
                None => Err(mismatch::<Box<T>>()),
            },
            |inner| inner.downcast::<T>().map(|v| Box::new(v) as Box<dyn Any>),
        ));
        meta
    }
}

impl<T: XmlType> XmlType for Rc<T> {
    fn type_meta() -> TypeMeta {
        let mut meta = TypeMeta::opaque::<Self>();
        meta.insert_trait(TypeTraitWrapper::new(
            TypeHandle::of::<T>(),
            |value, visit| match value.downcast_ref::<Rc<T>>() {
                Some(inner) => visit(Some(&**inner)),
                None => Err(mismatch::<Rc<T>>()),
            },
            |value, visit| match value.downcast_mut::<Rc<T>>().map(Rc::get_mut) {
                Some(Some(inner)) => visit(Some(inner)),
                Some(None) => Err(XmlError::NotSupported(alloc::format!(
                    "a shared `{}` cannot be filled in place",
                    type_name::<Rc<T>>()
                ))),
                None => Err(mismatch::<Rc<T>>()),
            },
            |inner| inner.downcast::<T>().map(|v| Box::new(Rc::new(*v)) as Box<dyn Any>),
        ));
        meta
    }
}

impl<T: XmlType> XmlType for Arc<T> {
    fn type_meta() -> TypeMeta {
        let mut meta = TypeMeta::opaque::<Self>();
        meta.insert_trait(TypeTraitWrapper::new(
            TypeHandle::of::<T>(),
            |value, visit| match value.downcast_ref::<Arc<T>>() {
                Some(inner) => visit(Some(&**inner)),
                None => Err(mismatch::<Arc<T>>()),
            },
            |value, visit| match value.downcast_mut::<Arc<T>>().map(Arc::get_mut) {
                Some(Some(inner)) => visit(Some(inner)),
                Some(None) => Err(XmlError::NotSupported(alloc::format!(
                    "a shared `{}` cannot be filled in place",
                    type_name::<Arc<T>>()
                ))),
                None => Err(mismatch::<Arc<T>>()),
            },
            |inner| inner.downcast::<T>().map(|v| Box::new(Arc::new(*v)) as Box<dyn Any>),
        ));
        meta
    }
}

impl<T: XmlType> XmlType for RefCell<T> {
    fn type_meta() -> TypeMeta {
        let mut meta = TypeMeta::opaque::<Self>();
        meta.insert_trait(TypeTraitWrapper::new(
            TypeHandle::of::<T>(),
            |value, visit| {
                let cell = value
                    .downcast_ref::<RefCell<T>>()
                    .ok_or_else(mismatch::<RefCell<T>>)?;
                let guard = cell.try_borrow().map_err(|_| {
                    XmlError::NotSupported(alloc::format!(
                        "`{}` is mutably borrowed",
                        type_name::<RefCell<T>>()
                    ))
                })?;
                visit(Some(&*guard))
            },
            |value, visit| match value.downcast_mut::<RefCell<T>>() {
                Some(cell) => visit(Some(cell.get_mut())),
                None => Err(mismatch::<RefCell<T>>()),
            },
            |inner| {
                inner
                    .downcast::<T>()
                    .map(|v| Box::new(RefCell::new(*v)) as Box<dyn Any>)
            },
        ));
        meta
    }
}

// -----------------------------------------------------------------------------
// Collections

impl<T: XmlType> XmlType for Vec<T> {
    fn type_meta() -> TypeMeta {
        let mut meta = TypeMeta::opaque::<Self>();
        meta.insert_trait(TypeTraitCollection::sequence::<Self, T>());
        meta
    }
}

impl<T: XmlType> XmlType for VecDeque<T> {
    fn type_meta() -> TypeMeta {
        let mut meta = TypeMeta::opaque::<Self>();
        meta.insert_trait(TypeTraitCollection::sequence::<Self, T>());
        meta
    }
}

impl<T: XmlType + Ord> XmlType for BTreeSet<T> {
    fn type_meta() -> TypeMeta {
        let mut meta = TypeMeta::opaque::<Self>();
        meta.insert_trait(TypeTraitCollection::sequence::<Self, T>());
        meta
    }
}

impl<T, S> XmlType for HashSet<T, S>
where
    T: XmlType + Eq + Hash,
    S: BuildHasher + Default + 'static,
{
    fn type_meta() -> TypeMeta {
        let mut meta = TypeMeta::opaque::<Self>();
        meta.insert_trait(TypeTraitCollection::sequence::<Self, T>());
        meta
    }
}

impl<K: XmlType + Ord, V: XmlType> XmlType for BTreeMap<K, V> {
    fn type_meta() -> TypeMeta {
        let mut meta = TypeMeta::opaque::<Self>();
        meta.insert_trait(TypeTraitCollection::dictionary::<Self, K, V>());
        meta
    }
}

impl<K, V, S> XmlType for HashMap<K, V, S>
where
    K: XmlType + Eq + Hash,
    V: XmlType,
    S: BuildHasher + Default + 'static,
{
    fn type_meta() -> TypeMeta {
        let mut meta = TypeMeta::opaque::<Self>();
        meta.insert_trait(TypeTraitCollection::dictionary::<Self, K, V>());
        meta
    }
}

// -----------------------------------------------------------------------------
// Pass-through nodes

// Only valid as `any_elements` / `any_attributes` members, which the
// builder checks before these are ever looked at.

impl XmlType for Element {
    fn type_meta() -> TypeMeta {
        TypeMeta::opaque::<Self>()
    }
}

impl XmlType for Attribute {
    fn type_meta() -> TypeMeta {
        TypeMeta::opaque::<Self>()
    }
}

// -----------------------------------------------------------------------------
// Foreign leaves

macro_rules! impl_external {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl XmlType for $ty {
                fn type_meta() -> TypeMeta {
                    TypeMeta::external::<Self>().with_name($name)
                }
            }
        )*
    };
}

impl_external!(
    IpAddr => "ipAddress",
    Ipv4Addr => "ipv4Address",
    Ipv6Addr => "ipv6Address",
    SocketAddr => "socketAddress",
);

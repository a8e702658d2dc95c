use alloc::boxed::Box;
use core::any::{Any, type_name};

use crate::XmlError;
use crate::meta::{TypeHandle, TypeTrait, XmlType};

/// Visits every item of a sequence.
pub type ForEachFn =
    fn(&dyn Any, &mut dyn FnMut(&dyn Any) -> Result<(), XmlError>) -> Result<(), XmlError>;

/// Appends an item, handing it back on a type mismatch.
pub type PushFn = fn(&mut dyn Any, Box<dyn Any>) -> Result<(), Box<dyn Any>>;

/// Visits every key/value pair of a dictionary.
pub type ForEachEntryFn = fn(
    &dyn Any,
    &mut dyn FnMut(&dyn Any, &dyn Any) -> Result<(), XmlError>,
) -> Result<(), XmlError>;

/// Inserts a key/value pair.
pub type InsertFn = fn(&mut dyn Any, Box<dyn Any>, Box<dyn Any>) -> Result<(), XmlError>;

// -----------------------------------------------------------------------------
// CollectionOps

/// The shape of a collection.
#[derive(Clone, Copy)]
pub enum CollectionOps {
    Sequence {
        item: TypeHandle,
        for_each: ForEachFn,
        push: PushFn,
    },
    Dictionary {
        key: TypeHandle,
        value: TypeHandle,
        for_each: ForEachEntryFn,
        insert: InsertFn,
    },
}

// -----------------------------------------------------------------------------
// TypeTraitCollection

/// Type erased access to a sequence or a dictionary.
///
/// # Examples
///
/// ```
/// use xb_serial::meta::TypeTraitCollection;
///
/// let ops = TypeTraitCollection::sequence::<Vec<i32>, i32>();
/// let mut list = ops.create();
/// ops.push(&mut *list, Box::new(4_i32)).unwrap();
/// ops.push(&mut *list, Box::new(2_i32)).unwrap();
///
/// assert_eq!(ops.len(&*list), 2);
/// assert_eq!(list.downcast_ref::<Vec<i32>>(), Some(&vec![4, 2]));
/// ```
#[derive(Clone, Copy)]
pub struct TypeTraitCollection {
    create: fn() -> Box<dyn Any>,
    len: fn(&dyn Any) -> usize,
    ops: CollectionOps,
}

impl TypeTrait for TypeTraitCollection {}

impl TypeTraitCollection {
    /// A sequence of `T` stored in `C`.
    pub fn sequence<C, T>() -> Self
    where
        C: Default + Extend<T> + Any,
        T: XmlType,
        for<'a> &'a C: IntoIterator<Item = &'a T>,
    {
        Self {
            create: || Box::new(C::default()),
            len: |value| value.downcast_ref::<C>().map_or(0, |c| c.into_iter().count()),
            ops: CollectionOps::Sequence {
                item: TypeHandle::of::<T>(),
                for_each: |value, f| {
                    let Some(items) = value.downcast_ref::<C>() else {
                        return Err(mismatch::<C>());
                    };
                    for item in items {
                        f(item)?;
                    }
                    Ok(())
                },
                push: |target, item| {
                    let Some(items) = target.downcast_mut::<C>() else {
                        return Err(item);
                    };
                    let item = item.downcast::<T>()?;
                    items.extend(core::iter::once(*item));
                    Ok(())
                },
            },
        }
    }

    /// A dictionary from `K` to `V` stored in `C`.
    pub fn dictionary<C, K, V>() -> Self
    where
        C: Default + Extend<(K, V)> + Any,
        K: XmlType,
        V: XmlType,
        for<'a> &'a C: IntoIterator<Item = (&'a K, &'a V)>,
    {
        Self {
            create: || Box::new(C::default()),
            len: |value| value.downcast_ref::<C>().map_or(0, |c| c.into_iter().count()),
            ops: CollectionOps::Dictionary {
                key: TypeHandle::of::<K>(),
                value: TypeHandle::of::<V>(),
                for_each: |value, f| {
                    let Some(entries) = value.downcast_ref::<C>() else {
                        return Err(mismatch::<C>());
                    };
                    for (key, value) in entries {
                        f(key, value)?;
                    }
                    Ok(())
                },
                insert: |target, key, value| {
                    let Some(entries) = target.downcast_mut::<C>() else {
                        return Err(mismatch::<C>());
                    };
                    let key = key.downcast::<K>().map_err(|_| mismatch::<K>())?;
                    let value = value.downcast::<V>().map_err(|_| mismatch::<V>())?;
                    entries.extend(core::iter::once((*key, *value)));
                    Ok(())
                },
            },
        }
    }

    /// A new, empty collection.
    #[inline]
    pub fn create(&self) -> Box<dyn Any> {
        (self.create)()
    }

    #[inline]
    pub fn len(&self, value: &dyn Any) -> usize {
        (self.len)(value)
    }

    #[inline]
    pub fn ops(&self) -> &CollectionOps {
        &self.ops
    }

    #[inline]
    pub fn is_dictionary(&self) -> bool {
        matches!(self.ops, CollectionOps::Dictionary { .. })
    }

    /// Appends to a sequence. Dictionaries refuse single items.
    pub fn push(&self, target: &mut dyn Any, item: Box<dyn Any>) -> Result<(), Box<dyn Any>> {
        match self.ops {
            CollectionOps::Sequence { push, .. } => push(target, item),
            CollectionOps::Dictionary { .. } => Err(item),
        }
    }
}

fn mismatch<T>() -> XmlError {
    XmlError::invalid_type(type_name::<T>(), "a value of another type")
}

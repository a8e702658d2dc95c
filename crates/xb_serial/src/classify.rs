use core::any::TypeId;

use xb_utils::TypeIdMap;

use crate::ScalarTable;
use crate::meta::{TypeMeta, TypeTraitCollection, TypeTraitText};
use crate::surrogate::SurrogateRegistry;

// -----------------------------------------------------------------------------
// TypeKind

/// How values of a type are converted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Converted by the surrogate at this index.
    Surrogate(usize),
    /// A primitive from the scalar table.
    Scalar,
    /// Converted through [`XmlText`](crate::meta::XmlText).
    Text,
    /// A sequence or dictionary.
    Collection,
    /// Mapped member by member.
    Composite,
}

impl TypeKind {
    /// Leaves are written as a single text value.
    #[inline]
    pub fn is_leaf(self) -> bool {
        matches!(self, Self::Surrogate(_) | Self::Scalar | Self::Text)
    }
}

// -----------------------------------------------------------------------------
// Classifier

/// Decides the [`TypeKind`] of each type, caching the answers.
///
/// The checks run in a fixed order, the first match wins:
///
/// 1. A surrogate supports the type.
/// 2. The type is in the scalar table.
/// 3. The type is text convertible.
/// 4. The type is a collection.
/// 5. Anything else is composite.
///
/// Wrappers are not classified on their own, they take the kind of the
/// type they wrap through [`Classifier::alias`].
#[derive(Debug, Default)]
pub struct Classifier {
    cache: TypeIdMap<TypeKind>,
}

impl Classifier {
    #[inline]
    pub const fn new() -> Self {
        Self {
            cache: TypeIdMap::new(),
        }
    }

    /// The cached answer for `type_id`.
    #[inline]
    pub fn get(&self, type_id: &TypeId) -> Option<TypeKind> {
        self.cache.get(type_id).copied()
    }

    pub fn classify(
        &mut self,
        meta: &TypeMeta,
        scalars: &ScalarTable,
        surrogates: &SurrogateRegistry,
    ) -> TypeKind {
        *self.cache.get_or_insert(meta.type_id(), || {
            if let Some(index) = surrogates.find(meta) {
                TypeKind::Surrogate(index)
            } else if scalars.contains(&meta.type_id()) {
                TypeKind::Scalar
            } else if meta.has_trait::<TypeTraitText>() {
                TypeKind::Text
            } else if meta.has_trait::<TypeTraitCollection>() {
                TypeKind::Collection
            } else {
                TypeKind::Composite
            }
        })
    }

    /// Records that `wrapper` converts like a type of `kind`.
    #[inline]
    pub fn alias(&mut self, wrapper: TypeId, kind: TypeKind) {
        self.cache.insert(wrapper, kind);
    }
}

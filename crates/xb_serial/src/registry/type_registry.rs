use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use core::any::{Any, TypeId};

use xb_utils::TypeIdMap;

use crate::meta::{TypeTraitPolymorphic, TypeTraitText, TypeTraitWrapper};
use crate::registry::TypeDescriptor;
use crate::surrogate::SurrogateRegistry;
use crate::{ScalarTable, Scope, TypeKind, XmlError, type_of};

// -----------------------------------------------------------------------------
// TypeRegistry

/// The registered types, their global names and the leaf converters.
///
/// Built by [`XSerializerBuilder`](crate::XSerializerBuilder) and read-only
/// afterwards, so one registry can serve any number of sessions, including
/// concurrent ones.
pub struct TypeRegistry {
    pub(crate) descriptors: TypeIdMap<TypeDescriptor>,
    pub(crate) global: Scope,
    pub(crate) scalars: ScalarTable,
    pub(crate) surrogates: SurrogateRegistry,
    pub(crate) root: Option<TypeId>,
}

impl TypeRegistry {
    pub(crate) fn new(scalars: ScalarTable, surrogates: SurrogateRegistry) -> Self {
        Self {
            descriptors: TypeIdMap::new(),
            global: Scope::new("global"),
            scalars,
            surrogates,
            root: None,
        }
    }

    #[inline]
    pub fn get(&self, type_id: &TypeId) -> Option<&TypeDescriptor> {
        self.descriptors.get(type_id)
    }

    #[inline]
    pub fn get_type<T: Any>(&self) -> Option<&TypeDescriptor> {
        self.descriptors.get_type::<T>()
    }

    #[inline]
    pub fn contains(&self, type_id: &TypeId) -> bool {
        self.descriptors.contains(type_id)
    }

    /// [`get`](Self::get) failing with [`XmlError::UnregisteredType`].
    pub fn descriptor(&self, type_id: &TypeId) -> Result<&TypeDescriptor, XmlError> {
        self.descriptors
            .get(type_id)
            .ok_or_else(|| XmlError::UnregisteredType(format!("{type_id:?}")))
    }

    #[inline]
    pub fn global_scope(&self) -> &Scope {
        &self.global
    }

    #[inline]
    pub fn scalars(&self) -> &ScalarTable {
        &self.scalars
    }

    #[inline]
    pub fn surrogates(&self) -> &SurrogateRegistry {
        &self.surrogates
    }

    #[inline]
    pub fn root(&self) -> Option<TypeId> {
        self.root
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.descriptors.values()
    }

    /// A readable name for `type_id`, for messages.
    pub(crate) fn type_path(&self, type_id: &TypeId) -> String {
        match self.descriptors.get(type_id) {
            Some(desc) => desc.type_path().to_string(),
            None => format!("{type_id:?}"),
        }
    }

    /// The type left after peeling all wrappers off `type_id`.
    pub fn core_of(&self, type_id: TypeId) -> TypeId {
        let mut current = type_id;
        while let Some(wrapper) = self
            .descriptors
            .get(&current)
            .and_then(|d| d.meta.get_trait::<TypeTraitWrapper>())
        {
            current = wrapper.inner().type_id();
        }
        current
    }

    // -------------------------------------------------------------------------
    // Leaves

    /// Renders a leaf value.
    pub fn leaf_to_text(&self, value: &dyn Any) -> Result<String, XmlError> {
        let id = type_of(value);
        let desc = self.descriptor(&id)?;
        let mismatch = || XmlError::invalid_type(desc.type_path(), "a value of another type");
        match desc.kind {
            TypeKind::Surrogate(index) => {
                let surrogate = self.surrogate(index)?;
                surrogate.serialize(value, &desc.meta)
            }
            TypeKind::Scalar => self
                .scalars
                .get(&id)
                .and_then(|entry| entry.codec().to_text(value))
                .ok_or_else(mismatch),
            TypeKind::Text => desc
                .meta
                .get_trait::<TypeTraitText>()
                .and_then(|codec| codec.to_text(value))
                .ok_or_else(mismatch),
            TypeKind::Collection | TypeKind::Composite => Err(XmlError::NotSupported(format!(
                "`{}` is not a leaf",
                desc.type_path()
            ))),
        }
    }

    /// Parses a leaf value of type `type_id`.
    pub fn leaf_from_text(&self, type_id: TypeId, text: &str) -> Result<Box<dyn Any>, XmlError> {
        let desc = self.descriptor(&type_id)?;
        let path = desc.type_path();
        match desc.kind {
            TypeKind::Surrogate(index) => self.surrogate(index)?.deserialize(text, &desc.meta),
            TypeKind::Scalar => {
                let entry = self
                    .scalars
                    .get(&type_id)
                    .ok_or_else(|| XmlError::UnregisteredType(path.to_string()))?;
                entry
                    .codec()
                    .from_text(text)
                    .map_err(|reason| XmlError::invalid_text(path, text, reason))
            }
            TypeKind::Text => {
                let codec = desc
                    .meta
                    .get_trait::<TypeTraitText>()
                    .ok_or(XmlError::UnsupportedType(path))?;
                codec
                    .from_text(text)
                    .map_err(|reason| XmlError::invalid_text(path, text, reason))
            }
            TypeKind::Collection | TypeKind::Composite => {
                Err(XmlError::NotSupported(format!("`{path}` is not a leaf")))
            }
        }
    }

    fn surrogate(&self, index: usize) -> Result<&dyn crate::Surrogate, XmlError> {
        self.surrogates
            .get(index)
            .ok_or_else(|| XmlError::invalid_operation(format!("no surrogate at index {index}")))
    }

    // -------------------------------------------------------------------------
    // Coercion

    /// Converts a freshly built value into the declared storage type, by
    /// wrapping it or by placing it into a polymorphic slot.
    pub fn coerce(&self, value: Box<dyn Any>, storage: TypeId) -> Result<Box<dyn Any>, XmlError> {
        let found = type_of(&*value);
        if found == storage {
            return Ok(value);
        }
        let desc = self.descriptor(&storage)?;
        if let Some(wrapper) = desc.meta.get_trait::<TypeTraitWrapper>() {
            let inner = self.coerce(value, wrapper.inner().type_id())?;
            return wrapper
                .wrap(inner)
                .map_err(|v| XmlError::invalid_type(desc.type_path(), self.type_path(&type_of(&*v))));
        }
        if let Some(slot) = desc.meta.get_trait::<TypeTraitPolymorphic>() {
            return slot
                .upcast(value)
                .map_err(|v| XmlError::invalid_type(desc.type_path(), self.type_path(&type_of(&*v))));
        }
        Err(XmlError::invalid_type(desc.type_path(), self.type_path(&found)))
    }

    /// Whether [`coerce`](Self::coerce) accepts values of `from` for `storage`.
    pub fn can_coerce(&self, from: TypeId, storage: TypeId) -> bool {
        if from == storage {
            return true;
        }
        let Some(desc) = self.descriptors.get(&storage) else {
            return false;
        };
        if let Some(wrapper) = desc.meta.get_trait::<TypeTraitWrapper>() {
            return self.can_coerce(from, wrapper.inner().type_id());
        }
        desc.meta
            .get_trait::<TypeTraitPolymorphic>()
            .is_some_and(|slot| slot.variant(from).is_some())
    }
}

impl core::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.descriptors.len())
            .field("global", &self.global)
            .field("surrogates", &self.surrogates)
            .field("root", &self.root.map(|id| self.type_path(&id)))
            .finish()
    }
}

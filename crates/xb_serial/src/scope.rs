use alloc::string::{String, ToString};
use core::any::TypeId;
use core::fmt::{Debug, Formatter};

use xb_tree::XName;
use xb_utils::TypeIdMap;
use xb_utils::hash::HashMap;

use crate::XmlError;

// -----------------------------------------------------------------------------
// Scope

/// A two-way mapping between types and XML names.
///
/// Within one scope a type has at most one name and a name denotes at most
/// one type. The global scope names every registered type; collection
/// members with declared items get a local scope of their own.
///
/// # Examples
///
/// ```
/// use core::any::TypeId;
/// use xb_serial::{Scope, XmlError};
/// use xb_tree::XName;
///
/// let mut scope = Scope::new("shapes");
/// scope.register(TypeId::of::<u8>(), "u8", XName::local("small")).unwrap();
///
/// assert_eq!(scope.resolve_type(&XName::local("small")), Some(TypeId::of::<u8>()));
/// assert_eq!(scope.resolve_name(&TypeId::of::<u8>()), Some(&XName::local("small")));
///
/// let clash = scope.register(TypeId::of::<u16>(), "u16", XName::local("small"));
/// assert!(matches!(clash, Err(XmlError::DuplicateName { .. })));
/// ```
#[derive(Clone)]
pub struct Scope {
    label: String,
    names: TypeIdMap<XName>,
    types: HashMap<XName, TypeId>,
}

impl Scope {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            names: TypeIdMap::new(),
            types: HashMap::default(),
        }
    }

    /// A description of the scope used in error messages.
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Binds `type_id` to `name`.
    ///
    /// Binding the same pair twice is a no-op. Binding either side to
    /// something else fails with [`XmlError::DuplicateName`].
    pub fn register(
        &mut self,
        type_id: TypeId,
        type_path: &'static str,
        name: XName,
    ) -> Result<(), XmlError> {
        match (self.names.get(&type_id), self.types.get(&name)) {
            (Some(bound), Some(owner)) if bound == &name && owner == &type_id => return Ok(()),
            (Some(bound), _) => {
                return Err(XmlError::DuplicateName {
                    scope: self.label.clone(),
                    reason: alloc::format!("the type is already named `{bound}`"),
                    name,
                    type_path,
                });
            }
            (None, Some(_)) => {
                return Err(XmlError::DuplicateName {
                    scope: self.label.clone(),
                    reason: "the name is taken by another type".to_string(),
                    name,
                    type_path,
                });
            }
            (None, None) => {}
        }
        self.names.insert(type_id, name.clone());
        self.types.insert(name, type_id);
        Ok(())
    }

    #[inline]
    pub fn resolve_name(&self, type_id: &TypeId) -> Option<&XName> {
        self.names.get(type_id)
    }

    #[inline]
    pub fn resolve_type(&self, name: &XName) -> Option<TypeId> {
        self.types.get(name).copied()
    }

    /// [`resolve_name`](Self::resolve_name) failing with
    /// [`XmlError::UnregisteredType`].
    pub fn name_of(&self, type_id: &TypeId, type_path: &str) -> Result<&XName, XmlError> {
        self.resolve_name(type_id)
            .ok_or_else(|| XmlError::UnregisteredType(type_path.to_string()))
    }

    /// [`resolve_type`](Self::resolve_type) failing with
    /// [`XmlError::UnknownTypeName`].
    pub fn type_of(&self, name: &XName) -> Result<TypeId, XmlError> {
        self.resolve_type(name)
            .ok_or_else(|| XmlError::UnknownTypeName {
                name: name.clone(),
                scope: self.label.clone(),
            })
    }

    #[inline]
    pub fn contains_type(&self, type_id: &TypeId) -> bool {
        self.names.contains(type_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All `(name, type)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&XName, TypeId)> {
        self.types.iter().map(|(name, id)| (name, *id))
    }
}

impl Debug for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scope")
            .field("label", &self.label)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Scope;
    use crate::XmlError;
    use core::any::TypeId;
    use xb_tree::XName;

    #[test]
    fn bijection_is_enforced() {
        let mut scope = Scope::new("test");
        let a = TypeId::of::<u8>();
        let b = TypeId::of::<u16>();
        scope.register(a, "u8", XName::local("a")).unwrap();
        scope.register(a, "u8", XName::local("a")).unwrap();
        assert_eq!(scope.len(), 1);

        let renamed = scope.register(a, "u8", XName::local("other"));
        assert!(matches!(renamed, Err(XmlError::DuplicateName { .. })));
        let taken = scope.register(b, "u16", XName::local("a"));
        assert!(matches!(taken, Err(XmlError::DuplicateName { .. })));

        // Names in different namespaces are different names.
        scope.register(b, "u16", XName::new("urn:x", "a")).unwrap();
        assert_eq!(scope.resolve_type(&XName::new("urn:x", "a")), Some(b));
    }

    #[test]
    fn strict_lookups() {
        let scope = Scope::new("empty");
        assert!(matches!(
            scope.name_of(&TypeId::of::<u8>(), "u8"),
            Err(XmlError::UnregisteredType(_))
        ));
        assert!(matches!(
            scope.type_of(&XName::local("x")),
            Err(XmlError::UnknownTypeName { .. })
        ));
    }
}

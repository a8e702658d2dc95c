//! Per call state of a conversion.
//!
//! A [`Session`] walks one object graph or one document. It tracks the
//! values currently being written to reject cycles, the namespace bindings
//! in scope, and with the `debug` feature the chain of types being
//! processed, which is attached to errors leaving the session.
//!
//! Sessions are created by [`XSerializer`](crate::XSerializer) and used once.

// -----------------------------------------------------------------------------
// Modules

mod de;
mod namespaces;
mod ser;

// -----------------------------------------------------------------------------
// Session

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::{Any, TypeId};

use xb_tree::{Element, XName};

use crate::registry::{Slot, TypeRegistry};
use crate::{Context, Scope, XmlError, type_of};

pub(crate) use namespaces::type_marker;

use namespaces::Namespaces;

/// The state of one serialization or deserialization call.
///
/// # Examples
///
/// ```
/// use xb_serial::{Context, Member, Session, TypeMeta, XSerializer, XmlError, XmlType};
///
/// #[derive(Default)]
/// struct Label {
///     text: String,
/// }
///
/// impl XmlType for Label {
///     fn type_meta() -> TypeMeta {
///         TypeMeta::composite::<Self>()
///             .default_constructor()
///             .member(Member::new("Text", |l: &Label| &l.text, |l| &mut l.text).attribute())
///             .build()
///     }
/// }
///
/// let serializer = XSerializer::new::<Label>()?;
/// let mut session = Session::new(serializer.registry(), Context::none());
/// let element = session.serialize_root(&Label { text: "hi".into() })?;
/// assert_eq!(element.attribute(&"Text".into()), Some("hi"));
/// # Ok::<(), XmlError>(())
/// ```
pub struct Session<'r, 'c> {
    registry: &'r TypeRegistry,
    context: Context<'c>,
    references: Vec<(usize, TypeId)>,
    namespaces: Namespaces,
    #[cfg(all(debug_assertions, feature = "debug"))]
    trail: Vec<&'static str>,
}

impl<'r, 'c> Session<'r, 'c> {
    pub fn new(registry: &'r TypeRegistry, context: Context<'c>) -> Self {
        Self::with_bindings(registry, context, Vec::new())
    }

    /// A session declaring `bindings` on the root element it writes.
    pub fn with_bindings(
        registry: &'r TypeRegistry,
        context: Context<'c>,
        bindings: Vec<(String, String)>,
    ) -> Self {
        Self {
            registry,
            context,
            references: Vec::new(),
            namespaces: Namespaces::new(bindings),
            #[cfg(all(debug_assertions, feature = "debug"))]
            trail: Vec::new(),
        }
    }

    #[inline]
    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    #[inline]
    pub fn context(&self) -> &Context<'c> {
        &self.context
    }

    // -------------------------------------------------------------------------
    // Root

    fn root(&self) -> Result<(TypeId, &'r XName), XmlError> {
        let registry = self.registry;
        let root = registry
            .root()
            .ok_or_else(|| XmlError::invalid_operation("no root type registered"))?;
        let desc = registry.descriptor(&root)?;
        let name = desc
            .name()
            .ok_or_else(|| XmlError::UnregisteredType(desc.type_path().into()))?;
        Ok((root, name))
    }

    /// Writes `value`, which must be of the root type.
    pub fn serialize_root(&mut self, value: &dyn Any) -> Result<Element, XmlError> {
        let (root, name) = self.root()?;
        let found = type_of(value);
        if found != root {
            return Err(XmlError::invalid_type(
                self.registry.type_path(&root),
                self.registry.type_path(&found),
            ));
        }
        let slot = Slot {
            storage: root,
            core: self.registry.core_of(root),
        };
        self.write_value(value, slot, name, None)?
            .ok_or_else(|| XmlError::NotSupported("the root value is empty".into()))
    }

    /// Reads a fresh value of the root type.
    pub fn deserialize_root(&mut self, element: &Element) -> Result<Box<dyn Any>, XmlError> {
        let (root, name) = self.root()?;
        check_root_name(element, name)?;
        let slot = Slot {
            storage: root,
            core: self.registry.core_of(root),
        };
        self.read_value(element, slot, None)
    }

    /// Fills `target`, which must be of the root type, in place.
    pub fn deserialize_root_into(&mut self, element: &Element, target: &mut dyn Any) -> Result<(), XmlError> {
        let (root, name) = self.root()?;
        let found = type_of(&*target);
        if found != root {
            return Err(XmlError::invalid_type(
                self.registry.type_path(&root),
                self.registry.type_path(&found),
            ));
        }
        check_root_name(element, name)?;
        let filled = self.within(element, |session| session.fill(element, target, None))?;
        if filled {
            Ok(())
        } else {
            Err(XmlError::NotSupported("the root value is empty".into()))
        }
    }

    // -------------------------------------------------------------------------
    // Bookkeeping

    /// Runs `f` with `value` on the reference stack.
    fn guarded<R>(
        &mut self,
        value: &dyn Any,
        type_path: &'static str,
        f: impl FnOnce(&mut Self) -> Result<R, XmlError>,
    ) -> Result<R, XmlError> {
        let key = (value as *const dyn Any as *const () as usize, type_of(value));
        if self.references.contains(&key) {
            return Err(XmlError::CircularReference(type_path));
        }
        self.references.push(key);
        let result = f(self);
        self.references.pop();
        result
    }

    /// Runs `f` while `type_path` is being processed.
    #[cfg(all(debug_assertions, feature = "debug"))]
    fn scoped<R>(
        &mut self,
        type_path: &'static str,
        f: impl FnOnce(&mut Self) -> Result<R, XmlError>,
    ) -> Result<R, XmlError> {
        self.trail.push(type_path);
        let result = f(self).map_err(|err| match err {
            traced @ XmlError::Traced { .. } => traced,
            err => XmlError::Traced {
                source: Box::new(err),
                trail: crate::TypeTrail(self.trail.clone()),
            },
        });
        self.trail.pop();
        result
    }

    #[cfg(not(all(debug_assertions, feature = "debug")))]
    #[inline(always)]
    fn scoped<R>(
        &mut self,
        type_path: &'static str,
        f: impl FnOnce(&mut Self) -> Result<R, XmlError>,
    ) -> Result<R, XmlError> {
        let _ = type_path;
        f(self)
    }

    /// The type an item called `name` is read as, when it carries no marker.
    ///
    /// The local scope is searched before the global one. A name bound in
    /// neither is [`XmlError::UnknownTypeName`], a type that cannot be stored
    /// in `slot` is [`XmlError::InvalidType`].
    fn item_type(&self, name: &XName, slot: Slot, scope: Option<&Scope>) -> Result<TypeId, XmlError> {
        let registry = self.registry;
        let found = match scope.and_then(|s| s.resolve_type(name)) {
            Some(found) => found,
            None => registry.global_scope().type_of(name)?,
        };
        if registry.can_coerce(found, slot.storage) {
            Ok(found)
        } else {
            Err(XmlError::invalid_type(
                registry.type_path(&slot.storage),
                registry.type_path(&found),
            ))
        }
    }
}

fn check_root_name(element: &Element, expected: &XName) -> Result<(), XmlError> {
    if element.name() == expected {
        Ok(())
    } else {
        Err(XmlError::invalid_type(
            alloc::format!("element `{expected}`"),
            alloc::format!("element `{}`", element.name()),
        ))
    }
}

impl core::fmt::Debug for Session<'_, '_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("context", &self.context)
            .field("depth", &self.references.len())
            .finish_non_exhaustive()
    }
}

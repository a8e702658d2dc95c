use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;

use xb_tree::{Element, WriteOptions, ns};

use crate::meta::XmlType;
use crate::registry::{TypeRegistry, XSerializerBuilder};
use crate::{Context, Session, XmlError, type_of};

// -----------------------------------------------------------------------------
// NamespaceBindings

/// A prefix bound to a namespace on the root element.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamespaceBinding {
    pub prefix: String,
    pub namespace: String,
}

/// Prefixes declared on the root element of written documents.
///
/// The default binds `xsi` and `xsd`, so type overrides and scalar type
/// names come out with their customary prefixes.
///
/// # Examples
///
/// ```
/// use xb_serial::NamespaceBindings;
///
/// let mut bindings = NamespaceBindings::default();
/// bindings.bind("s", "urn:shapes");
///
/// assert_eq!(bindings.namespace_of("s"), Some("urn:shapes"));
/// assert_eq!(bindings.namespace_of("xsi"), Some("http://www.w3.org/2001/XMLSchema-instance"));
/// assert_eq!(NamespaceBindings::empty().len(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct NamespaceBindings {
    bindings: Vec<NamespaceBinding>,
}

impl Default for NamespaceBindings {
    fn default() -> Self {
        let mut bindings = Self::empty();
        bindings.bind("xsi", ns::XSI).bind("xsd", ns::XSD);
        bindings
    }
}

impl NamespaceBindings {
    #[inline]
    pub const fn empty() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Binds `prefix`, replacing an earlier binding of the same prefix.
    pub fn bind(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) -> &mut Self {
        let prefix = prefix.into();
        let namespace = namespace.into();
        match self.bindings.iter_mut().find(|b| b.prefix == prefix) {
            Some(binding) => binding.namespace = namespace,
            None => self.bindings.push(NamespaceBinding { prefix, namespace }),
        }
        self
    }

    pub fn namespace_of(&self, prefix: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.prefix == prefix)
            .map(|b| b.namespace.as_str())
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &NamespaceBinding> {
        self.bindings.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn to_pairs(&self) -> Vec<(String, String)> {
        self.bindings
            .iter()
            .map(|b| (b.prefix.clone(), b.namespace.clone()))
            .collect()
    }
}

// -----------------------------------------------------------------------------
// SerializerOptions

/// How [`XSerializer::to_string`] renders documents.
///
/// With the `serde` feature the options can be loaded from configuration,
/// missing fields take their default.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SerializerOptions {
    pub namespaces: NamespaceBindings,
    /// Render everything on one line.
    pub compact: bool,
    /// Indentation width when not compact.
    pub indent: usize,
    /// Emit the XML declaration.
    pub declaration: bool,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            namespaces: NamespaceBindings::default(),
            compact: false,
            indent: 2,
            declaration: false,
        }
    }
}

impl SerializerOptions {
    /// Single line output with the default bindings.
    pub fn compact() -> Self {
        Self {
            compact: true,
            ..Self::default()
        }
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            indent: (!self.compact).then_some(self.indent),
            declaration: self.declaration,
        }
    }
}

// -----------------------------------------------------------------------------
// XSerializer

/// Converts values of a registered root type to and from XML.
///
/// An `XSerializer` is immutable and `Send + Sync`; every call runs its own
/// [`Session`], so one instance can be shared between threads.
///
/// Conversions recurse once per nesting level of the data, so the depth of
/// a document is bounded by the stack of the calling thread.
///
/// # Examples
///
/// ```
/// use xb_serial::{Context, Member, SerializerOptions, TypeMeta, XSerializer, XmlError, XmlType};
///
/// #[derive(Default, Debug, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl XmlType for Point {
///     fn type_meta() -> TypeMeta {
///         TypeMeta::composite::<Self>()
///             .default_constructor()
///             .member(Member::new("X", |p: &Point| &p.x, |p| &mut p.x).attribute())
///             .member(Member::new("Y", |p: &Point| &p.y, |p| &mut p.y).attribute())
///             .build()
///     }
/// }
///
/// let serializer = XSerializer::new::<Point>()?;
/// let options = SerializerOptions::compact();
/// let text = serializer.to_string(&Point { x: 1, y: 2 }, &Context::none(), &options)?;
/// assert!(text.starts_with("<Point "));
/// assert!(text.ends_with(r#" X="1" Y="2"/>"#));
///
/// let back: Point = serializer.from_str(&text, &Context::none())?;
/// assert_eq!(back, Point { x: 1, y: 2 });
/// # Ok::<(), XmlError>(())
/// ```
pub struct XSerializer {
    registry: TypeRegistry,
}

impl XSerializer {
    #[inline]
    pub fn builder() -> XSerializerBuilder {
        XSerializerBuilder::new()
    }

    /// A serializer for root type `T` with the default tables.
    pub fn new<T: XmlType>() -> Result<Self, XmlError> {
        let mut builder = XSerializerBuilder::new();
        builder.register_root_type::<T>()?;
        builder.build()
    }

    #[inline]
    pub(crate) fn from_registry(registry: TypeRegistry) -> Self {
        Self { registry }
    }

    #[inline]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    // -------------------------------------------------------------------------
    // Serialize

    /// Writes `value` as an element tree, declaring `bindings` on the root.
    #[inline]
    pub fn serialize<T: Any>(
        &self,
        value: &T,
        context: &Context<'_>,
        bindings: &NamespaceBindings,
    ) -> Result<Element, XmlError> {
        self.serialize_any(value, context, bindings)
    }

    pub fn serialize_any(
        &self,
        value: &dyn Any,
        context: &Context<'_>,
        bindings: &NamespaceBindings,
    ) -> Result<Element, XmlError> {
        Session::with_bindings(&self.registry, *context, bindings.to_pairs()).serialize_root(value)
    }

    /// Writes `value` as text.
    pub fn to_string<T: Any>(
        &self,
        value: &T,
        context: &Context<'_>,
        options: &SerializerOptions,
    ) -> Result<String, XmlError> {
        let element = self.serialize(value, context, &options.namespaces)?;
        Ok(xb_tree::write_with(&element, options.write_options())?)
    }

    // -------------------------------------------------------------------------
    // Deserialize

    /// Reads a fresh value of the root type `T`.
    pub fn deserialize<T: Any>(&self, element: &Element, context: &Context<'_>) -> Result<T, XmlError> {
        let value = self.deserialize_any(element, context)?;
        match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(XmlError::invalid_type(
                core::any::type_name::<T>(),
                self.registry.type_path(&type_of(&*value)),
            )),
        }
    }

    pub fn deserialize_any(&self, element: &Element, context: &Context<'_>) -> Result<Box<dyn Any>, XmlError> {
        Session::new(&self.registry, *context).deserialize_root(element)
    }

    /// Fills an existing root value in place.
    ///
    /// Collections reached in place keep their items and get the new ones
    /// appended.
    #[inline]
    pub fn deserialize_into<T: Any>(
        &self,
        element: &Element,
        context: &Context<'_>,
        target: &mut T,
    ) -> Result<(), XmlError> {
        self.deserialize_any_into(element, context, target)
    }

    pub fn deserialize_any_into(
        &self,
        element: &Element,
        context: &Context<'_>,
        target: &mut dyn Any,
    ) -> Result<(), XmlError> {
        Session::new(&self.registry, *context).deserialize_root_into(element, target)
    }

    /// Parses `text` and reads a fresh value of the root type `T`.
    pub fn from_str<T: Any>(&self, text: &str, context: &Context<'_>) -> Result<T, XmlError> {
        let element = xb_tree::parse(text)?;
        self.deserialize(&element, context)
    }
}

impl core::fmt::Debug for XSerializer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("XSerializer")
            .field("registry", &self.registry)
            .finish()
    }
}

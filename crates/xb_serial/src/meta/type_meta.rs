use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use core::fmt::{Debug, Display, Formatter};
use core::ops::Deref;
use core::str::FromStr;

use bitflags::bitflags;
use xb_tree::XName;
use xb_utils::TypeIdMap;

use crate::meta::callback::Callbacks;
use crate::meta::{
    CompositeBuilder, FromType, MemberMeta, PolymorphicBuilder, TypeHandle, TypeTrait,
    TypeTraitEnum, TypeTraitExternal, TypeTraitText, XmlEnum, XmlText,
};

bitflags! {
    /// Type level switches.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TypeFlags: u8 {
        /// Instances are plain values: they are never checked for cycles
        /// and cannot be filled in place.
        const VALUE_TYPE = 1 << 0;
        /// Members marked private are mapped too.
        const INCLUDE_PRIVATE = 1 << 1;
    }
}

pub(crate) type Constructor = Arc<dyn Fn() -> Box<dyn Any> + Send + Sync>;

// -----------------------------------------------------------------------------
// TypeMeta

/// Everything the serializer knows about one type.
///
/// Holds the XML name overrides, type flags, the declared members and
/// lifecycle callbacks of composite types, and a capability table.
///
/// Built by the constructors below and returned from
/// [`XmlType::type_meta`](crate::XmlType::type_meta):
///
/// - [`composite`](Self::composite): a type mapped member by member.
/// - [`text`](Self::text): a leaf converted through [`XmlText`].
/// - [`external`](Self::external): a foreign leaf converted through
///   `Display`/`FromStr` by the value surrogate.
/// - [`enumeration`](Self::enumeration): an [`XmlEnum`].
/// - [`polymorphic`](Self::polymorphic): a slot for several concrete types.
/// - [`opaque`](Self::opaque): nothing but the identity, capabilities are
///   added with [`insert_trait`](Self::insert_trait).
pub struct TypeMeta {
    type_id: TypeId,
    type_path: &'static str,
    name: Option<String>,
    namespace: Option<String>,
    flags: TypeFlags,
    pub(crate) includes: Vec<TypeHandle>,
    pub(crate) members: Vec<MemberMeta>,
    pub(crate) callbacks: Callbacks,
    pub(crate) constructor: Option<Constructor>,
    trait_table: TypeIdMap<Box<dyn TypeTrait>>,
}

impl TypeMeta {
    /// A metadata without members or capabilities.
    pub fn opaque<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_path: core::any::type_name::<T>(),
            name: None,
            namespace: None,
            flags: TypeFlags::empty(),
            includes: Vec::new(),
            members: Vec::new(),
            callbacks: Callbacks::default(),
            constructor: None,
            trait_table: TypeIdMap::new(),
        }
    }

    /// Starts describing a composite type.
    #[inline]
    pub fn composite<T: Any>() -> CompositeBuilder<T> {
        CompositeBuilder::new(Self::opaque::<T>())
    }

    /// A text convertible leaf.
    pub fn text<T: XmlText + Any>() -> Self {
        let mut meta = Self::opaque::<T>();
        meta.insert_trait::<TypeTraitText>(FromType::<T>::from_type());
        meta
    }

    /// A leaf converted by the built-in value surrogate.
    pub fn external<T>() -> Self
    where
        T: Display + FromStr + Any,
        T::Err: Display,
    {
        let mut meta = Self::opaque::<T>();
        meta.insert_trait::<TypeTraitExternal>(FromType::<T>::from_type());
        meta
    }

    /// An enumeration converted by the built-in enum surrogate.
    pub fn enumeration<T: XmlEnum>() -> Self {
        let mut meta = Self::opaque::<T>();
        meta.insert_trait::<TypeTraitEnum>(FromType::<T>::from_type());
        meta
    }

    /// Starts describing a polymorphic slot.
    ///
    /// `view` and `view_mut` expose the concrete value held by the slot.
    #[inline]
    pub fn polymorphic<P: Any>(
        view: fn(&P) -> &dyn Any,
        view_mut: fn(&mut P) -> &mut dyn Any,
    ) -> PolymorphicBuilder<P> {
        PolymorphicBuilder::new(Self::opaque::<P>(), view, view_mut)
    }

    /// Overrides the XML local name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the XML namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_flags(mut self, flags: TypeFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.type_path
    }

    /// The explicit local name, if any.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The XML name of the type: the explicit name, or one derived from the
    /// type path, in the explicit namespace or none.
    ///
    /// ```
    /// use xb_serial::meta::TypeMeta;
    ///
    /// let meta = TypeMeta::opaque::<Vec<Option<String>>>();
    /// assert_eq!(meta.xml_name().local_name(), "VecOfOptionOfString");
    /// ```
    pub fn xml_name(&self) -> XName {
        let local = match &self.name {
            Some(name) => name.clone(),
            None => default_name(self.type_path),
        };
        XName::new(self.namespace.clone().unwrap_or_default(), local)
    }

    #[inline]
    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    #[inline]
    pub(crate) fn flags_mut(&mut self) -> &mut TypeFlags {
        &mut self.flags
    }

    #[inline]
    pub(crate) fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    #[inline]
    pub(crate) fn set_namespace(&mut self, namespace: String) {
        self.namespace = Some(namespace);
    }

    #[inline]
    pub fn is_value_type(&self) -> bool {
        self.flags.contains(TypeFlags::VALUE_TYPE)
    }

    /// Types registered along with this one.
    #[inline]
    pub fn includes(&self) -> &[TypeHandle] {
        &self.includes
    }

    /// Declared members, including flattened ones.
    #[inline]
    pub fn members(&self) -> &[MemberMeta] {
        &self.members
    }

    /// Returns `true` if new instances can be created.
    #[inline]
    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    /// A new instance, `None` when the type declares no constructor.
    pub fn construct(&self) -> Option<Box<dyn Any>> {
        self.constructor.as_ref().map(|f| f())
    }

    /// Number of lifecycle callbacks.
    #[inline]
    pub fn callback_len(&self) -> usize {
        self.callbacks.len()
    }

    // -------------------------------------------------------------------------
    // Capabilities

    /// Inserts a capability, replacing one of the same type.
    #[inline]
    pub fn insert_trait<T: TypeTrait>(&mut self, data: T) {
        self.trait_table.insert(TypeId::of::<T>(), Box::new(data));
    }

    #[inline]
    pub fn get_trait<T: TypeTrait>(&self) -> Option<&T> {
        self.trait_table
            .get(&TypeId::of::<T>())
            .and_then(|t| <dyn TypeTrait>::downcast_ref(t.deref()))
    }

    #[inline]
    pub fn has_trait<T: TypeTrait>(&self) -> bool {
        self.trait_table.contains(&TypeId::of::<T>())
    }

    #[inline]
    pub fn trait_len(&self) -> usize {
        self.trait_table.len()
    }
}

impl Debug for TypeMeta {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypeMeta")
            .field("type_path", &self.type_path)
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("flags", &self.flags)
            .field("members", &self.members)
            .field("traits", &self.trait_table.len())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Default names

/// Derives an XML local name from a Rust type path.
///
/// Module paths are dropped and generic arguments are appended after `Of`,
/// so `alloc::vec::Vec<my::Shape>` becomes `VecOfShape`.
pub(crate) fn default_name(type_path: &str) -> String {
    let path = type_path.trim();
    let path = path.strip_prefix("dyn ").unwrap_or(path);
    match path.find('<') {
        None => sanitize(last_segment(path)),
        Some(open) => {
            let close = path.rfind('>').unwrap_or(path.len());
            let mut name = sanitize(last_segment(&path[..open]));
            name.push_str("Of");
            for arg in split_arguments(&path[open + 1..close.max(open + 1)]) {
                name.push_str(&default_name(arg));
            }
            name
        }
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Splits generic arguments on top level commas.
fn split_arguments(args: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0_i32;
    let mut start = 0;
    for (index, c) in args.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                out.push(args[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    let last = args[start..].trim();
    if !last.is_empty() {
        out.push(last);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{TypeMeta, default_name};
    use crate::meta::TypeTraitText;

    #[test]
    fn default_names() {
        assert_eq!(default_name("my::shapes::Circle"), "Circle");
        assert_eq!(default_name("alloc::vec::Vec<my::Shape>"), "VecOfShape");
        assert_eq!(
            default_name("std::collections::hash::map::HashMap<alloc::string::String, i32>"),
            "HashMapOfStringi32"
        );
        assert_eq!(default_name("alloc::boxed::Box<dyn my::Shape>"), "BoxOfShape");
        assert_eq!(default_name("(i32, i32)"), "i32i32");
    }

    #[test]
    fn explicit_names_win() {
        let meta = TypeMeta::opaque::<u8>().with_name("octet").with_namespace("urn:n");
        assert_eq!(meta.xml_name().to_string(), "{urn:n}octet");
        assert_eq!(TypeMeta::opaque::<u8>().xml_name().to_string(), "u8");
    }

    #[test]
    fn capability_table() {
        let mut meta = TypeMeta::opaque::<u8>();
        assert!(!meta.has_trait::<TypeTraitText>());
        meta.insert_trait(TypeTraitText::display::<u8>());
        let codec = meta.get_trait::<TypeTraitText>().unwrap();
        assert_eq!(codec.to_text(&7_u8).as_deref(), Some("7"));
        assert_eq!(meta.trait_len(), 1);
    }
}

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{Debug, Display, Formatter};

use crate::{Element, TreeError, ns};

// -----------------------------------------------------------------------------
// XName

/// A namespace-qualified XML name.
///
/// An empty namespace means "no namespace". Prefixes are not part of the
/// name: they are a property of the document and are resolved through
/// [`NamespaceStack`] when reading or writing text.
///
/// The [`Display`] form uses Clark notation, `{namespace}local`.
///
/// # Examples
///
/// ```
/// use xb_tree::XName;
///
/// let name = XName::new("urn:shapes", "circle");
/// assert_eq!(name.namespace(), "urn:shapes");
/// assert_eq!(name.local_name(), "circle");
/// assert_eq!(name.to_string(), "{urn:shapes}circle");
///
/// assert_eq!(XName::from("{urn:shapes}circle"), name);
/// assert_eq!(XName::from("radius"), XName::local("radius"));
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XName {
    namespace: String,
    local: String,
}

impl XName {
    /// Creates a name inside `namespace`.
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }

    /// Creates a name without namespace.
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: String::new(),
            local: local.into(),
        }
    }

    /// The attribute name declaring `prefix`.
    ///
    /// The empty prefix maps to the plain `xmlns` attribute.
    pub fn xmlns(prefix: &str) -> Self {
        if prefix.is_empty() {
            Self::local("xmlns")
        } else {
            Self::new(ns::XMLNS, prefix)
        }
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[inline]
    pub fn local_name(&self) -> &str {
        &self.local
    }

    #[inline]
    pub fn has_namespace(&self) -> bool {
        !self.namespace.is_empty()
    }

    /// Returns the declared prefix if this is an `xmlns` attribute name.
    pub fn declared_prefix(&self) -> Option<&str> {
        if self.namespace == ns::XMLNS {
            Some(&self.local)
        } else if self.namespace.is_empty() && self.local == "xmlns" {
            Some("")
        } else {
            None
        }
    }

    /// Returns `true` for `xmlns` and `xmlns:*` attribute names.
    #[inline]
    pub fn is_namespace_declaration(&self) -> bool {
        self.declared_prefix().is_some()
    }
}

impl Display for XName {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

impl Debug for XName {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "XName(\"{self}\")")
    }
}

impl From<&str> for XName {
    /// Parses Clark notation, anything else becomes a local name.
    fn from(value: &str) -> Self {
        if let Some(rest) = value.strip_prefix('{')
            && let Some((namespace, local)) = rest.split_once('}')
        {
            return Self::new(namespace, local);
        }
        Self::local(value)
    }
}

impl From<String> for XName {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&XName> for XName {
    fn from(value: &XName) -> Self {
        value.clone()
    }
}

// -----------------------------------------------------------------------------
// NamespaceStack

/// The prefix bindings in scope at some point of a tree walk.
///
/// Bindings are pushed when entering an element and dropped with
/// [`truncate`](Self::truncate) when leaving it. Inner bindings shadow
/// outer ones.
///
/// # Examples
///
/// ```
/// use xb_tree::{Element, NamespaceStack, XName};
///
/// let mut root = Element::new("root");
/// root.declare_namespace("s", "urn:shapes");
///
/// let mut stack = NamespaceStack::new();
/// let mark = stack.enter(&root);
///
/// assert_eq!(stack.resolve_qname("s:circle").unwrap(), XName::new("urn:shapes", "circle"));
/// assert_eq!(stack.prefix_of("urn:shapes", false), Some("s"));
///
/// stack.truncate(mark);
/// assert!(stack.resolve_qname("s:circle").is_err());
/// ```
#[derive(Clone, Default)]
pub struct NamespaceStack {
    bindings: Vec<(String, String)>,
}

impl NamespaceStack {
    #[inline]
    pub const fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Current depth, to be passed to [`truncate`](Self::truncate) later.
    #[inline]
    pub fn mark(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    pub fn truncate(&mut self, mark: usize) {
        self.bindings.truncate(mark);
    }

    /// Binds `prefix` to `namespace`. The empty prefix is the default namespace.
    pub fn bind(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.bindings.push((prefix.into(), namespace.into()));
    }

    /// Pushes the declarations carried by `element` and returns the mark
    /// taken before doing so.
    pub fn enter(&mut self, element: &Element) -> usize {
        let mark = self.mark();
        for attr in element.attributes() {
            if let Some(prefix) = attr.name.declared_prefix() {
                self.bind(prefix, attr.value.as_str());
            }
        }
        mark
    }

    /// The namespace bound to `prefix`, if any.
    ///
    /// An unbound or reset (`xmlns=""`) default namespace yields `Some("")`.
    pub fn namespace_of(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(ns::XML);
        }
        let found = self
            .bindings
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, n)| n.as_str());
        match found {
            None if prefix.is_empty() => Some(""),
            other => other,
        }
    }

    /// The default namespace in scope, empty when there is none.
    #[inline]
    pub fn default_namespace(&self) -> &str {
        self.namespace_of("").unwrap_or("")
    }

    /// Finds a prefix currently bound to `namespace`.
    ///
    /// A binding shadowed by a later declaration of the same prefix is
    /// skipped. The default namespace is only considered when
    /// `allow_default` is set, since it never applies to attributes.
    pub fn prefix_of(&self, namespace: &str, allow_default: bool) -> Option<&str> {
        if namespace == ns::XML {
            return Some("xml");
        }
        self.bindings
            .iter()
            .rev()
            .filter(|(p, n)| n == namespace && (allow_default || !p.is_empty()))
            .map(|(p, _)| p.as_str())
            .find(|p| self.namespace_of(p) == Some(namespace))
    }

    /// Returns `true` if `prefix` is bound in the current scope.
    pub fn is_bound(&self, prefix: &str) -> bool {
        self.bindings.iter().any(|(p, _)| p == prefix)
    }

    /// Resolves a `prefix:local` qualified name.
    ///
    /// A name without prefix resolves against the default namespace.
    pub fn resolve_qname(&self, qname: &str) -> Result<XName, TreeError> {
        let (prefix, local) = match qname.split_once(':') {
            Some((prefix, local)) => (prefix, local),
            None => ("", qname),
        };
        if local.is_empty() || local.contains(':') {
            return Err(TreeError::InvalidQName(qname.to_owned()));
        }
        match self.namespace_of(prefix) {
            Some(namespace) => Ok(XName::new(namespace, local)),
            None => Err(TreeError::UnboundPrefix(prefix.to_owned())),
        }
    }
}

impl Debug for NamespaceStack {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(self.bindings.iter().map(|(p, n)| (p, n)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{NamespaceStack, XName};
    use crate::ns;

    #[test]
    fn clark_notation() {
        let name = XName::from("{urn:a}b");
        assert_eq!(name.namespace(), "urn:a");
        assert_eq!(name.local_name(), "b");
        assert_eq!(XName::from("{broken"), XName::local("{broken"));
    }

    #[test]
    fn declaration_names() {
        assert_eq!(XName::xmlns("").declared_prefix(), Some(""));
        assert_eq!(XName::xmlns("p").declared_prefix(), Some("p"));
        assert_eq!(XName::new(ns::XMLNS, "p"), XName::xmlns("p"));
        assert!(!XName::local("p").is_namespace_declaration());
    }

    #[test]
    fn shadowed_prefix_is_skipped() {
        let mut stack = NamespaceStack::new();
        stack.bind("a", "urn:one");
        stack.bind("b", "urn:one");
        stack.bind("b", "urn:two");
        assert_eq!(stack.prefix_of("urn:one", false), Some("a"));
        assert_eq!(stack.prefix_of("urn:two", false), Some("b"));
    }

    #[test]
    fn default_namespace_resolution() {
        let mut stack = NamespaceStack::new();
        assert_eq!(stack.resolve_qname("x").unwrap(), XName::local("x"));
        stack.bind("", "urn:d");
        assert_eq!(stack.resolve_qname("x").unwrap(), XName::new("urn:d", "x"));
        assert_eq!(stack.prefix_of("urn:d", false), None);
        assert_eq!(stack.prefix_of("urn:d", true), Some(""));
        assert!(stack.resolve_qname("q:x").is_err());
        assert!(stack.resolve_qname("a:b:c").is_err());
    }
}

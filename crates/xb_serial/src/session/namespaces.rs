use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use xb_tree::{Element, NamespaceStack, TreeError, XName, ns};

/// The name of the type override attribute, `xsi:type`.
#[inline]
pub(crate) fn type_marker() -> XName {
    XName::new(ns::XSI, "type")
}

// -----------------------------------------------------------------------------
// Namespaces

/// Prefix bindings in scope while a session walks a tree.
///
/// When writing, every element gets the declarations it needs as soon as it
/// is opened, so the `xsi:type` values can be written as `prefix:local`
/// against bindings that are known to be in scope. Missing prefixes are
/// generated as `nssN`.
///
/// When reading, the stack follows the declarations of the document so
/// that `xsi:type` values resolve the way the document meant them.
#[derive(Debug, Default)]
pub(crate) struct Namespaces {
    stack: NamespaceStack,
    generated: usize,
    root: Vec<(String, String)>,
}

impl Namespaces {
    /// `root` is declared on the first element opened.
    pub(crate) fn new(root: Vec<(String, String)>) -> Self {
        Self {
            stack: NamespaceStack::new(),
            generated: 0,
            root,
        }
    }

    #[inline]
    pub(crate) fn leave(&mut self, mark: usize) {
        self.stack.truncate(mark);
    }

    // -------------------------------------------------------------------------
    // Reading

    /// Pushes the declarations `element` carries.
    #[inline]
    pub(crate) fn enter(&mut self, element: &Element) -> usize {
        self.stack.enter(element)
    }

    /// Resolves a `prefix:local` value in the current scope.
    #[inline]
    pub(crate) fn resolve(&self, qname: &str) -> Result<XName, TreeError> {
        self.stack.resolve_qname(qname.trim())
    }

    // -------------------------------------------------------------------------
    // Writing

    /// Declares what `element` needs for its own name and for `marker`,
    /// then sets the marker. Returns the mark to [`leave`](Self::leave) with.
    pub(crate) fn open(&mut self, element: &mut Element, marker: Option<&XName>) -> usize {
        for (prefix, namespace) in core::mem::take(&mut self.root) {
            element.declare_namespace(&prefix, namespace);
        }
        let mark = self.stack.enter(element);

        let namespace = element.name().namespace().to_string();
        let unqualified_marker = marker.is_some_and(|m| !m.has_namespace());
        if namespace.is_empty() {
            if !self.stack.default_namespace().is_empty() {
                self.declare(element, "", "");
            }
        } else if unqualified_marker {
            // The marker can only name a type without namespace through an
            // empty default namespace, so the element takes a prefix.
            if self.stack.prefix_of(&namespace, false).is_none() {
                let prefix = self.fresh_prefix();
                self.declare(element, &prefix, &namespace);
            }
            if !self.stack.default_namespace().is_empty() {
                self.declare(element, "", "");
            }
        } else if self.stack.prefix_of(&namespace, true).is_none() {
            self.declare(element, "", &namespace);
        }

        if let Some(marker) = marker {
            let value = self.qualify(element, marker);
            self.set_attribute(element, type_marker(), value);
        }
        mark
    }

    /// Sets an attribute, declaring a prefix for its namespace if needed.
    pub(crate) fn set_attribute(&mut self, element: &mut Element, name: XName, value: String) {
        if name.has_namespace() && self.stack.prefix_of(name.namespace(), false).is_none() {
            let prefix = self.fresh_prefix();
            self.declare(element, &prefix, name.namespace());
        }
        element.set_attribute(name, value);
    }

    /// Renders `name` as a qualified name valid on `element`.
    fn qualify(&mut self, element: &mut Element, name: &XName) -> String {
        if !name.has_namespace() {
            return name.local_name().to_string();
        }
        let prefix = match self.stack.prefix_of(name.namespace(), true) {
            Some(prefix) => prefix.to_string(),
            None => {
                let prefix = self.fresh_prefix();
                self.declare(element, &prefix, name.namespace());
                prefix
            }
        };
        if prefix.is_empty() {
            name.local_name().to_string()
        } else {
            format!("{prefix}:{}", name.local_name())
        }
    }

    fn declare(&mut self, element: &mut Element, prefix: &str, namespace: &str) {
        element.declare_namespace(prefix, namespace);
        self.stack.bind(prefix, namespace);
    }

    fn fresh_prefix(&mut self) -> String {
        loop {
            let prefix = format!("nss{}", self.generated);
            self.generated += 1;
            if !self.stack.is_bound(&prefix) {
                return prefix;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Namespaces, type_marker};
    use alloc::string::String;
    use alloc::vec;
    use xb_tree::{Element, WriteOptions, XName, ns, write_with};

    #[test]
    fn markers_use_bound_prefixes() {
        let mut names = Namespaces::new(vec![(String::from("xsi"), String::from(ns::XSI))]);
        let mut root = Element::new(XName::new("urn:s", "Drawing"));
        let outer = names.open(&mut root, None);

        let mut child = Element::new(XName::new("urn:s", "Shape"));
        let inner = names.open(&mut child, Some(&XName::new("urn:s", "Circle")));
        names.leave(inner);
        root.push(child);
        names.leave(outer);

        let text = write_with(&root, WriteOptions::COMPACT).unwrap();
        assert_eq!(
            text,
            r#"<Drawing xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns="urn:s"><Shape xsi:type="Circle"/></Drawing>"#
        );
    }

    #[test]
    fn missing_prefixes_are_generated() {
        let mut names = Namespaces::default();
        let mut root = Element::new("Root");
        let mark = names.open(&mut root, Some(&XName::new("urn:t", "Square")));
        names.leave(mark);

        assert_eq!(root.attribute(&XName::xmlns("nss0")), Some("urn:t"));
        assert_eq!(root.attribute(&XName::xmlns("nss1")), Some(ns::XSI));
        assert_eq!(root.attribute(&type_marker()), Some("nss0:Square"));
    }

    #[test]
    fn unqualified_marker_under_default_namespace() {
        let mut names = Namespaces::default();
        let mut root = Element::new(XName::new("urn:s", "Root"));
        let outer = names.open(&mut root, None);
        let mut child = Element::new(XName::new("urn:s", "Item"));
        let inner = names.open(&mut child, Some(&XName::local("Plain")));
        names.leave(inner);
        names.leave(outer);

        assert_eq!(child.attribute(&XName::xmlns("")), Some(""));
        assert_eq!(child.attribute(&type_marker()), Some("Plain"));
        assert!(child.attribute(&XName::xmlns("nss0")).is_some());
    }
}

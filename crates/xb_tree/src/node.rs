use alloc::string::String;
use alloc::vec::Vec;

use crate::XName;

// -----------------------------------------------------------------------------
// Attribute

/// A name/value pair attached to an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub name: XName,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<XName>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

// -----------------------------------------------------------------------------
// Node

/// A child of an [`Element`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    #[inline]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        }
    }

    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(t) => Some(t),
            Node::Element(_) => None,
        }
    }
}

impl From<Element> for Node {
    #[inline]
    fn from(value: Element) -> Self {
        Node::Element(value)
    }
}

impl From<String> for Node {
    #[inline]
    fn from(value: String) -> Self {
        Node::Text(value)
    }
}

impl From<&str> for Node {
    #[inline]
    fn from(value: &str) -> Self {
        Node::Text(value.into())
    }
}

// -----------------------------------------------------------------------------
// Element

/// An owned XML element: a name, ordered attributes and ordered children.
///
/// Attribute order is preserved and names are unique per element as long
/// as they are set through [`set_attribute`](Self::set_attribute).
///
/// # Examples
///
/// ```
/// use xb_tree::{Element, XName};
///
/// let mut circle = Element::new("circle");
/// circle.set_attribute("radius", "2.5");
/// circle.push(Element::new("label").with_text("unit"));
///
/// assert_eq!(circle.attribute(&XName::local("radius")), Some("2.5"));
/// assert_eq!(circle.element(&XName::local("label")).unwrap().text(), "unit");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: XName,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<XName>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &XName {
        &self.name
    }

    #[inline]
    pub fn set_name(&mut self, name: impl Into<XName>) {
        self.name = name.into();
    }

    // -------------------------------------------------------------------------
    // Attributes

    #[inline]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    #[inline]
    pub fn attributes_mut(&mut self) -> &mut Vec<Attribute> {
        &mut self.attributes
    }

    /// Attributes that are not namespace declarations.
    pub fn plain_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes
            .iter()
            .filter(|a| !a.name.is_namespace_declaration())
    }

    pub fn attribute(&self, name: &XName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| &a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Sets an attribute, replacing the value of an existing one in place.
    pub fn set_attribute(&mut self, name: impl Into<XName>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    pub fn remove_attribute(&mut self, name: &XName) -> Option<String> {
        let index = self.attributes.iter().position(|a| &a.name == name)?;
        Some(self.attributes.remove(index).value)
    }

    /// Declares `prefix` for `namespace` on this element.
    #[inline]
    pub fn declare_namespace(&mut self, prefix: &str, namespace: impl Into<String>) {
        self.set_attribute(XName::xmlns(prefix), namespace);
    }

    /// The `(prefix, namespace)` pairs declared on this element.
    pub fn namespace_declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .filter_map(|a| a.name.declared_prefix().map(|p| (p, a.value.as_str())))
    }

    // -------------------------------------------------------------------------
    // Children

    #[inline]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    #[inline]
    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    #[inline]
    pub fn push(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }

    /// Builder form of [`push`](Self::push).
    #[inline]
    pub fn with_child(mut self, node: impl Into<Node>) -> Self {
        self.push(node);
        self
    }

    /// Builder form of [`set_attribute`](Self::set_attribute).
    #[inline]
    pub fn with_attribute(mut self, name: impl Into<XName>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder form of [`set_text`](Self::set_text).
    #[inline]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Mutable child elements in document order.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// The first child element called `name`.
    pub fn element(&self, name: &XName) -> Option<&Element> {
        self.elements().find(|e| &e.name == name)
    }

    /// Concatenation of the direct text children.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for t in self.children.iter().filter_map(Node::as_text) {
            text.push_str(t);
        }
        text
    }

    /// Returns `true` if at least one direct text child exists.
    pub fn has_text(&self) -> bool {
        self.children.iter().any(|n| matches!(n, Node::Text(_)))
    }

    /// Replaces all direct text children with a single one, placed first.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children.retain(|n| !matches!(n, Node::Text(_)));
        let text = text.into();
        if !text.is_empty() {
            self.children.insert(0, Node::Text(text));
        }
    }

    /// Returns `true` if the element has no attributes and no children.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty()
    }
}

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::{Element, NamespaceStack, Node, TreeError};

// -----------------------------------------------------------------------------
// WriteOptions

/// Controls how a tree is rendered to text.
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    /// Indentation width, `None` renders everything on one line.
    pub indent: Option<usize>,
    /// Emit the `<?xml version="1.0" encoding="utf-8"?>` declaration.
    pub declaration: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: Some(2),
            declaration: false,
        }
    }
}

impl WriteOptions {
    /// Single line output without declaration.
    pub const COMPACT: Self = Self {
        indent: None,
        declaration: false,
    };
}

// -----------------------------------------------------------------------------
// write

/// Renders `root` with the default options.
///
/// Prefixes come from the `xmlns` declarations present on the tree.
/// Element namespaces without a prefix in scope get a default namespace
/// declaration, attribute namespaces get a generated `nsN` prefix.
///
/// # Examples
///
/// ```
/// use xb_tree::{Element, WriteOptions, XName, parse, write_with};
///
/// let mut root = Element::new(XName::new("urn:s", "shape"));
/// root.set_attribute(XName::new("urn:meta", "id"), "7");
///
/// let text = write_with(&root, WriteOptions::COMPACT).unwrap();
/// assert_eq!(text, r#"<shape xmlns="urn:s" xmlns:ns0="urn:meta" ns0:id="7"/>"#);
/// assert_eq!(parse(&text).unwrap().name(), root.name());
/// ```
#[inline]
pub fn write(root: &Element) -> Result<String, TreeError> {
    write_with(root, WriteOptions::default())
}

/// [`write`] with explicit options.
pub fn write_with(root: &Element, options: WriteOptions) -> Result<String, TreeError> {
    let mut writer = match options.indent {
        Some(width) => Writer::new_with_indent(Vec::new(), b' ', width),
        None => Writer::new(Vec::new()),
    };
    if options.declaration {
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    }
    let mut bindings = NamespaceStack::new();
    let mut generated = 0_usize;
    write_element(&mut writer, root, &mut bindings, &mut generated)?;
    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: &Element,
    bindings: &mut NamespaceStack,
    generated: &mut usize,
) -> Result<(), TreeError> {
    let mark = bindings.enter(element);
    // Declarations this element needs on top of the ones it carries.
    let mut extra: Vec<(String, String)> = Vec::new();

    let name = element.name();
    let qname = if !name.has_namespace() {
        if !bindings.default_namespace().is_empty() {
            bindings.bind("", "");
            extra.push((String::new(), String::new()));
        }
        String::from(name.local_name())
    } else {
        match bindings.prefix_of(name.namespace(), true) {
            Some("") => String::from(name.local_name()),
            Some(prefix) => format!("{prefix}:{}", name.local_name()),
            None => {
                bindings.bind("", name.namespace());
                extra.push((String::new(), String::from(name.namespace())));
                String::from(name.local_name())
            }
        }
    };

    let mut attributes: Vec<(String, &str)> = Vec::new();
    for attr in element.attributes() {
        if let Some(prefix) = attr.name.declared_prefix() {
            let key = if prefix.is_empty() {
                String::from("xmlns")
            } else {
                format!("xmlns:{prefix}")
            };
            attributes.push((key, &attr.value));
            continue;
        }
        if !attr.name.has_namespace() {
            attributes.push((String::from(attr.name.local_name()), &attr.value));
            continue;
        }
        let prefix = match bindings.prefix_of(attr.name.namespace(), false) {
            Some(prefix) => String::from(prefix),
            None => {
                let prefix = fresh_prefix(bindings, generated);
                bindings.bind(prefix.as_str(), attr.name.namespace());
                extra.push((prefix.clone(), String::from(attr.name.namespace())));
                prefix
            }
        };
        attributes.push((format!("{prefix}:{}", attr.name.local_name()), &attr.value));
    }

    let mut start = BytesStart::new(qname.as_str());
    for (prefix, namespace) in &extra {
        if prefix.is_empty() {
            start.push_attribute(("xmlns", namespace.as_str()));
        } else {
            start.push_attribute((format!("xmlns:{prefix}").as_str(), namespace.as_str()));
        }
    }
    for (key, value) in &attributes {
        start.push_attribute((key.as_str(), *value));
    }

    if element.children().is_empty() {
        writer.write_event(Event::Empty(start))?;
    } else {
        writer.write_event(Event::Start(start))?;
        for child in element.children() {
            match child {
                Node::Element(e) => write_element(writer, e, bindings, generated)?,
                Node::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(qname.as_str())))?;
    }

    bindings.truncate(mark);
    Ok(())
}

fn fresh_prefix(bindings: &NamespaceStack, generated: &mut usize) -> String {
    loop {
        let prefix = format!("ns{generated}");
        *generated += 1;
        if !bindings.is_bound(&prefix) {
            return prefix;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{WriteOptions, write, write_with};
    use crate::{Element, XName, parse};

    #[test]
    fn reuses_declared_prefixes() {
        let mut root = Element::new(XName::new("urn:a", "root"));
        root.declare_namespace("a", "urn:a");
        root.push(Element::new(XName::new("urn:a", "child")).with_text("x"));
        let text = write_with(&root, WriteOptions::COMPACT).unwrap();
        assert_eq!(text, r#"<a:root xmlns:a="urn:a"><a:child>x</a:child></a:root>"#);
    }

    #[test]
    fn resets_default_namespace_for_unqualified_children() {
        let root = Element::new(XName::new("urn:a", "root")).with_child(Element::new("plain"));
        let text = write_with(&root, WriteOptions::COMPACT).unwrap();
        assert_eq!(text, r#"<root xmlns="urn:a"><plain xmlns=""/></root>"#);
        let back = parse(&text).unwrap();
        assert!(back.element(&XName::local("plain")).is_some());
    }

    #[test]
    fn escapes_text_and_attributes() {
        let root = Element::new("t")
            .with_attribute("v", "a\"<b>&")
            .with_text("1 < 2 & 3");
        let text = write_with(&root, WriteOptions::COMPACT).unwrap();
        let back = parse(&text).unwrap();
        assert_eq!(back, root);
    }

    #[test]
    fn indented_output_reads_back() {
        let root = Element::new("a")
            .with_child(Element::new("b").with_text("one"))
            .with_child(Element::new("c").with_child(Element::new("d")));
        let text = write(&root).unwrap();
        assert!(text.contains('\n'));
        assert_eq!(parse(&text).unwrap(), root);
    }
}

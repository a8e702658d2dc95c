use alloc::borrow::ToOwned;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};

use crate::{Attribute, Element, NamespaceStack, Node, TreeError, XName};

// -----------------------------------------------------------------------------
// ParseOptions

/// Controls how text is turned into a tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Keep whitespace-only text between child elements.
    ///
    /// Off by default, so indented documents read back into the same tree
    /// they were written from.
    pub preserve_whitespace: bool,
}

// -----------------------------------------------------------------------------
// parse

/// Parses a document and returns its root element.
///
/// Namespace prefixes are resolved into [`XName`]s, and the `xmlns`
/// declarations are kept on the elements that carry them.
///
/// # Examples
///
/// ```
/// use xb_tree::{XName, parse};
///
/// let root = parse(r#"<s:shape xmlns:s="urn:s" id="7"><s:name>disc</s:name></s:shape>"#).unwrap();
/// assert_eq!(root.name(), &XName::new("urn:s", "shape"));
/// assert_eq!(root.attribute(&XName::local("id")), Some("7"));
/// assert_eq!(root.element(&XName::new("urn:s", "name")).unwrap().text(), "disc");
/// ```
#[inline]
pub fn parse(input: &str) -> Result<Element, TreeError> {
    parse_with(input, ParseOptions::default())
}

/// [`parse`] with explicit options.
pub fn parse_with(input: &str, options: ParseOptions) -> Result<Element, TreeError> {
    let mut reader = Reader::from_str(input);
    let mut bindings = NamespaceStack::new();
    let mut open: Vec<(Element, usize)> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let frame = open_element(&start, &mut bindings)?;
                open.push(frame);
            }
            Event::Empty(start) => {
                let (element, mark) = open_element(&start, &mut bindings)?;
                bindings.truncate(mark);
                close_element(element, &mut open, &mut root, options)?;
            }
            Event::End(_) => {
                // End names are checked by quick-xml, only the depth matters here.
                let Some((element, mark)) = open.pop() else {
                    return Err(TreeError::NoRoot);
                };
                bindings.truncate(mark);
                close_element(element, &mut open, &mut root, options)?;
            }
            Event::Text(text) => {
                let raw = core::str::from_utf8(&text)?;
                push_text(&mut open, &unescape(raw)?)?;
            }
            Event::CData(data) => {
                push_text(&mut open, core::str::from_utf8(&data)?)?;
            }
            Event::GeneralRef(reference) => {
                let name = core::str::from_utf8(&reference)?;
                push_text(&mut open, &unescape(&format!("&{name};"))?)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes
            // carry no data for the tree.
            _ => {}
        }
    }

    if let Some((element, _)) = open.pop() {
        return Err(TreeError::UnexpectedEof(element.name().to_string()));
    }
    root.ok_or(TreeError::NoRoot)
}

fn open_element(
    start: &BytesStart<'_>,
    bindings: &mut NamespaceStack,
) -> Result<(Element, usize), TreeError> {
    let mark = bindings.mark();
    let mut raw_attributes: Vec<(String, String)> = Vec::new();

    for attr in start.attributes() {
        let attr = attr?;
        let key = core::str::from_utf8(attr.key.as_ref())?.to_owned();
        let value = unescape(core::str::from_utf8(&attr.value)?)?.into_owned();
        if key == "xmlns" {
            bindings.bind("", value.as_str());
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            bindings.bind(prefix, value.as_str());
        }
        raw_attributes.push((key, value));
    }

    let qname = core::str::from_utf8(start.name().as_ref())?.to_owned();
    let mut element = Element::new(bindings.resolve_qname(&qname)?);

    for (key, value) in raw_attributes {
        let name = if key == "xmlns" {
            XName::xmlns("")
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            XName::xmlns(prefix)
        } else if key.contains(':') {
            bindings.resolve_qname(&key)?
        } else {
            // Unprefixed attributes are never in the default namespace.
            XName::local(key)
        };
        element.attributes_mut().push(Attribute { name, value });
    }

    Ok((element, mark))
}

fn close_element(
    mut element: Element,
    open: &mut [(Element, usize)],
    root: &mut Option<Element>,
    options: ParseOptions,
) -> Result<(), TreeError> {
    if !options.preserve_whitespace && element.elements().next().is_some() {
        element
            .children_mut()
            .retain(|n| !matches!(n, Node::Text(t) if t.trim().is_empty()));
    }
    match open.last_mut() {
        Some((parent, _)) => parent.push(element),
        None if root.is_some() => return Err(TreeError::MultipleRoots),
        None => *root = Some(element),
    }
    Ok(())
}

fn push_text(open: &mut [(Element, usize)], text: &str) -> Result<(), TreeError> {
    let Some((parent, _)) = open.last_mut() else {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(TreeError::TextOutsideRoot);
    };
    // Entity references split text into several events, merge them back.
    if let Some(Node::Text(last)) = parent.children_mut().last_mut() {
        last.push_str(text);
    } else if !text.is_empty() {
        parent.push(text);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ParseOptions, parse, parse_with};
    use crate::{Node, TreeError, XName, ns};

    #[test]
    fn resolves_default_and_prefixed_names() {
        let root = parse(
            r#"<root xmlns="urn:d" xmlns:x="urn:x"><child x:a="1" b="2"/><x:other/></root>"#,
        )
        .unwrap();
        assert_eq!(root.name(), &XName::new("urn:d", "root"));
        let child = root.element(&XName::new("urn:d", "child")).unwrap();
        assert_eq!(child.attribute(&XName::new("urn:x", "a")), Some("1"));
        assert_eq!(child.attribute(&XName::local("b")), Some("2"));
        assert!(root.element(&XName::new("urn:x", "other")).is_some());
        assert_eq!(root.attribute(&XName::xmlns("x")), Some("urn:x"));
        assert_eq!(root.attribute(&XName::new(ns::XMLNS, "x")), Some("urn:x"));
    }

    #[test]
    fn entities_are_merged_into_text() {
        let root = parse("<t>a &amp; b &lt;c&gt; &#65;</t>").unwrap();
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.text(), "a & b <c> A");
    }

    #[test]
    fn attribute_values_are_unescaped() {
        let root = parse(r#"<t v="&quot;x&quot; &amp; y"/>"#).unwrap();
        assert_eq!(root.attribute(&XName::local("v")), Some("\"x\" & y"));
    }

    #[test]
    fn indentation_is_dropped_between_elements() {
        let text = "<a>\n  <b> keep </b>\n  <c/>\n</a>";
        let root = parse(text).unwrap();
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.element(&XName::local("b")).unwrap().text(), " keep ");

        let kept = parse_with(text, ParseOptions { preserve_whitespace: true }).unwrap();
        assert!(matches!(kept.children()[0], Node::Text(_)));
    }

    #[test]
    fn structural_errors() {
        assert!(matches!(parse(""), Err(TreeError::NoRoot)));
        assert!(matches!(parse("<a/><b/>"), Err(TreeError::MultipleRoots)));
        assert!(matches!(parse("<a/>text"), Err(TreeError::TextOutsideRoot)));
        assert!(matches!(parse("<p:a/>"), Err(TreeError::UnboundPrefix(_))));
        assert!(parse("<a><b></a>").is_err());
    }
}

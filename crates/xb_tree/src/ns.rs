//! Well known namespace URIs.

/// XML Schema instance namespace, home of the `type` override attribute.
pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML Schema namespace, used for the names of built-in scalar types.
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema";

/// Namespace of prefixed `xmlns:*` declaration attributes.
pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";

/// Namespace bound to the reserved `xml` prefix.
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

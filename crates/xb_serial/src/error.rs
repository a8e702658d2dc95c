use alloc::boxed::Box;
use alloc::string::String;
use core::fmt::{Display, Formatter};

use thiserror::Error;
use xb_tree::{TreeError, XName};

// -----------------------------------------------------------------------------
// XmlError

/// Errors raised while registering types or converting values.
///
/// The variants fall into a few families:
///
/// - Configuration: raised by [`XSerializerBuilder`] when metadata is
///   inconsistent. These need a code fix.
/// - Type resolution: a value or document names a type the registry was
///   never told about.
/// - Structure: a document does not have the shape its types expect.
/// - Cycles: the object graph loops back on itself while serializing.
///
/// With the `debug` feature in debug builds, errors escaping a session are
/// wrapped in [`XmlError::Traced`], which records the chain of types being
/// processed. Use [`XmlError::untraced`] to match on the underlying error.
///
/// [`XSerializerBuilder`]: crate::XSerializerBuilder
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum XmlError {
    // Configuration
    #[error("member `{member}` of `{owner}` combines placements {placements}")]
    ConflictingPlacement {
        owner: &'static str,
        member: String,
        placements: String,
    },
    #[error(
        "member `{member}` of `{owner}` is placed as {placement}, \
         but `{target}` is neither a scalar nor text convertible"
    )]
    NotLeaf {
        owner: &'static str,
        member: String,
        placement: &'static str,
        target: &'static str,
    },
    #[error("member `{member}` of `{owner}` must be a `{expected}` to collect unknown nodes")]
    InvalidPassthrough {
        owner: &'static str,
        member: String,
        expected: &'static str,
    },
    #[error("read-only member `{member}` of `{owner}` holds `{target}`, which cannot be filled in place")]
    ReadOnlyValueMember {
        owner: &'static str,
        member: String,
        target: &'static str,
    },
    #[error("`{owner}` declares {placement} `{name}` more than once")]
    DuplicateMember {
        owner: &'static str,
        name: XName,
        placement: &'static str,
    },
    #[error("scope `{scope}` cannot bind `{name}` to `{type_path}`: {reason}")]
    DuplicateName {
        scope: String,
        name: XName,
        type_path: &'static str,
        reason: String,
    },
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    // Type resolution
    #[error("type `{0}` is not registered")]
    UnregisteredType(String),
    #[error("type name `{name}` is unknown in scope `{scope}`")]
    UnknownTypeName { name: XName, scope: String },
    #[error("expected `{expected}`, found `{found}`")]
    InvalidType { expected: String, found: String },

    // Structure
    #[error("required element `{name}` of `{owner}` is missing")]
    MissingElement { owner: &'static str, name: XName },
    #[error("required attribute `{name}` of `{owner}` is missing")]
    MissingAttribute { owner: &'static str, name: XName },
    #[error("cannot read `{text}` as `{target}`: {reason}")]
    InvalidText {
        target: &'static str,
        text: String,
        reason: String,
    },
    #[error("cannot render `{target}` as text: {reason}")]
    InvalidValue { target: &'static str, reason: String },
    #[error("read-only member `{member}` of `{owner}` is empty, there is nothing to fill in place")]
    NullReadOnlyMember { owner: &'static str, member: String },
    #[error("`{0}` cannot be instantiated, it declares no constructor")]
    UnsupportedType(&'static str),
    #[error("not supported: {0}")]
    NotSupported(String),

    // Cycles
    #[error("circular reference detected at `{0}`")]
    CircularReference(&'static str),

    // Enumerations
    #[error("`{type_path}`: flag combination `{value}` is not supported")]
    FlagsCombination { type_path: &'static str, value: String },

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("{source}\n{trail}")]
    Traced {
        source: Box<XmlError>,
        trail: TypeTrail,
    },
}

impl XmlError {
    /// Strips the [`Traced`](Self::Traced) wrapper, if any.
    pub fn untraced(&self) -> &XmlError {
        match self {
            XmlError::Traced { source, .. } => source.untraced(),
            other => other,
        }
    }

    /// The type trail recorded when the error escaped a session.
    pub fn trail(&self) -> Option<&TypeTrail> {
        match self {
            XmlError::Traced { trail, .. } => Some(trail),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn invalid_operation(msg: impl Into<String>) -> Self {
        XmlError::InvalidOperation(msg.into())
    }

    #[inline]
    pub(crate) fn invalid_type(expected: impl Into<String>, found: impl Into<String>) -> Self {
        XmlError::InvalidType {
            expected: expected.into(),
            found: found.into(),
        }
    }

    #[inline]
    pub(crate) fn invalid_text(target: &'static str, text: &str, reason: impl Display) -> Self {
        XmlError::InvalidText {
            target,
            text: text.into(),
            reason: alloc::format!("{reason}"),
        }
    }
}

// -----------------------------------------------------------------------------
// TypeTrail

/// The type paths a session was processing when an error occurred,
/// outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeTrail(pub(crate) alloc::vec::Vec<&'static str>);

impl TypeTrail {
    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().copied()
    }
}

impl Display for TypeTrail {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str("(type trail:")?;
        for (index, path) in self.0.iter().enumerate() {
            if index == 0 {
                write!(f, "\n`{path}`")?;
            } else {
                write!(f, "\n -> `{path}`")?;
            }
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::{TypeTrail, XmlError};
    use alloc::boxed::Box;
    use alloc::string::ToString;

    #[test]
    fn untraced_reaches_the_source() {
        let err = XmlError::Traced {
            source: Box::new(XmlError::CircularReference("a::Node")),
            trail: TypeTrail(alloc::vec!["a::Root", "a::Node"]),
        };
        assert!(matches!(err.untraced(), XmlError::CircularReference("a::Node")));
        let text = err.to_string();
        assert!(text.starts_with("circular reference detected at `a::Node`"));
        assert!(text.contains("`a::Root`\n -> `a::Node`"));
    }
}

use alloc::string::{FromUtf8Error, String};
use core::str::Utf8Error;

use quick_xml::escape::EscapeError;
use quick_xml::events::attributes::AttrError;
use thiserror::Error;

/// Errors raised while reading or writing XML text.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TreeError {
    #[error("malformed xml: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed attribute: {0}")]
    Attribute(#[from] AttrError),
    #[error("invalid escape sequence: {0}")]
    Escape(#[from] EscapeError),
    #[error("input is not valid utf-8: {0}")]
    Utf8(#[from] Utf8Error),
    #[error("output is not valid utf-8: {0}")]
    Output(#[from] FromUtf8Error),
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("namespace prefix `{0}` is not bound")]
    UnboundPrefix(String),
    #[error("`{0}` is not a valid qualified name")]
    InvalidQName(String),
    #[error("document has no root element")]
    NoRoot,
    #[error("document has more than one root element")]
    MultipleRoots,
    #[error("text outside of the root element")]
    TextOutsideRoot,
    #[error("document ended inside `{0}`")]
    UnexpectedEof(String),
}

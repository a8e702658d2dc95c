#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod error;
mod name;
mod node;
mod reader;
mod writer;

pub mod ns;

// -----------------------------------------------------------------------------
// Top-level exports

pub use error::TreeError;
pub use name::{NamespaceStack, XName};
pub use node::{Attribute, Element, Node};
pub use reader::{ParseOptions, parse, parse_with};
pub use writer::{WriteOptions, write, write_with};

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use xb_serial as serial;
pub use xb_tree as tree;
pub use xb_utils as utils;

pub use xb_serial::{impl_xml_enum, impl_xml_polymorphic, submit_type};

/// The types most programs need to describe and convert their data.
pub mod prelude {
    pub use xb_serial::{
        Context, Member, NamespaceBindings, SerializerOptions, TypeMeta, XSerializer,
        XSerializerBuilder, XmlEnum, XmlError, XmlText, XmlType,
    };
    pub use xb_tree::{Attribute, Element, XName};
}

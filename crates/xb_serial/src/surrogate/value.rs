use alloc::boxed::Box;
use alloc::string::String;
use core::any::Any;

use crate::XmlError;
use crate::meta::{TypeMeta, TypeTraitExternal};
use crate::surrogate::{Surrogate, mismatch};

/// Converts foreign leaves declared with
/// [`TypeMeta::external`](crate::meta::TypeMeta::external) through their
/// `Display` and `FromStr` implementations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueSurrogate;

impl Surrogate for ValueSurrogate {
    fn name(&self) -> &str {
        "value"
    }

    fn supports(&self, meta: &TypeMeta) -> bool {
        meta.has_trait::<TypeTraitExternal>()
    }

    fn serialize(&self, value: &dyn Any, meta: &TypeMeta) -> Result<String, XmlError> {
        meta.get_trait::<TypeTraitExternal>()
            .and_then(|t| t.codec().to_text(value))
            .ok_or_else(|| mismatch(meta))
    }

    fn deserialize(&self, text: &str, meta: &TypeMeta) -> Result<Box<dyn Any>, XmlError> {
        let external = meta
            .get_trait::<TypeTraitExternal>()
            .ok_or_else(|| XmlError::UnsupportedType(meta.type_path()))?;
        external
            .codec()
            .from_text(text)
            .map_err(|reason| XmlError::invalid_text(meta.type_path(), text, reason))
    }
}

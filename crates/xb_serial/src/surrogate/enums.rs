use alloc::boxed::Box;
use alloc::string::{String, ToString};
use core::any::Any;

use crate::meta::{TypeMeta, TypeTraitEnum};
use crate::surrogate::{Surrogate, mismatch};
use crate::XmlError;

/// Writes [`XmlEnum`](crate::meta::XmlEnum) values as member tokens.
///
/// Values without a declared member are written as their number. For flag
/// sets, anything that is not exactly one declared member is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumSurrogate;

fn ops(meta: &TypeMeta) -> Result<&TypeTraitEnum, XmlError> {
    meta.get_trait::<TypeTraitEnum>()
        .ok_or_else(|| XmlError::UnsupportedType(meta.type_path()))
}

impl Surrogate for EnumSurrogate {
    fn name(&self) -> &str {
        "enum"
    }

    fn supports(&self, meta: &TypeMeta) -> bool {
        meta.has_trait::<TypeTraitEnum>()
    }

    fn serialize(&self, value: &dyn Any, meta: &TypeMeta) -> Result<String, XmlError> {
        let ops = ops(meta)?;
        let bits = ops.bits_of(value).ok_or_else(|| mismatch(meta))?;
        if let Some((_, token)) = ops.tokens().into_iter().find(|(b, _)| *b == bits) {
            return Ok(token.to_string());
        }
        if ops.is_flags() {
            return Err(XmlError::FlagsCombination {
                type_path: meta.type_path(),
                value: alloc::format!("{bits:#x}"),
            });
        }
        Ok(bits.to_string())
    }

    fn deserialize(&self, text: &str, meta: &TypeMeta) -> Result<Box<dyn Any>, XmlError> {
        let ops = ops(meta)?;
        let token = text.trim();
        let tokens = ops.tokens();
        let bits = match tokens.iter().find(|(_, t)| *t == token) {
            Some((bits, _)) => *bits,
            None => {
                let combined = || XmlError::FlagsCombination {
                    type_path: meta.type_path(),
                    value: token.to_string(),
                };
                if ops.is_flags() && token.contains([' ', ',', '|']) {
                    return Err(combined());
                }
                let bits = token.parse::<u64>().map_err(|_| {
                    XmlError::invalid_text(meta.type_path(), text, "not a declared member")
                })?;
                if ops.is_flags() && !tokens.iter().any(|(b, _)| *b == bits) {
                    return Err(combined());
                }
                bits
            }
        };
        ops.from_bits(bits).ok_or_else(|| {
            XmlError::invalid_text(meta.type_path(), text, "no member has this value")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::EnumSurrogate;
    use crate::meta::{TypeMeta, XmlEnum};
    use crate::{Surrogate, XmlError};

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Level {
        Low = 1,
        High = 5,
    }

    crate::impl_xml_enum!(Level { Low = "low", High = "high" });

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Access(u64);

    impl XmlEnum for Access {
        const FLAGS: bool = true;

        fn members() -> &'static [(Self, &'static str)] {
            &[(Access(1), "read"), (Access(2), "write")]
        }

        fn to_bits(self) -> u64 {
            self.0
        }

        fn from_bits(bits: u64) -> Option<Self> {
            Some(Access(bits))
        }
    }

    #[test]
    fn plain_enums() {
        let meta = TypeMeta::enumeration::<Level>();
        let s = EnumSurrogate;
        assert!(s.supports(&meta));
        assert_eq!(s.serialize(&Level::High, &meta).unwrap(), "high");
        let back = s.deserialize(" low ", &meta).unwrap();
        assert_eq!(*back.downcast::<Level>().unwrap(), Level::Low);
        let back = s.deserialize("5", &meta).unwrap();
        assert_eq!(*back.downcast::<Level>().unwrap(), Level::High);
        assert!(matches!(
            s.deserialize("medium", &meta),
            Err(XmlError::InvalidText { .. })
        ));
        assert!(s.deserialize("3", &meta).is_err());
    }

    #[test]
    fn flag_combinations_are_rejected() {
        let meta = TypeMeta::enumeration::<Access>();
        let s = EnumSurrogate;
        assert_eq!(s.serialize(&Access(2), &meta).unwrap(), "write");
        assert!(matches!(
            s.serialize(&Access(3), &meta),
            Err(XmlError::FlagsCombination { .. })
        ));
        assert!(matches!(
            s.deserialize("read write", &meta),
            Err(XmlError::FlagsCombination { .. })
        ));
        assert!(matches!(
            s.deserialize("3", &meta),
            Err(XmlError::FlagsCombination { .. })
        ));
        let back = s.deserialize("1", &meta).unwrap();
        assert_eq!(*back.downcast::<Access>().unwrap(), Access(1));
    }
}

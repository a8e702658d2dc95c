use core::time::Duration;

use crate::meta::{TypeMeta, XmlType};

// Scalars are recognized through the scalar table, their metadata only
// carries the identity.
macro_rules! impl_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl XmlType for $ty {
                #[inline]
                fn type_meta() -> TypeMeta {
                    TypeMeta::opaque::<Self>()
                }
            }
        )*
    };
}

impl_scalar!(
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    u8,
    u16,
    u32,
    u64,
    u128,
    f32,
    f64,
    alloc::string::String,
    Duration,
);

#[cfg(feature = "chrono")]
impl_scalar!(
    chrono::DateTime<chrono::Utc>,
    chrono::NaiveDate,
    chrono::NaiveTime,
);

#[cfg(feature = "uuid")]
impl_scalar!(uuid::Uuid);

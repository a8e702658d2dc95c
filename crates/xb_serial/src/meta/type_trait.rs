use core::any::Any;

// -----------------------------------------------------------------------------
// TypeTrait

/// A capability attached to a [`TypeMeta`](crate::meta::TypeMeta).
///
/// Capabilities are stored in a table keyed by their own type, and looked
/// up with [`TypeMeta::get_trait`](crate::meta::TypeMeta::get_trait).
/// They are what the classifier inspects to decide how a type is
/// converted: text conversion, collection access, wrapper peeling and so on.
pub trait TypeTrait: Any + Send + Sync {}

impl dyn TypeTrait {
    /// Returns `true` if the underlying capability is a `T`.
    #[inline]
    pub fn is<T: TypeTrait>(&self) -> bool {
        (self as &dyn Any).is::<T>()
    }

    #[inline]
    pub fn downcast_ref<T: TypeTrait>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }
}

// -----------------------------------------------------------------------------
// FromType

/// Builds a capability for a concrete type.
///
/// # Examples
///
/// ```
/// use xb_serial::meta::{FromType, TypeMeta, TypeTraitText, XmlText};
///
/// struct Celsius(f64);
///
/// impl XmlText for Celsius {
///     type Error = core::num::ParseFloatError;
///
///     fn to_xml_text(&self) -> String {
///         format!("{}C", self.0)
///     }
///
///     fn from_xml_text(text: &str) -> Result<Self, Self::Error> {
///         text.trim_end_matches('C').parse().map(Celsius)
///     }
/// }
///
/// let mut meta = TypeMeta::opaque::<Celsius>();
/// meta.insert_trait::<TypeTraitText>(FromType::<Celsius>::from_type());
///
/// let text = meta.get_trait::<TypeTraitText>().unwrap();
/// assert_eq!(text.to_text(&Celsius(21.5)).as_deref(), Some("21.5C"));
/// ```
pub trait FromType<T> {
    fn from_type() -> Self;
}

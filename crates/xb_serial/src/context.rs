use core::any::Any;
use core::fmt::{Debug, Formatter};

// -----------------------------------------------------------------------------
// Context

/// A caller supplied value handed to every lifecycle callback of a call.
///
/// The serializer never looks inside it. Callbacks recover the concrete
/// value with [`get`](Self::get).
///
/// # Examples
///
/// ```
/// use xb_serial::Context;
///
/// let user = String::from("alice");
/// let context = Context::new(&user);
///
/// assert_eq!(context.get::<String>().map(String::as_str), Some("alice"));
/// assert!(context.get::<u32>().is_none());
/// assert!(Context::none().is_empty());
/// ```
#[derive(Clone, Copy, Default)]
pub struct Context<'a> {
    value: Option<&'a dyn Any>,
}

impl<'a> Context<'a> {
    #[inline]
    pub const fn none() -> Self {
        Self { value: None }
    }

    #[inline]
    pub fn new<C: Any>(value: &'a C) -> Self {
        Self { value: Some(value) }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// The context value, if it is a `C`.
    #[inline]
    pub fn get<C: Any>(&self) -> Option<&'a C> {
        self.value.and_then(|v| v.downcast_ref::<C>())
    }

    #[inline]
    pub fn value(&self) -> Option<&'a dyn Any> {
        self.value
    }
}

impl Debug for Context<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self.value {
            Some(_) => f.write_str("Context(..)"),
            None => f.write_str("Context(None)"),
        }
    }
}

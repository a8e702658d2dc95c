use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;

use crate::Context;
use crate::meta::member::Accessor;

// -----------------------------------------------------------------------------
// Hooks

/// A lifecycle callback run while serializing.
pub(crate) trait SerializeHook: Send + Sync {
    fn call(&self, value: &dyn Any, context: &Context<'_>);
}

/// A lifecycle callback run while deserializing.
pub(crate) trait DeserializeHook: Send + Sync {
    fn call(&self, value: &mut dyn Any, context: &Context<'_>);
}

pub(crate) struct RefHook<T>(pub(crate) fn(&T, &Context<'_>));

impl<T: Any> SerializeHook for RefHook<T> {
    fn call(&self, value: &dyn Any, context: &Context<'_>) {
        if let Some(value) = value.downcast_ref::<T>() {
            (self.0)(value, context);
        }
    }
}

pub(crate) struct MutHook<T>(pub(crate) fn(&mut T, &Context<'_>));

impl<T: Any> DeserializeHook for MutHook<T> {
    fn call(&self, value: &mut dyn Any, context: &Context<'_>) {
        if let Some(value) = value.downcast_mut::<T>() {
            (self.0)(value, context);
        }
    }
}

/// Runs a hook of an embedded value.
struct Embedded<H: ?Sized> {
    outer: Arc<dyn Accessor>,
    hook: Arc<H>,
}

impl SerializeHook for Embedded<dyn SerializeHook> {
    fn call(&self, value: &dyn Any, context: &Context<'_>) {
        if let Some(base) = self.outer.get(value) {
            self.hook.call(base, context);
        }
    }
}

impl DeserializeHook for Embedded<dyn DeserializeHook> {
    fn call(&self, value: &mut dyn Any, context: &Context<'_>) {
        if let Some(base) = self.outer.get_mut(value) {
            self.hook.call(base, context);
        }
    }
}

// -----------------------------------------------------------------------------
// Callbacks

/// The lifecycle callbacks of a composite type, in declaration order.
#[derive(Clone, Default)]
pub(crate) struct Callbacks {
    pub(crate) serializing: Vec<Arc<dyn SerializeHook>>,
    pub(crate) serialized: Vec<Arc<dyn SerializeHook>>,
    pub(crate) deserializing: Vec<Arc<dyn DeserializeHook>>,
    pub(crate) deserialized: Vec<Arc<dyn DeserializeHook>>,
}

impl Callbacks {
    pub(crate) fn len(&self) -> usize {
        self.serializing.len()
            + self.serialized.len()
            + self.deserializing.len()
            + self.deserialized.len()
    }

    /// Appends the callbacks of an embedded value reached through `outer`.
    pub(crate) fn extend_embedded(&mut self, base: &Callbacks, outer: &Arc<dyn Accessor>) {
        fn wrap_ser(outer: &Arc<dyn Accessor>, hook: &Arc<dyn SerializeHook>) -> Arc<dyn SerializeHook> {
            Arc::new(Embedded {
                outer: outer.clone(),
                hook: hook.clone(),
            })
        }
        fn wrap_de(outer: &Arc<dyn Accessor>, hook: &Arc<dyn DeserializeHook>) -> Arc<dyn DeserializeHook> {
            Arc::new(Embedded {
                outer: outer.clone(),
                hook: hook.clone(),
            })
        }
        self.serializing.extend(base.serializing.iter().map(|h| wrap_ser(outer, h)));
        self.serialized.extend(base.serialized.iter().map(|h| wrap_ser(outer, h)));
        self.deserializing.extend(base.deserializing.iter().map(|h| wrap_de(outer, h)));
        self.deserialized.extend(base.deserialized.iter().map(|h| wrap_de(outer, h)));
    }

    pub(crate) fn run_serializing(&self, value: &dyn Any, context: &Context<'_>) {
        for hook in &self.serializing {
            hook.call(value, context);
        }
    }

    pub(crate) fn run_serialized(&self, value: &dyn Any, context: &Context<'_>) {
        for hook in &self.serialized {
            hook.call(value, context);
        }
    }

    pub(crate) fn run_deserializing(&self, value: &mut dyn Any, context: &Context<'_>) {
        for hook in &self.deserializing {
            hook.call(value, context);
        }
    }

    pub(crate) fn run_deserialized(&self, value: &mut dyn Any, context: &Context<'_>) {
        for hook in &self.deserialized {
            hook.call(value, context);
        }
    }
}

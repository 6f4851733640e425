//! AnyVerb - whichever verb the command line selected

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use super::verb::{VerbShape, VerbValue};
use crate::domain::readable;

/// AnyVerb holds the selected verb, or nothing when parsing failed.
///
/// Callers that need the concrete verb narrow it with `downcast_ref` or
/// `downcast`; callers that only need a common capability go through
/// `App::base::<B>()` instead.
#[derive(Clone, Default)]
pub struct AnyVerb {
    value: Option<VerbValue>,
    type_name: Option<&'static str>,
}

impl AnyVerb {
    pub fn new(value: VerbValue, shape: &VerbShape) -> Self {
        Self {
            value: Some(value),
            type_name: Some(shape.full_type_name()),
        }
    }

    /// Boxes a concrete verb directly, without going through a parser.
    pub fn of<V: Any + Send + Sync>(verb: V) -> Self {
        Self {
            value: Some(Arc::new(verb)),
            type_name: Some(std::any::type_name::<V>()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn value(&self) -> Option<&VerbValue> {
        self.value.as_ref()
    }

    pub fn is_some(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_none(&self) -> bool {
        self.value.is_none()
    }

    /// Runtime type of the held verb.
    pub fn verb_type(&self) -> Option<TypeId> {
        self.value.as_ref().map(|v| (**v).type_id())
    }

    /// Readable type name of the held verb.
    pub fn type_name(&self) -> Option<String> {
        self.type_name.map(readable)
    }

    pub fn is<V: Any>(&self) -> bool {
        self.value.as_ref().is_some_and(|v| v.is::<V>())
    }

    pub fn downcast_ref<V: Any>(&self) -> Option<&V> {
        self.value.as_ref()?.downcast_ref::<V>()
    }

    pub fn downcast<V: Any + Send + Sync>(&self) -> Option<Arc<V>> {
        self.value.clone()?.downcast::<V>().ok()
    }
}

impl fmt::Debug for AnyVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.type_name() {
            Some(name) => f.debug_tuple("AnyVerb").field(&name).finish(),
            None => f.write_str("AnyVerb(None)"),
        }
    }
}

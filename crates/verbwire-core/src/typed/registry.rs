//! VerbRegistry - verb descriptors and their handlers
//!
//! Descriptors are kept in registration order and looked up by exact type
//! identity. A verb type or verb name can be registered only once; the
//! registry rejects the second registration instead of letting one silently
//! shadow the other.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::handler::{DynHandler, Handler, TypedHandler};
use super::verb::{Upcast, Verb, VerbShape, VerbValue};
use crate::domain::readable_type_name;

/// RegistryError は VerbRegistry の操作エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("verb type {0} is already registered")]
    AlreadyRegistered(String),

    #[error("verb name '{0}' is already used by another verb type")]
    DuplicateVerbName(String),

    #[error("verb type {0} is not registered. Register it before declaring its base types")]
    NotRegistered(String),

    #[error("options type {0} is already registered; only one single command options type is supported")]
    OptionsAlreadyRegistered(String),
}

/// Casts an erased verb to the base `B`. Stored type-erased per base.
struct Caster<B: ?Sized + 'static> {
    cast: fn(VerbValue) -> Option<Arc<B>>,
}

fn cast_to_base<V, B>(value: VerbValue) -> Option<Arc<B>>
where
    V: Upcast<B>,
    B: ?Sized + 'static,
{
    value.downcast::<V>().ok().map(<V as Upcast<B>>::upcast)
}

/// VerbDescriptor pairs a verb shape with its optional handler.
pub struct VerbDescriptor {
    shape: VerbShape,
    handler: Option<Arc<dyn DynHandler>>,
    upcasts: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl VerbDescriptor {
    fn new<V: Verb>(handler: Option<Arc<dyn DynHandler>>) -> Self {
        let mut descriptor = Self {
            shape: VerbShape::of_verb::<V>(),
            handler,
            upcasts: HashMap::new(),
        };
        descriptor.add_upcast::<V, dyn Any + Send + Sync>();
        descriptor
    }

    fn add_upcast<V, B>(&mut self)
    where
        V: Upcast<B>,
        B: ?Sized + 'static,
    {
        let caster = Caster::<B> {
            cast: cast_to_base::<V, B>,
        };
        self.upcasts.insert(TypeId::of::<B>(), Box::new(caster));
    }

    pub fn shape(&self) -> &VerbShape {
        &self.shape
    }

    pub fn verb_type(&self) -> TypeId {
        self.shape.type_id()
    }

    pub fn handler(&self) -> Option<&Arc<dyn DynHandler>> {
        self.handler.as_ref()
    }

    pub fn handler_type(&self) -> Option<String> {
        self.handler.as_ref().map(|h| h.handler_type())
    }

    /// Whether this verb was declared to implement the base `B`.
    pub fn implements<B: ?Sized + 'static>(&self) -> bool {
        self.upcasts.contains_key(&TypeId::of::<B>())
    }

    /// Views `value` as `B`. `None` when the verb does not implement `B` or
    /// `value` is not this descriptor's verb.
    pub fn upcast<B: ?Sized + 'static>(&self, value: VerbValue) -> Option<Arc<B>> {
        let caster = self
            .upcasts
            .get(&TypeId::of::<B>())?
            .downcast_ref::<Caster<B>>()?;
        (caster.cast)(value)
    }
}

impl fmt::Debug for VerbDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerbDescriptor")
            .field("shape", &self.shape)
            .field("handler", &self.handler_type())
            .finish()
    }
}

/// VerbRegistry は verb の descriptor を登録・管理
///
/// # 使用例
/// ```ignore
/// let mut registry = VerbRegistry::new();
/// registry.register_verb_with_handler::<AddVerb, _>(AddHandler)?;
/// registry.register_verb::<ListVerb>()?;
/// registry.register_upcast::<AddVerb, dyn TodoVerb>()?;
///
/// let descriptor = registry.lookup(TypeId::of::<AddVerb>());
/// ```
#[derive(Default)]
pub struct VerbRegistry {
    descriptors: Vec<VerbDescriptor>,
}

impl VerbRegistry {
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// Registers a verb without a handler. Selecting it later fails the run
    /// with `RunError::NoHandler`.
    pub fn register_verb<V: Verb>(&mut self) -> Result<(), RegistryError> {
        self.register::<V>(None)
    }

    pub fn register_verb_with_handler<V, H>(&mut self, handler: H) -> Result<(), RegistryError>
    where
        V: Verb,
        H: Handler<V> + 'static,
    {
        self.register_verb_with_shared_handler::<V, H>(Arc::new(handler))
    }

    pub fn register_verb_with_shared_handler<V, H>(
        &mut self,
        handler: Arc<H>,
    ) -> Result<(), RegistryError>
    where
        V: Verb,
        H: Handler<V> + 'static,
    {
        let handler: Arc<dyn DynHandler> = Arc::new(TypedHandler::<V, H>::shared(handler));
        self.register::<V>(Some(handler))
    }

    fn register<V: Verb>(&mut self, handler: Option<Arc<dyn DynHandler>>) -> Result<(), RegistryError> {
        if self.lookup(TypeId::of::<V>()).is_some() {
            return Err(RegistryError::AlreadyRegistered(readable_type_name::<V>()));
        }
        if self.lookup_name(V::NAME).is_some() {
            return Err(RegistryError::DuplicateVerbName(V::NAME.to_string()));
        }
        self.descriptors.push(VerbDescriptor::new::<V>(handler));
        Ok(())
    }

    /// Declares that the registered verb `V` can be viewed as `B`.
    pub fn register_upcast<V, B>(&mut self) -> Result<(), RegistryError>
    where
        V: Upcast<B>,
        B: ?Sized + 'static,
    {
        let descriptor = self
            .descriptors
            .iter_mut()
            .find(|d| d.verb_type() == TypeId::of::<V>())
            .ok_or_else(|| RegistryError::NotRegistered(readable_type_name::<V>()))?;
        descriptor.add_upcast::<V, B>();
        Ok(())
    }

    /// Shapes of every registered verb, in registration order.
    pub fn all_shapes(&self) -> Vec<&VerbShape> {
        self.descriptors.iter().map(VerbDescriptor::shape).collect()
    }

    /// Exact type match only.
    pub fn lookup(&self, verb_type: TypeId) -> Option<&VerbDescriptor> {
        self.descriptors.iter().find(|d| d.verb_type() == verb_type)
    }

    pub fn lookup_name(&self, verb_name: &str) -> Option<&VerbDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.shape().verb_name() == Some(verb_name))
    }

    /// Rejects verb names that differ only in ASCII case. Needed when the
    /// parser matches verbs case-insensitively, where the later verb could
    /// never be selected.
    pub fn check_names_ignoring_case(&self) -> Result<(), RegistryError> {
        let names = self.registered_verbs();
        for (i, name) in names.iter().enumerate() {
            if names[..i].iter().any(|earlier| earlier.eq_ignore_ascii_case(name)) {
                return Err(RegistryError::DuplicateVerbName(name.to_string()));
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &VerbDescriptor> {
        self.descriptors.iter()
    }

    pub fn registered_verbs(&self) -> Vec<&'static str> {
        self.descriptors
            .iter()
            .filter_map(|d| d.shape().verb_name())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl fmt::Debug for VerbRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.descriptors.iter()).finish()
    }
}

//! Handler trait - executes one options or verb value
//!
//! # Two layers
//! - `Handler<V>`: what applications implement, typed per verb.
//! - `DynHandler`: object-safe, takes the erased `VerbValue`.
//!
//! `TypedHandler<V, H>` bridges the two. It is built at registration time,
//! when `V` and `H` are both known, so dispatch never has to look anything
//! up by name.

use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use super::verb::VerbValue;
use crate::domain::{HandlerError, RunError, readable_type_name};

/// Handler executes a parsed verb.
///
/// # Example
/// ```ignore
/// struct AddHandler;
///
/// #[async_trait]
/// impl Handler<AddVerb> for AddHandler {
///     async fn execute(&self, verb: &AddVerb) -> Result<(), HandlerError> {
///         println!("adding {}", verb.todo_id);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<V: Send + Sync + 'static>: Send + Sync {
    async fn execute(&self, verb: &V) -> Result<(), HandlerError>;
}

/// DynHandler is the erased form stored in the registry.
#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn execute_dyn(&self, verb: VerbValue) -> Result<(), RunError>;

    /// Type of verb this handler accepts.
    fn verb_type(&self) -> TypeId;

    /// Readable name of the handler type, for diagnostics.
    fn handler_type(&self) -> String;

    /// The wrapped handler as a boxed `Arc<dyn Handler<V>>`, for callers
    /// that hold a concrete `&V`.
    fn typed_handler(&self) -> Box<dyn Any + Send + Sync>;
}

pub struct TypedHandler<V, H> {
    handler: Arc<H>,
    _marker: PhantomData<fn(V)>,
}

impl<V, H> TypedHandler<V, H>
where
    V: Send + Sync + 'static,
    H: Handler<V> + 'static,
{
    pub fn new(handler: H) -> Self {
        Self::shared(Arc::new(handler))
    }

    /// Wraps a handler that is also held elsewhere, e.g. by a runner.
    pub fn shared(handler: Arc<H>) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }

    pub fn inner(&self) -> &Arc<H> {
        &self.handler
    }
}

#[async_trait]
impl<V, H> DynHandler for TypedHandler<V, H>
where
    V: Send + Sync + 'static,
    H: Handler<V> + 'static,
{
    async fn execute_dyn(&self, verb: VerbValue) -> Result<(), RunError> {
        let verb = verb
            .downcast::<V>()
            .map_err(|_| RunError::HandlerMismatch {
                handler: self.handler_type(),
                expected: readable_type_name::<V>(),
            })?;
        self.handler
            .execute(&verb)
            .await
            .map_err(RunError::Handler)
    }

    fn verb_type(&self) -> TypeId {
        TypeId::of::<V>()
    }

    fn handler_type(&self) -> String {
        readable_type_name::<H>()
    }

    fn typed_handler(&self) -> Box<dyn Any + Send + Sync> {
        let handler: Arc<dyn Handler<V>> = self.handler.clone();
        Box::new(handler)
    }
}

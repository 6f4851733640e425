//! Typed - 型付き verb API
//!
//! Verb と Handler の対応付けを登録時に静的に保証します。
//!
//! # 二層構造
//! - **表層（Typed）**: `Verb`, `Options`, `Handler<V>` - 型安全
//! - **内部（Dyn）**: `VerbValue`, `DynHandler`, `AnyVerb` - type erasure

pub mod any_verb;
pub mod handler;
pub mod registry;
pub mod verb;

pub use self::any_verb::AnyVerb;
pub use self::handler::{DynHandler, Handler, TypedHandler};
pub use self::registry::{RegistryError, VerbDescriptor, VerbRegistry};
pub use self::verb::{Options, Upcast, Verb, VerbShape, VerbValue};

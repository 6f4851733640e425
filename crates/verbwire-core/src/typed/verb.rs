//! Verb and options shapes
//!
//! A *shape* is everything the parser needs to know about one options or
//! verb type: its identity, its verb name and how to build it from clap
//! matches. Shapes are captured from the concrete type at registration time,
//! so nothing downstream needs to know the type again.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use clap::{ArgMatches, Args, Command, FromArgMatches, Parser};

use crate::domain::readable;

/// A parsed value whose concrete type is only known to its shape.
pub type VerbValue = Arc<dyn Any + Send + Sync>;

/// Verb binds a clap argument group to the verb name that selects it.
///
/// # Example
/// ```ignore
/// #[derive(Debug, clap::Args)]
/// struct AddVerb {
///     #[arg(short = 't', long = "todo", required = true)]
///     todo_id: String,
/// }
///
/// impl Verb for AddVerb {
///     const NAME: &'static str = "add";
///     const ABOUT: Option<&'static str> = Some("Add a new TODO item");
/// }
/// ```
pub trait Verb: Args + Send + Sync + 'static {
    /// Token that selects this verb, e.g. `"add"` in `app add -t 1`.
    const NAME: &'static str;

    /// One line shown next to the verb in the help overview.
    const ABOUT: Option<&'static str> = None;
}

/// Options is a single command shape without a verb name.
///
/// Implemented for every `clap::Parser` type.
pub trait Options: Parser + Send + Sync + 'static {}

impl<T: Parser + Send + Sync + 'static> Options for T {}

/// Upcast views a verb through a common base, usually a trait object.
///
/// Rust has no class hierarchy to cast through, so the relation between a
/// verb and a base is declared with this trait and recorded with
/// `AppBuilder::upcast::<V, B>()`.
///
/// ```ignore
/// trait CustomVerbBase: Send + Sync {
///     fn file_path(&self) -> &str;
/// }
///
/// impl Upcast<dyn CustomVerbBase> for Verb1 {
///     fn upcast(self: Arc<Self>) -> Arc<dyn CustomVerbBase> {
///         self
///     }
/// }
/// ```
pub trait Upcast<B: ?Sized + 'static>: Verb {
    fn upcast(self: Arc<Self>) -> Arc<B>;
}

/// Every verb can be seen as the top type.
impl<V: Verb> Upcast<dyn Any + Send + Sync> for V {
    fn upcast(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// VerbShape describes one options or verb type to the parser.
#[derive(Clone)]
pub struct VerbShape {
    type_id: TypeId,
    type_name: &'static str,
    verb_name: Option<&'static str>,
    command: fn() -> Command,
    build: fn(&mut ArgMatches) -> Result<VerbValue, clap::Error>,
}

impl VerbShape {
    /// Shape of a single command options type. It has no verb name.
    pub fn of_options<O: Options>() -> Self {
        Self {
            type_id: TypeId::of::<O>(),
            type_name: std::any::type_name::<O>(),
            verb_name: None,
            command: O::command,
            build: build_value::<O>,
        }
    }

    /// Shape of a verb type, selected by `V::NAME`.
    pub fn of_verb<V: Verb>() -> Self {
        Self {
            type_id: TypeId::of::<V>(),
            type_name: std::any::type_name::<V>(),
            verb_name: Some(V::NAME),
            command: verb_command::<V>,
            build: build_value::<V>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Readable name of the concrete type, without module paths.
    pub fn type_name(&self) -> String {
        readable(self.type_name)
    }

    pub(crate) fn full_type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn verb_name(&self) -> Option<&'static str> {
        self.verb_name
    }

    pub fn is_verb(&self) -> bool {
        self.verb_name.is_some()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// clap command describing the shape's arguments.
    pub fn command(&self) -> Command {
        (self.command)()
    }

    /// Builds the concrete value from matches produced by `command()`.
    pub fn build(&self, matches: &mut ArgMatches) -> Result<VerbValue, clap::Error> {
        (self.build)(matches)
    }
}

impl fmt::Debug for VerbShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerbShape")
            .field("type_name", &self.type_name)
            .field("verb_name", &self.verb_name)
            .finish()
    }
}

fn verb_command<V: Verb>() -> Command {
    let command = V::augment_args(Command::new(V::NAME));
    match V::ABOUT {
        Some(about) => command.about(about),
        None => command,
    }
}

fn build_value<T>(matches: &mut ArgMatches) -> Result<VerbValue, clap::Error>
where
    T: FromArgMatches + Send + Sync + 'static,
{
    let value: VerbValue = Arc::new(T::from_arg_matches_mut(matches)?);
    Ok(value)
}

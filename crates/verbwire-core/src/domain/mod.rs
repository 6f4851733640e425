//! Domain model: the argument vector, the error taxonomy and readable type
//! names used in diagnostics.

pub mod arguments;
pub mod errors;
pub mod type_name;

pub use self::arguments::CommandLineArguments;
pub use self::errors::{HandlerError, LookupError, ParseFailure, RunError};
pub use self::type_name::{readable, readable_type_name};

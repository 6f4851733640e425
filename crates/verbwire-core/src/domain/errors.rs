//! Errors - parse failures and run failures
//!
//! Two layers:
//! - **ParseFailure**: expected, recoverable. The parser turns bad input into
//!   an absent value and keeps the failure around for diagnostics.
//! - **RunError**: fatal at the runner layer. Aborts the run before (or
//!   instead of) any handler completing.

use thiserror::Error;

/// Error type handlers return. Any error that is `Send + Sync` fits.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why no value could be produced from the argument vector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("no command line arguments were supplied")]
    NoArguments,

    #[error("'{0}' is not a known verb")]
    UnknownVerb(String),

    #[error("invalid arguments for {shape}: {message}")]
    Invalid { shape: String, message: String },

    /// Help or version output was requested instead of a command.
    #[error("{0}")]
    Help(String),
}

/// RunError aborts a command line run.
///
/// Every variant names the offending type and, where one exists, the
/// registration call that fixes it.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("command line arguments are not valid: {reason}")]
    ArgumentsInvalid { reason: ParseFailure },

    #[error(
        "verb {verb} is not of the expected base type {expected}. \
         Try registering it with upcast::<{verb}, {expected}>()"
    )]
    VerbTypeMismatch { verb: String, expected: String },

    #[error(
        "unregistered verb type {verb}. \
         Try using verb_with_handler::<{verb}, MyCommandLineVerbHandler>()"
    )]
    UnregisteredVerb { verb: String },

    #[error(
        "no command line verb handler specified for verb {verb}. \
         Try using verb_with_handler::<{verb}, MyCommandLineVerbHandler>() instead of verb::<{verb}>()"
    )]
    NoHandler { verb: String },

    #[error(
        "command line handler {handler} only executes {expected}; \
         the selected verb is a different type"
    )]
    HandlerMismatch { handler: String, expected: String },

    #[error("command line handler failed: {0}")]
    Handler(#[source] HandlerError),

    #[error("command line wiring error: {0}")]
    Lookup(#[from] LookupError),
}

/// LookupError is returned by the required lookups on `App`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// Asked for a type the app was never told about. A wiring bug.
    #[error("{0} is not registered with the command line app")]
    NotRegistered(String),

    #[error("{shape} could not be resolved from the command line: {reason}")]
    NotParsed { shape: String, reason: ParseFailure },

    #[error("verb {requested} was not selected on the command line; {selected} was")]
    NotSelected { requested: String, selected: String },

    #[error("verb {verb} is not of the requested base type {expected}")]
    NotOfBase { verb: String, expected: String },
}

impl RunError {
    pub fn arguments_invalid(reason: ParseFailure) -> Self {
        Self::ArgumentsInvalid { reason }
    }

    /// True when the run failed because of the user's input rather than the
    /// wiring or the handler.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Self::ArgumentsInvalid { .. })
    }

    /// True when the user asked for help or version output.
    pub fn is_help(&self) -> bool {
        matches!(
            self,
            Self::ArgumentsInvalid {
                reason: ParseFailure::Help(_)
            }
        )
    }
}

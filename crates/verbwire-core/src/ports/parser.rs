//! ArgumentParser port - raw tokens to one concrete shape
//!
//! The parsing engine is a black box to the rest of the crate. `App` only
//! talks to it through this trait, which keeps the clap adapter swappable
//! and lets tests count how often parsing actually happens.

use std::any::TypeId;

use crate::domain::ParseFailure;
use crate::typed::{VerbShape, VerbValue};

/// ArgumentParser populates options and verb shapes from argument tokens.
///
/// Both operations are pure: bad input is reported as a `ParseFailure`,
/// never as a panic.
pub trait ArgumentParser: Send + Sync {
    /// Populates one shape.
    ///
    /// Fails with `NoArguments` when `args` is empty. For a verb shape the
    /// first token must be the verb's name.
    fn parse_single(&self, shape: &VerbShape, args: &[String]) -> Result<VerbValue, ParseFailure>;

    /// Selects the shape whose verb name equals the first token, then parses
    /// the remaining tokens into it.
    ///
    /// A selection whose fields fail to parse is discarded as a whole.
    fn parse_multi(
        &self,
        shapes: &[&VerbShape],
        args: &[String],
    ) -> Result<(VerbValue, TypeId), ParseFailure>;
}

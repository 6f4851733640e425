//! Command line arguments captured for one process run.

use std::fmt;

/// The raw argument vector, without the program name.
///
/// Built once by the composition root and read by every parse. There is no
/// way to mutate it after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLineArguments {
    values: Vec<String>,
}

impl CommandLineArguments {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Arguments of the current process, skipping `argv[0]`.
    pub fn from_env() -> Self {
        Self::new(std::env::args().skip(1))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.values
    }

    pub fn first(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<String>> for CommandLineArguments {
    fn from(values: Vec<String>) -> Self {
        Self { values }
    }
}

impl From<&[&str]> for CommandLineArguments {
    fn from(values: &[&str]) -> Self {
        Self::new(values.iter().copied())
    }
}

impl fmt::Display for CommandLineArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.values.join(" "))
    }
}

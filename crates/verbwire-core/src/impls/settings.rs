//! ParserSettings - how the clap adapter reads the command line

use serde::{Deserialize, Serialize};

/// Settings for `ClapParser`.
///
/// Every field has a default, so a partial JSON/TOML table is enough:
///
/// ```ignore
/// let settings: ParserSettings = serde_json::from_str(r#"{"program_name": "todo"}"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    /// Shown in usage lines and help output.
    pub program_name: String,

    /// Answered to `version` / `--version` when set.
    pub version: Option<String>,

    /// When false, `ADD` selects the verb named `add`.
    pub case_sensitive_verbs: bool,
}

impl ParserSettings {
    pub fn for_program(program_name: impl Into<String>) -> Self {
        Self {
            program_name: program_name.into(),
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn case_insensitive_verbs(mut self) -> Self {
        self.case_sensitive_verbs = false;
        self
    }
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            program_name: "app".to_string(),
            version: None,
            case_sensitive_verbs: true,
        }
    }
}

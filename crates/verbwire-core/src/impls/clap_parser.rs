//! ClapParser - ArgumentParser backed by clap
//!
//! Options shapes are parsed as a whole command. Verb shapes are selected by
//! the first token and parsed from the tokens after it. `help`, `--help` and
//! `-h` in verb position render an overview of every candidate verb;
//! `help <verb>` renders that verb's own help.

use std::any::TypeId;

use clap::Command;
use clap::error::ErrorKind;

use super::settings::ParserSettings;
use crate::domain::ParseFailure;
use crate::ports::ArgumentParser;
use crate::typed::{VerbShape, VerbValue};

const HELP_TOKENS: [&str; 3] = ["help", "--help", "-h"];
const VERSION_TOKENS: [&str; 2] = ["version", "--version"];

#[derive(Debug, Clone, Default)]
pub struct ClapParser {
    settings: ParserSettings,
}

impl ClapParser {
    pub fn new(settings: ParserSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    fn select<'a>(&self, shapes: &[&'a VerbShape], token: &str) -> Option<&'a VerbShape> {
        shapes.iter().copied().find(|shape| match shape.verb_name() {
            Some(name) if self.settings.case_sensitive_verbs => name == token,
            Some(name) => name.eq_ignore_ascii_case(token),
            None => false,
        })
    }

    fn bin_name(&self, shape: &VerbShape) -> String {
        match shape.verb_name() {
            Some(verb) => format!("{} {}", self.settings.program_name, verb),
            None => self.settings.program_name.clone(),
        }
    }

    fn command_for(&self, shape: &VerbShape) -> Command {
        shape
            .command()
            .no_binary_name(true)
            .bin_name(self.bin_name(shape))
    }

    /// Help text listing every candidate verb.
    fn overview(&self, shapes: &[&VerbShape]) -> String {
        let mut root = Command::new("verbs")
            .bin_name(self.settings.program_name.clone())
            .subcommand_required(true)
            .subcommands(shapes.iter().map(|shape| shape.command()));
        root.render_help().to_string()
    }

    /// Answers `help`, `help <verb>` and `version` in verb position.
    fn meta_request(&self, shapes: &[&VerbShape], args: &[String]) -> Option<ParseFailure> {
        let first = args.first()?.as_str();
        if HELP_TOKENS.contains(&first) {
            let text = match args.get(1).and_then(|verb| self.select(shapes, verb)) {
                Some(shape) => self.command_for(shape).render_help().to_string(),
                None => self.overview(shapes),
            };
            return Some(ParseFailure::Help(text));
        }
        if VERSION_TOKENS.contains(&first) {
            let version = self.settings.version.as_ref()?;
            return Some(ParseFailure::Help(format!(
                "{} {}",
                self.settings.program_name, version
            )));
        }
        None
    }

    fn parse_tokens(&self, shape: &VerbShape, tokens: &[String]) -> Result<VerbValue, ParseFailure> {
        let mut matches = self
            .command_for(shape)
            .try_get_matches_from(tokens)
            .map_err(|err| self.failure(shape, err))?;
        shape
            .build(&mut matches)
            .map_err(|err| self.failure(shape, err))
    }

    fn failure(&self, shape: &VerbShape, err: clap::Error) -> ParseFailure {
        let rendered = err.to_string();
        let failure = match err.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                ParseFailure::Help(rendered.trim_end().to_string())
            }
            _ => ParseFailure::Invalid {
                shape: shape.type_name(),
                message: rendered
                    .trim()
                    .trim_start_matches("error: ")
                    .to_string(),
            },
        };
        tracing::debug!(shape = %shape.type_name(), kind = ?err.kind(), "command line not parsed");
        failure
    }
}

impl ArgumentParser for ClapParser {
    fn parse_single(&self, shape: &VerbShape, args: &[String]) -> Result<VerbValue, ParseFailure> {
        if args.is_empty() {
            return Err(ParseFailure::NoArguments);
        }
        if shape.is_verb() {
            return self.parse_multi(&[shape], args).map(|(value, _)| value);
        }
        self.parse_tokens(shape, args)
    }

    fn parse_multi(
        &self,
        shapes: &[&VerbShape],
        args: &[String],
    ) -> Result<(VerbValue, TypeId), ParseFailure> {
        let Some(first) = args.first() else {
            return Err(ParseFailure::NoArguments);
        };

        let Some(shape) = self.select(shapes, first) else {
            if let Some(meta) = self.meta_request(shapes, args) {
                return Err(meta);
            }
            tracing::debug!(token = %first, "no verb matches the first token");
            return Err(ParseFailure::UnknownVerb(first.clone()));
        };

        let value = self.parse_tokens(shape, &args[1..])?;
        tracing::debug!(verb = shape.verb_name().unwrap_or_default(), "verb selected");
        Ok((value, shape.type_id()))
    }
}

//! ParseSession - the memoized parse result for one run
//!
//! Every view of the command line (typed options lookup, typed verb lookup,
//! `AnyVerb`, base lookup, runners) reads from the same session. Each parse
//! happens at most once; later reads see the cached result, including a
//! cached failure.

use std::any::{Any, TypeId};
use std::sync::{Arc, OnceLock};

use crate::domain::{CommandLineArguments, LookupError, ParseFailure, readable_type_name};
use crate::ports::ArgumentParser;
use crate::typed::{AnyVerb, DynHandler, VerbRegistry, VerbShape, VerbValue};

/// The single command options shape, if one was registered.
pub(crate) struct OptionsSlot {
    pub(crate) shape: VerbShape,
    pub(crate) handler: Option<Arc<dyn DynHandler>>,
    resolved: OnceLock<Result<VerbValue, ParseFailure>>,
}

impl OptionsSlot {
    pub(crate) fn new(shape: VerbShape, handler: Option<Arc<dyn DynHandler>>) -> Self {
        Self {
            shape,
            handler,
            resolved: OnceLock::new(),
        }
    }
}

struct ResolvedVerb {
    any: AnyVerb,
    failure: Option<ParseFailure>,
}

pub struct ParseSession {
    arguments: CommandLineArguments,
    parser: Arc<dyn ArgumentParser>,
    registry: VerbRegistry,
    options: Option<OptionsSlot>,
    verb: OnceLock<ResolvedVerb>,
}

impl ParseSession {
    pub(crate) fn new(
        arguments: CommandLineArguments,
        parser: Arc<dyn ArgumentParser>,
        registry: VerbRegistry,
        options: Option<OptionsSlot>,
    ) -> Self {
        Self {
            arguments,
            parser,
            registry,
            options,
            verb: OnceLock::new(),
        }
    }

    pub fn arguments(&self) -> &CommandLineArguments {
        &self.arguments
    }

    pub fn registry(&self) -> &VerbRegistry {
        &self.registry
    }

    pub(crate) fn options_slot(&self) -> Option<&OptionsSlot> {
        self.options.as_ref()
    }

    /// Parsed options of type `O`.
    pub fn require_options<O: Any + Send + Sync>(&self) -> Result<Arc<O>, LookupError> {
        let slot = self
            .options
            .as_ref()
            .filter(|slot| slot.shape.is::<O>())
            .ok_or_else(|| LookupError::NotRegistered(readable_type_name::<O>()))?;

        let resolved = slot.resolved.get_or_init(|| {
            let result = self
                .parser
                .parse_single(&slot.shape, self.arguments.as_slice());
            if let Err(failure) = &result {
                tracing::debug!(shape = %slot.shape.type_name(), %failure, "options not resolved");
            }
            result
        });

        match resolved {
            Ok(value) => value
                .clone()
                .downcast::<O>()
                .map_err(|_| LookupError::NotRegistered(readable_type_name::<O>())),
            Err(reason) => Err(LookupError::NotParsed {
                shape: slot.shape.type_name(),
                reason: reason.clone(),
            }),
        }
    }

    fn resolve_verb(&self) -> &ResolvedVerb {
        self.verb.get_or_init(|| {
            let shapes = self.registry.all_shapes();
            let parsed = self
                .parser
                .parse_multi(&shapes, self.arguments.as_slice());

            match parsed {
                Ok((value, verb_type)) => match self.registry.lookup(verb_type) {
                    Some(descriptor) => ResolvedVerb {
                        any: AnyVerb::new(value, descriptor.shape()),
                        failure: None,
                    },
                    None => {
                        tracing::error!(?verb_type, "parser returned a verb that is not registered");
                        ResolvedVerb {
                            any: AnyVerb::empty(),
                            failure: Some(ParseFailure::UnknownVerb(selected_token(
                                &self.arguments,
                            ))),
                        }
                    }
                },
                Err(failure) => {
                    tracing::debug!(%failure, "no verb resolved");
                    ResolvedVerb {
                        any: AnyVerb::empty(),
                        failure: Some(failure),
                    }
                }
            }
        })
    }

    /// Whichever verb the command line selected.
    pub fn any_verb(&self) -> &AnyVerb {
        &self.resolve_verb().any
    }

    /// Why `any_verb()` is empty.
    pub fn verb_failure(&self) -> Option<&ParseFailure> {
        self.resolve_verb().failure.as_ref()
    }

    pub fn require_verb<V: Any + Send + Sync>(&self) -> Result<Arc<V>, LookupError> {
        if self.registry.lookup(TypeId::of::<V>()).is_none() {
            return Err(LookupError::NotRegistered(readable_type_name::<V>()));
        }
        let any = self.any_verb();
        if let Some(verb) = any.downcast::<V>() {
            return Ok(verb);
        }
        match self.verb_failure() {
            Some(reason) => Err(LookupError::NotParsed {
                shape: readable_type_name::<V>(),
                reason: reason.clone(),
            }),
            None => Err(LookupError::NotSelected {
                requested: readable_type_name::<V>(),
                selected: any.type_name().unwrap_or_default(),
            }),
        }
    }

    /// The selected verb viewed through the base `B`.
    pub fn require_base<B: ?Sized + 'static>(&self) -> Result<Arc<B>, LookupError> {
        let any = self.any_verb();
        let Some(value) = any.value() else {
            return Err(LookupError::NotParsed {
                shape: readable_type_name::<B>(),
                reason: self
                    .verb_failure()
                    .cloned()
                    .unwrap_or(ParseFailure::NoArguments),
            });
        };

        self.registry
            .lookup((**value).type_id())
            .and_then(|descriptor| descriptor.upcast::<B>(value.clone()))
            .ok_or_else(|| LookupError::NotOfBase {
                verb: any.type_name().unwrap_or_default(),
                expected: readable_type_name::<B>(),
            })
    }
}

fn selected_token(arguments: &CommandLineArguments) -> String {
    arguments.first().unwrap_or_default().to_string()
}

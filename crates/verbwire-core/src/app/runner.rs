//! Runners - the uniform entry point that drives one handler
//!
//! # Variants
//! - **CommandRunner<O>**: one options type, one handler.
//! - **VerbBaseRunner<B>**: several verbs; the selected verb must be
//!   viewable as `B` and is dispatched to the handler registered for its
//!   exact type.
//!
//! Both fail fast. A missing parse result never reaches a handler.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use super::session::ParseSession;
use crate::domain::{LookupError, ParseFailure, RunError, readable_type_name};
use crate::typed::{AnyVerb, Handler, Options};

/// CommandLineRunner runs whatever the command line selected.
#[async_trait]
pub trait CommandLineRunner: Send + Sync {
    async fn run(&self) -> Result<(), RunError>;
}

/// Help and version requests are not failures, so they stay out of the
/// error log.
fn arguments_invalid(reason: ParseFailure) -> RunError {
    match &reason {
        ParseFailure::Help(_) => tracing::debug!("help requested"),
        _ => tracing::error!(%reason, "command line arguments are not valid"),
    }
    RunError::arguments_invalid(reason)
}

/// CommandRunner passes the parsed options to the single handler.
pub struct CommandRunner<O: Options> {
    session: Arc<ParseSession>,
    handler: Arc<dyn Handler<O>>,
}

impl<O: Options> CommandRunner<O> {
    pub fn new(session: Arc<ParseSession>, handler: Arc<dyn Handler<O>>) -> Self {
        Self { session, handler }
    }
}

#[async_trait]
impl<O: Options> CommandLineRunner for CommandRunner<O> {
    async fn run(&self) -> Result<(), RunError> {
        let options = match self.session.require_options::<O>() {
            Ok(options) => options,
            Err(LookupError::NotParsed { reason, .. }) => return Err(arguments_invalid(reason)),
            Err(err) => return Err(err.into()),
        };

        tracing::debug!(options = %readable_type_name::<O>(), "executing command line handler");
        self.handler
            .execute(&options)
            .await
            .map_err(RunError::Handler)
    }
}

/// VerbBaseRunner dispatches the selected verb by its exact runtime type.
pub struct VerbBaseRunner<B: ?Sized + 'static> {
    session: Arc<ParseSession>,
    _base: PhantomData<fn() -> Arc<B>>,
}

impl<B: ?Sized + 'static> VerbBaseRunner<B> {
    pub fn new(session: Arc<ParseSession>) -> Self {
        Self {
            session,
            _base: PhantomData,
        }
    }

    fn check_base(&self) -> Result<(), RunError> {
        match self.session.require_base::<B>() {
            Ok(_) => Ok(()),
            Err(LookupError::NotOfBase { verb, expected }) => {
                tracing::error!(%verb, %expected, "verb is not of the expected base type");
                Err(RunError::VerbTypeMismatch { verb, expected })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Finds the descriptor registered for the verb's exact type and awaits
    /// its handler.
    pub async fn execute(&self, verb: &AnyVerb) -> Result<(), RunError> {
        let (Some(value), Some(verb_type)) = (verb.value(), verb.verb_type()) else {
            return Err(RunError::arguments_invalid(ParseFailure::NoArguments));
        };
        let verb_name = verb.type_name().unwrap_or_default();

        let Some(descriptor) = self.session.registry().lookup(verb_type) else {
            tracing::error!(
                verb = %verb_name,
                "Unregistered verb type. Try using verb_with_handler::<{verb_name}, MyCommandLineVerbHandler>()"
            );
            return Err(RunError::UnregisteredVerb { verb: verb_name });
        };

        let Some(handler) = descriptor.handler() else {
            tracing::error!(
                verb = %verb_name,
                "No command line verb handler specified for verb. Try using verb_with_handler::<{verb_name}, MyCommandLineVerbHandler>() instead of verb::<{verb_name}>()"
            );
            return Err(RunError::NoHandler { verb: verb_name });
        };

        tracing::debug!(verb = %verb_name, handler = %handler.handler_type(), "executing command line verb handler");
        let result = handler.execute_dyn(value.clone()).await;
        if let Err(RunError::HandlerMismatch { handler, expected }) = &result {
            tracing::error!(%handler, %expected, verb = %verb_name, "command line verb handler cannot execute the selected verb");
        }
        result
    }
}

#[async_trait]
impl<B: ?Sized + 'static> CommandLineRunner for VerbBaseRunner<B> {
    async fn run(&self) -> Result<(), RunError> {
        let verb = self.session.any_verb();
        if verb.is_none() {
            let reason = self
                .session
                .verb_failure()
                .cloned()
                .unwrap_or(ParseFailure::NoArguments);
            return Err(arguments_invalid(reason));
        }

        self.check_base()?;
        self.execute(verb).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CommandLineArguments;
    use crate::impls::ClapParser;
    use crate::typed::handler::fixtures::{Recorder, RecordingHandler};
    use crate::typed::verb::fixtures::{CustomVerbBase, SimpleOptions, UnrelatedBase, Verb1, Verb2};
    use crate::typed::{VerbRegistry, VerbShape};

    use super::super::session::OptionsSlot;

    /// Collects formatted log lines for assertions on their level.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn install(&self) -> tracing::subscriber::DefaultGuard {
            let writer = self.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::DEBUG)
                .finish();
            tracing::subscriber::set_default(subscriber)
        }

        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[derive(Debug, clap::Args)]
    struct StrayVerb {}

    impl crate::typed::Verb for StrayVerb {
        const NAME: &'static str = "stray";
    }

    fn session(tokens: &[&str], registry: VerbRegistry, options: Option<OptionsSlot>) -> Arc<ParseSession> {
        Arc::new(ParseSession::new(
            CommandLineArguments::new(tokens.iter().copied()),
            Arc::new(ClapParser::default()),
            registry,
            options,
        ))
    }

    fn verbs(recorder: &Arc<Recorder>) -> VerbRegistry {
        let mut registry = VerbRegistry::new();
        registry
            .register_verb_with_handler::<Verb1, _>(RecordingHandler::new(recorder.clone(), "h1"))
            .unwrap();
        registry.register_verb::<Verb2>().unwrap();
        registry
            .register_upcast::<Verb1, dyn CustomVerbBase>()
            .unwrap();
        registry
            .register_upcast::<Verb2, dyn CustomVerbBase>()
            .unwrap();
        registry
    }

    fn command_runner(tokens: &[&str], recorder: &Arc<Recorder>) -> CommandRunner<SimpleOptions> {
        let slot = OptionsSlot::new(VerbShape::of_options::<SimpleOptions>(), None);
        let handler: Arc<dyn Handler<SimpleOptions>> =
            Arc::new(RecordingHandler::new(recorder.clone(), "simple"));
        CommandRunner::new(session(tokens, VerbRegistry::new(), Some(slot)), handler)
    }

    #[tokio::test]
    async fn command_runner_executes_handler_once() {
        let recorder = Arc::new(Recorder::default());
        let runner = command_runner(&["-p", "test.txt"], &recorder);

        runner.run().await.unwrap();

        assert_eq!(recorder.messages(), vec!["simple:test.txt".to_string()]);
    }

    #[tokio::test]
    async fn command_runner_fails_fast_on_invalid_arguments() {
        for tokens in [&[][..], &["-d"][..]] {
            let recorder = Arc::new(Recorder::default());
            let runner = command_runner(tokens, &recorder);

            let err = runner.run().await.unwrap_err();

            assert!(matches!(err, RunError::ArgumentsInvalid { .. }));
            assert!(recorder.messages().is_empty());
        }
    }

    #[tokio::test]
    async fn base_runner_dispatches_selected_verb_only() {
        let recorder = Arc::new(Recorder::default());
        let runner = VerbBaseRunner::<dyn CustomVerbBase>::new(session(
            &["verb1", "-i", "test.txt"],
            verbs(&recorder),
            None,
        ));

        runner.run().await.unwrap();

        assert_eq!(recorder.messages(), vec!["h1:test.txt".to_string()]);
    }

    #[tokio::test]
    async fn base_runner_rejects_unrelated_base() {
        let recorder = Arc::new(Recorder::default());
        let runner = VerbBaseRunner::<dyn UnrelatedBase>::new(session(
            &["verb1", "-i", "test.txt"],
            verbs(&recorder),
            None,
        ));

        let err = runner.run().await.unwrap_err();

        assert!(matches!(
            err,
            RunError::VerbTypeMismatch { ref verb, ref expected }
                if verb == "Verb1" && expected == "dyn UnrelatedBase"
        ));
        assert!(recorder.messages().is_empty());
    }

    #[tokio::test]
    async fn base_runner_without_a_verb() {
        let recorder = Arc::new(Recorder::default());
        let runner = VerbBaseRunner::<dyn CustomVerbBase>::new(session(&["verb9"], verbs(&recorder), None));

        let err = runner.run().await.unwrap_err();

        assert!(matches!(
            err,
            RunError::ArgumentsInvalid { reason: ParseFailure::UnknownVerb(ref token) } if token == "verb9"
        ));
    }

    #[tokio::test]
    async fn verb_without_handler_is_distinct_from_unregistered() {
        let recorder = Arc::new(Recorder::default());
        let runner = VerbBaseRunner::<dyn CustomVerbBase>::new(session(
            &["verb2", "-o", "out.txt"],
            verbs(&recorder),
            None,
        ));

        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, RunError::NoHandler { ref verb } if verb == "Verb2"));

        let err = runner.execute(&AnyVerb::of(StrayVerb {})).await.unwrap_err();
        assert!(matches!(err, RunError::UnregisteredVerb { ref verb } if verb == "StrayVerb"));
    }

    #[tokio::test]
    async fn execute_empty_box_is_invalid_arguments() {
        let recorder = Arc::new(Recorder::default());
        let runner = VerbBaseRunner::<dyn CustomVerbBase>::new(session(&[], verbs(&recorder), None));
        let err = runner.execute(&AnyVerb::empty()).await.unwrap_err();
        assert!(err.is_usage_error());
    }

    #[tokio::test]
    async fn help_is_logged_below_error() {
        let recorder = Arc::new(Recorder::default());
        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let runner = VerbBaseRunner::<dyn CustomVerbBase>::new(session(&["--help"], verbs(&recorder), None));
        let err = runner.run().await.unwrap_err();
        assert!(err.is_help());

        let err = command_runner(&["-h"], &recorder).run().await.unwrap_err();
        assert!(err.is_help());

        let text = logs.text();
        assert!(text.contains("help requested"));
        assert!(!text.contains("ERROR"));
    }

    #[tokio::test]
    async fn invalid_arguments_are_logged_as_errors() {
        let recorder = Arc::new(Recorder::default());
        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let runner = VerbBaseRunner::<dyn CustomVerbBase>::new(session(&["verb9"], verbs(&recorder), None));
        assert!(runner.run().await.is_err());

        let text = logs.text();
        assert!(text.contains("ERROR"));
        assert!(text.contains("command line arguments are not valid"));
    }
}

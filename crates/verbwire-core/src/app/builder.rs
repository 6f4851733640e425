//! AppBuilder - コマンドラインアプリの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::any::{Any, TypeId};
use std::sync::Arc;

use super::runner::{CommandLineRunner, CommandRunner, VerbBaseRunner};
use super::session::{OptionsSlot, ParseSession};
use crate::domain::{CommandLineArguments, LookupError, RunError};
use crate::impls::{ClapParser, ParserSettings};
use crate::ports::ArgumentParser;
use crate::typed::{
    AnyVerb, DynHandler, Handler, Options, RegistryError, TypedHandler, Upcast, Verb, VerbRegistry,
    VerbShape,
};

type RunnerFactory = Box<dyn FnOnce(Arc<ParseSession>) -> Arc<dyn CommandLineRunner> + Send>;

struct OptionsRegistration {
    shape: VerbShape,
    handler: Option<Arc<dyn DynHandler>>,
    runner: Option<RunnerFactory>,
}

fn base_runner<B: ?Sized + 'static>(session: Arc<ParseSession>) -> Arc<dyn CommandLineRunner> {
    Arc::new(VerbBaseRunner::<B>::new(session))
}

/// AppBuilder はコマンドラインアプリを構築
///
/// # 使用例
/// ```ignore
/// let app = App::builder()
///     .arguments(CommandLineArguments::from_env())
///     .verb_with_handler::<AddVerb, _>(AddHandler)?
///     .verb_with_handler::<ListVerb, _>(ListHandler)?
///     .upcast::<AddVerb, dyn TodoVerb>()?
///     .upcast::<ListVerb, dyn TodoVerb>()?
///     .verb_base::<dyn TodoVerb>()
///     .expect_verbs(&["add", "list"])
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - 重複登録は登録時に RegistryError
/// - expect_verbs() の期待集合 ⊆ 登録済み集合を build() 時にチェック
/// - 引数なしの登録、ランナーの競合も build() 時に BuildError
pub struct AppBuilder {
    arguments: Option<CommandLineArguments>,
    parser: Option<Arc<dyn ArgumentParser>>,
    settings: ParserSettings,
    registry: VerbRegistry,
    options: Option<OptionsRegistration>,
    base_runner: Option<fn(Arc<ParseSession>) -> Arc<dyn CommandLineRunner>>,
    expected_verbs: Option<Vec<String>>,
}

/// BuildError はアプリ構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("command line arguments were not published. Call arguments() before build()")]
    ArgumentsNotPublished,

    #[error("Missing verbs: {0:?}. These verbs were expected but not registered.")]
    MissingVerbs(Vec<String>),

    #[error(
        "both a single command handler and verbs are registered; \
         only one command line runner can be active"
    )]
    ConflictingRunners,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            arguments: None,
            parser: None,
            settings: ParserSettings::default(),
            registry: VerbRegistry::new(),
            options: None,
            base_runner: None,
            expected_verbs: None,
        }
    }

    /// Publishes the argument vector every parse reads.
    pub fn arguments(mut self, arguments: impl Into<CommandLineArguments>) -> Self {
        self.arguments = Some(arguments.into());
        self
    }

    /// Replaces the default clap parser.
    pub fn with_parser(mut self, parser: Arc<dyn ArgumentParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn with_settings(mut self, settings: ParserSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Registers the single command options type without a handler.
    /// The options can be looked up, but there is nothing to run.
    pub fn options<O: Options>(self) -> Result<Self, RegistryError> {
        self.register_options::<O>(None, None)
    }

    /// Registers the single command options type and the handler that runs it.
    pub fn options_with_handler<O, H>(self, handler: H) -> Result<Self, RegistryError>
    where
        O: Options,
        H: Handler<O> + 'static,
    {
        let handler = Arc::new(handler);
        let erased: Arc<dyn DynHandler> = Arc::new(TypedHandler::<O, H>::shared(handler.clone()));
        let typed: Arc<dyn Handler<O>> = handler;
        let runner: RunnerFactory = Box::new(move |session| {
            let runner: Arc<dyn CommandLineRunner> = Arc::new(CommandRunner::new(session, typed));
            runner
        });
        self.register_options::<O>(Some(erased), Some(runner))
    }

    fn register_options<O: Options>(
        mut self,
        handler: Option<Arc<dyn DynHandler>>,
        runner: Option<RunnerFactory>,
    ) -> Result<Self, RegistryError> {
        if let Some(existing) = &self.options {
            return Err(RegistryError::OptionsAlreadyRegistered(existing.shape.type_name()));
        }
        self.options = Some(OptionsRegistration {
            shape: VerbShape::of_options::<O>(),
            handler,
            runner,
        });
        Ok(self)
    }

    /// Registers a verb without a handler.
    pub fn verb<V: Verb>(mut self) -> Result<Self, RegistryError> {
        self.registry.register_verb::<V>()?;
        Ok(self)
    }

    /// Registers a verb and the handler that executes it.
    pub fn verb_with_handler<V, H>(mut self, handler: H) -> Result<Self, RegistryError>
    where
        V: Verb,
        H: Handler<V> + 'static,
    {
        self.registry.register_verb_with_handler::<V, H>(handler)?;
        Ok(self)
    }

    /// Declares that the registered verb `V` can be viewed as `B`.
    pub fn upcast<V, B>(mut self) -> Result<Self, RegistryError>
    where
        V: Upcast<B>,
        B: ?Sized + 'static,
    {
        self.registry.register_upcast::<V, B>()?;
        Ok(self)
    }

    /// Runs verbs through the common base `B`. Without it the runner accepts
    /// every registered verb.
    pub fn verb_base<B: ?Sized + 'static>(mut self) -> Self {
        self.base_runner = Some(base_runner::<B>);
        self
    }

    /// 期待される verb 名のリストを設定
    pub fn expect_verbs(mut self, verbs: &[&str]) -> Self {
        self.expected_verbs = Some(verbs.iter().map(|verb| verb.to_string()).collect());
        self
    }

    /// AppBuilder を構築して App を生成
    ///
    /// # 検証
    /// - 登録があるのに arguments() がなければ ArgumentsNotPublished
    /// - expect_verbs() の verb が全て登録されているか（MissingVerbs）
    /// - 大文字小文字を区別しない設定で verb 名が衝突すれば Registry(DuplicateVerbName)
    /// - 単一コマンドの handler と verb が両方あれば ConflictingRunners
    pub fn build(self) -> Result<App, BuildError> {
        let has_shapes = self.options.is_some() || !self.registry.is_empty();
        if has_shapes && self.arguments.is_none() {
            return Err(BuildError::ArgumentsNotPublished);
        }

        if !self.settings.case_sensitive_verbs {
            self.registry.check_names_ignoring_case()?;
        }

        if let Some(expected_verbs) = &self.expected_verbs {
            let registered = self.registry.registered_verbs();
            let missing: Vec<String> = expected_verbs
                .iter()
                .filter(|verb| !registered.contains(&verb.as_str()))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingVerbs(missing));
            }
        }

        let handled_options = self
            .options
            .as_ref()
            .is_some_and(|options| options.runner.is_some());
        if handled_options && !self.registry.is_empty() {
            return Err(BuildError::ConflictingRunners);
        }

        let parser: Arc<dyn ArgumentParser> = match self.parser {
            Some(parser) => parser,
            None => Arc::new(ClapParser::new(self.settings)),
        };
        let (slot, options_runner) = match self.options {
            Some(options) => (
                Some(OptionsSlot::new(options.shape, options.handler)),
                options.runner,
            ),
            None => (None, None),
        };
        let has_verbs = !self.registry.is_empty();
        let session = Arc::new(ParseSession::new(
            self.arguments.unwrap_or_default(),
            parser,
            self.registry,
            slot,
        ));

        let runner = match (options_runner, self.base_runner) {
            (Some(factory), _) => Some(factory(session.clone())),
            (None, Some(factory)) => Some(factory(session.clone())),
            (None, None) if has_verbs => Some(base_runner::<dyn Any + Send + Sync>(session.clone())),
            (None, None) => None,
        };

        tracing::debug!(
            arguments = %session.arguments(),
            verbs = ?session.registry().registered_verbs(),
            has_runner = runner.is_some(),
            "command line app built"
        );
        Ok(App { session, runner })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// App は構築済みのコマンドラインアプリ
///
/// Every lookup reads the same memoized parse, so the options, the verb and
/// its base views are always consistent with what `run()` executes.
pub struct App {
    session: Arc<ParseSession>,
    runner: Option<Arc<dyn CommandLineRunner>>,
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    pub fn arguments(&self) -> &CommandLineArguments {
        self.session.arguments()
    }

    pub fn registry(&self) -> &VerbRegistry {
        self.session.registry()
    }

    pub fn options<O: Any + Send + Sync>(&self) -> Option<Arc<O>> {
        self.session.require_options::<O>().ok()
    }

    pub fn require_options<O: Any + Send + Sync>(&self) -> Result<Arc<O>, LookupError> {
        self.session.require_options::<O>()
    }

    pub fn verb<V: Any + Send + Sync>(&self) -> Option<Arc<V>> {
        self.session.require_verb::<V>().ok()
    }

    pub fn require_verb<V: Any + Send + Sync>(&self) -> Result<Arc<V>, LookupError> {
        self.session.require_verb::<V>()
    }

    pub fn any_verb(&self) -> &AnyVerb {
        self.session.any_verb()
    }

    pub fn base<B: ?Sized + 'static>(&self) -> Option<Arc<B>> {
        self.session.require_base::<B>().ok()
    }

    pub fn require_base<B: ?Sized + 'static>(&self) -> Result<Arc<B>, LookupError> {
        self.session.require_base::<B>()
    }

    /// Handler registered for the options or verb type `V`, if any.
    pub fn handler<V: Any>(&self) -> Option<Arc<dyn DynHandler>> {
        let verb_type = TypeId::of::<V>();
        if let Some(slot) = self.session.options_slot() {
            if slot.shape.type_id() == verb_type {
                return slot.handler.clone();
            }
        }
        self.session
            .registry()
            .lookup(verb_type)
            .and_then(|descriptor| descriptor.handler().cloned())
    }

    /// Typed handler registered for `V`, callable with a concrete `&V`.
    pub fn typed_handler<V: Send + Sync + 'static>(&self) -> Option<Arc<dyn Handler<V>>> {
        let erased = self.handler::<V>()?;
        erased
            .typed_handler()
            .downcast::<Arc<dyn Handler<V>>>()
            .ok()
            .map(|handler| *handler)
    }

    /// `None` when nothing was registered with a handler to run.
    pub fn runner(&self) -> Option<Arc<dyn CommandLineRunner>> {
        self.runner.clone()
    }

    pub async fn run(&self) -> Result<(), RunError> {
        match &self.runner {
            Some(runner) => runner.run().await,
            None => {
                tracing::debug!(arguments = %self.arguments(), "no command line runner registered");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParseFailure;
    use crate::impls::clap_parser::fixtures::CountingParser;
    use crate::typed::handler::fixtures::{Recorder, RecordingHandler};
    use crate::typed::verb::fixtures::{CustomVerbBase, SimpleOptions, UnrelatedBase, Verb1, Verb2};

    #[derive(Debug, clap::Args)]
    struct ShoutingVerb1 {
        #[arg(short = 'x', long = "extra")]
        extra: Option<String>,
    }

    impl Verb for ShoutingVerb1 {
        const NAME: &'static str = "VERB1";
    }

    fn verbs_app(tokens: &[&str], recorder: &Arc<Recorder>) -> App {
        App::builder()
            .arguments(CommandLineArguments::new(tokens.iter().copied()))
            .verb_with_handler::<Verb1, _>(RecordingHandler::new(recorder.clone(), "h1"))
            .unwrap()
            .verb_with_handler::<Verb2, _>(RecordingHandler::new(recorder.clone(), "h2"))
            .unwrap()
            .upcast::<Verb1, dyn CustomVerbBase>()
            .unwrap()
            .upcast::<Verb2, dyn CustomVerbBase>()
            .unwrap()
            .verb_base::<dyn CustomVerbBase>()
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn simple_options_without_handler() {
        let app = App::builder()
            .arguments(CommandLineArguments::new(["-p", "test.txt"]))
            .options::<SimpleOptions>()
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(app.arguments().as_slice(), ["-p", "test.txt"]);
        assert_eq!(app.options::<SimpleOptions>().unwrap().file_path, "test.txt");
        assert!(app.handler::<SimpleOptions>().is_none());
        assert!(app.runner().is_none());

        app.run().await.unwrap();
    }

    #[tokio::test]
    async fn simple_options_with_handler() {
        let recorder = Arc::new(Recorder::default());
        let app = App::builder()
            .arguments(CommandLineArguments::new(["-p", "test.txt"]))
            .verb_base::<dyn CustomVerbBase>()
            .options_with_handler::<SimpleOptions, _>(RecordingHandler::new(recorder.clone(), "simple"))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(app.options::<SimpleOptions>().unwrap().file_path, "test.txt");
        assert_eq!(
            app.handler::<SimpleOptions>().map(|h| h.handler_type()),
            Some("RecordingHandler".to_string())
        );
        assert!(app.runner().is_some());

        app.run().await.unwrap();

        assert_eq!(recorder.messages(), vec!["simple:test.txt".to_string()]);
    }

    #[tokio::test]
    async fn simple_options_invalid_arguments_fail_the_run() {
        for tokens in [&[][..], &["-d"][..]] {
            let recorder = Arc::new(Recorder::default());
            let app = App::builder()
                .arguments(CommandLineArguments::new(tokens.iter().copied()))
                .options_with_handler::<SimpleOptions, _>(RecordingHandler::new(recorder.clone(), "simple"))
                .unwrap()
                .build()
                .unwrap();

            assert!(app.options::<SimpleOptions>().is_none());
            let err = app.run().await.unwrap_err();
            assert!(err.is_usage_error());
            assert!(recorder.messages().is_empty());
        }
    }

    #[tokio::test]
    async fn command_line_verbs() {
        let recorder = Arc::new(Recorder::default());
        let app = verbs_app(&["verb1", "-i", "test.txt"], &recorder);

        let base = app.base::<dyn CustomVerbBase>().unwrap();
        assert_eq!(base.file_path(), "test.txt");
        assert!(app.any_verb().is::<Verb1>());
        assert!(app.verb::<Verb1>().is_some());
        assert!(app.verb::<Verb2>().is_none());

        assert!(app.handler::<Verb1>().is_some());
        assert!(app.handler::<Verb2>().is_some());
        assert!(app.runner().is_some());

        app.run().await.unwrap();

        assert_eq!(recorder.messages(), vec!["h1:test.txt".to_string()]);
    }

    #[tokio::test]
    async fn unrelated_base_fails_with_type_mismatch() {
        let recorder = Arc::new(Recorder::default());
        let app = App::builder()
            .arguments(CommandLineArguments::new(["verb1", "-i", "test.txt"]))
            .verb_with_handler::<Verb1, _>(RecordingHandler::new(recorder.clone(), "h1"))
            .unwrap()
            .verb_base::<dyn UnrelatedBase>()
            .build()
            .unwrap();

        assert!(app.base::<dyn UnrelatedBase>().is_none());
        let err = app.run().await.unwrap_err();
        assert!(matches!(err, RunError::VerbTypeMismatch { .. }));
        assert!(recorder.messages().is_empty());
    }

    #[tokio::test]
    async fn verbs_without_declared_base_accept_any_verb() {
        let recorder = Arc::new(Recorder::default());
        let app = App::builder()
            .arguments(CommandLineArguments::new(["verb2", "-o", "out.txt"]))
            .verb_with_handler::<Verb1, _>(RecordingHandler::new(recorder.clone(), "h1"))
            .unwrap()
            .verb_with_handler::<Verb2, _>(RecordingHandler::new(recorder.clone(), "h2"))
            .unwrap()
            .build()
            .unwrap();

        app.run().await.unwrap();
        assert_eq!(recorder.messages(), vec!["h2:out.txt".to_string()]);
    }

    #[tokio::test]
    async fn unknown_verb_fails_the_run() {
        let recorder = Arc::new(Recorder::default());
        let app = verbs_app(&["verb3"], &recorder);

        assert!(app.any_verb().is_none());
        assert!(app.base::<dyn CustomVerbBase>().is_none());
        let err = app.run().await.unwrap_err();
        assert!(matches!(
            err,
            RunError::ArgumentsInvalid { reason: ParseFailure::UnknownVerb(_) }
        ));
        assert!(recorder.messages().is_empty());
    }

    #[test]
    fn lookup_of_unregistered_type() {
        let recorder = Arc::new(Recorder::default());
        let app = verbs_app(&["verb1", "-i", "test.txt"], &recorder);
        assert_eq!(
            app.require_options::<SimpleOptions>().unwrap_err(),
            LookupError::NotRegistered("SimpleOptions".to_string())
        );
        assert!(app.handler::<SimpleOptions>().is_none());
    }

    #[test]
    fn build_without_arguments() {
        let result = App::builder().verb::<Verb1>().unwrap().build();
        assert!(matches!(result, Err(BuildError::ArgumentsNotPublished)));

        let app = App::builder().build().unwrap();
        assert!(app.arguments().is_empty());
        assert!(app.runner().is_none());
    }

    #[test]
    fn build_missing_verbs() {
        let result = App::builder()
            .arguments(CommandLineArguments::new(["verb1"]))
            .verb::<Verb1>()
            .unwrap()
            .expect_verbs(&["verb1", "verb2"])
            .build();
        assert!(matches!(
            result,
            Err(BuildError::MissingVerbs(missing)) if missing == vec!["verb2".to_string()]
        ));
    }

    #[test]
    fn build_conflicting_runners() {
        let recorder = Arc::new(Recorder::default());
        let result = App::builder()
            .arguments(CommandLineArguments::new(["verb1"]))
            .options_with_handler::<SimpleOptions, _>(RecordingHandler::new(recorder, "simple"))
            .unwrap()
            .verb::<Verb1>()
            .unwrap()
            .build();
        assert!(matches!(result, Err(BuildError::ConflictingRunners)));
    }

    #[test]
    fn duplicate_registrations_are_rejected() {
        let result = App::builder().verb::<Verb1>().unwrap().verb::<Verb1>();
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(_))));

        let result = App::builder()
            .options::<SimpleOptions>()
            .unwrap()
            .options::<SimpleOptions>();
        assert!(matches!(result, Err(RegistryError::OptionsAlreadyRegistered(_))));
    }

    #[test]
    fn registry_error_converts_into_build_error() {
        fn wire() -> Result<App, BuildError> {
            App::builder()
                .arguments(CommandLineArguments::new(["verb1"]))
                .upcast::<Verb1, dyn CustomVerbBase>()?
                .build()
        }
        assert!(matches!(
            wire(),
            Err(BuildError::Registry(RegistryError::NotRegistered(_)))
        ));
    }

    #[test]
    fn case_insensitive_verbs_must_not_collide() {
        let result = App::builder()
            .arguments(CommandLineArguments::new(["verb1", "-x", "a"]))
            .with_settings(ParserSettings::default().case_insensitive_verbs())
            .verb::<Verb1>()
            .unwrap()
            .verb::<ShoutingVerb1>()
            .unwrap()
            .build();
        assert!(matches!(
            result,
            Err(BuildError::Registry(RegistryError::DuplicateVerbName(name))) if name == "VERB1"
        ));

        let app = App::builder()
            .arguments(CommandLineArguments::new(["VERB1", "-x", "a"]))
            .verb::<Verb1>()
            .unwrap()
            .verb::<ShoutingVerb1>()
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(app.verb::<ShoutingVerb1>().unwrap().extra.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn typed_handler_takes_a_concrete_verb() {
        let recorder = Arc::new(Recorder::default());
        let app = App::builder()
            .arguments(CommandLineArguments::new(["verb1", "-i", "test.txt"]))
            .verb_with_handler::<Verb1, _>(RecordingHandler::new(recorder.clone(), "h1"))
            .unwrap()
            .verb::<Verb2>()
            .unwrap()
            .build()
            .unwrap();

        let verb = app.verb::<Verb1>().unwrap();
        let handler = app.typed_handler::<Verb1>().unwrap();
        handler.execute(&verb).await.unwrap();

        assert_eq!(recorder.messages(), vec!["h1:test.txt".to_string()]);
        assert!(app.typed_handler::<Verb2>().is_none());
        assert!(app.typed_handler::<SimpleOptions>().is_none());
    }

    #[tokio::test]
    async fn typed_handler_for_options() {
        let recorder = Arc::new(Recorder::default());
        let app = App::builder()
            .arguments(CommandLineArguments::new(["-p", "test.txt"]))
            .options_with_handler::<SimpleOptions, _>(RecordingHandler::new(recorder.clone(), "simple"))
            .unwrap()
            .build()
            .unwrap();

        let options = app.options::<SimpleOptions>().unwrap();
        app.typed_handler::<SimpleOptions>()
            .unwrap()
            .execute(&options)
            .await
            .unwrap();
        assert_eq!(recorder.messages(), vec!["simple:test.txt".to_string()]);
    }

    #[tokio::test]
    async fn custom_parser_replaces_clap_and_parses_once() {
        let recorder = Arc::new(Recorder::default());
        let parser = Arc::new(CountingParser::new(ParserSettings::for_program("todo")));
        let app = App::builder()
            .arguments(CommandLineArguments::new(["verb1", "-i", "test.txt"]))
            .with_parser(parser.clone())
            .verb_with_handler::<Verb1, _>(RecordingHandler::new(recorder.clone(), "h1"))
            .unwrap()
            .upcast::<Verb1, dyn CustomVerbBase>()
            .unwrap()
            .verb_base::<dyn CustomVerbBase>()
            .build()
            .unwrap();

        assert_eq!(parser.calls(), 0);
        assert!(app.any_verb().is::<Verb1>());
        assert!(app.verb::<Verb1>().is_some());
        assert_eq!(app.base::<dyn CustomVerbBase>().unwrap().file_path(), "test.txt");
        app.run().await.unwrap();

        assert_eq!(parser.calls(), 1);
        assert_eq!(recorder.messages(), vec!["h1:test.txt".to_string()]);
    }
}

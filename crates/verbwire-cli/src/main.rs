use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Args;

use verbwire_core::app::BuildError;
use verbwire_core::impls::ParserSettings;
use verbwire_core::observability::init_tracing;
use verbwire_core::{
    App, CommandLineArguments, Handler, HandlerError, ParseFailure, RunError, Upcast, Verb,
    exit_code, run_command_line,
};

mod store;

use store::{TodoItem, TodoStore};

/// Common view of every todo verb, used for logging which item a run touches.
trait TodoVerb: Send + Sync {
    fn todo_id(&self) -> Option<&str>;
}

#[derive(Debug, Args)]
struct AddVerb {
    /// Id of the new todo
    #[arg(short = 't', long = "todo", required = true)]
    todo_id: String,

    /// Optional description
    #[arg(short = 'm', long = "title")]
    title: Option<String>,
}

impl Verb for AddVerb {
    const NAME: &'static str = "add";
    const ABOUT: Option<&'static str> = Some("Add a new todo item");
}

#[derive(Debug, Args)]
struct CompleteVerb {
    /// Id of the todo to complete
    #[arg(short = 't', long = "todo", required = true)]
    todo_id: String,
}

impl Verb for CompleteVerb {
    const NAME: &'static str = "complete";
    const ABOUT: Option<&'static str> = Some("Mark a todo item as done");
}

#[derive(Debug, Args)]
struct ListVerb {
    /// Include completed items
    #[arg(short = 'a', long = "all")]
    all: bool,
}

impl Verb for ListVerb {
    const NAME: &'static str = "list";
    const ABOUT: Option<&'static str> = Some("List todo items");
}

impl TodoVerb for AddVerb {
    fn todo_id(&self) -> Option<&str> {
        Some(&self.todo_id)
    }
}

impl TodoVerb for CompleteVerb {
    fn todo_id(&self) -> Option<&str> {
        Some(&self.todo_id)
    }
}

impl TodoVerb for ListVerb {
    fn todo_id(&self) -> Option<&str> {
        None
    }
}

impl Upcast<dyn TodoVerb> for AddVerb {
    fn upcast(self: Arc<Self>) -> Arc<dyn TodoVerb> {
        self
    }
}

impl Upcast<dyn TodoVerb> for CompleteVerb {
    fn upcast(self: Arc<Self>) -> Arc<dyn TodoVerb> {
        self
    }
}

impl Upcast<dyn TodoVerb> for ListVerb {
    fn upcast(self: Arc<Self>) -> Arc<dyn TodoVerb> {
        self
    }
}

/// Handles every todo verb against one store.
struct TodoHandler {
    store: Arc<TodoStore>,
}

impl TodoHandler {
    fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler<AddVerb> for TodoHandler {
    async fn execute(&self, verb: &AddVerb) -> Result<(), HandlerError> {
        let item = self.store.add(&verb.todo_id, verb.title.as_deref()).await?;
        println!("added {}", render(&item));
        Ok(())
    }
}

#[async_trait]
impl Handler<CompleteVerb> for TodoHandler {
    async fn execute(&self, verb: &CompleteVerb) -> Result<(), HandlerError> {
        let item = self.store.complete(&verb.todo_id).await?;
        println!("completed {}", render(&item));
        Ok(())
    }
}

#[async_trait]
impl Handler<ListVerb> for TodoHandler {
    async fn execute(&self, verb: &ListVerb) -> Result<(), HandlerError> {
        let items = self.store.load().await?;
        for line in list_lines(&items, verb.all) {
            println!("{line}");
        }
        Ok(())
    }
}

fn render(item: &TodoItem) -> String {
    let mark = if item.done { 'x' } else { ' ' };
    match &item.title {
        Some(title) => format!("[{mark}] {} {title}", item.id),
        None => format!("[{mark}] {}", item.id),
    }
}

fn list_lines(items: &[TodoItem], all: bool) -> Vec<String> {
    items
        .iter()
        .filter(|item| all || !item.done)
        .map(render)
        .collect()
}

fn build_app(arguments: CommandLineArguments, store: Arc<TodoStore>) -> Result<App, BuildError> {
    let app = App::builder()
        .arguments(arguments)
        .with_settings(
            ParserSettings::for_program("verbwire").with_version(env!("CARGO_PKG_VERSION")),
        )
        .verb_with_handler::<AddVerb, _>(TodoHandler::new(store.clone()))?
        .verb_with_handler::<CompleteVerb, _>(TodoHandler::new(store.clone()))?
        .verb_with_handler::<ListVerb, _>(TodoHandler::new(store))?
        .upcast::<AddVerb, dyn TodoVerb>()?
        .upcast::<CompleteVerb, dyn TodoVerb>()?
        .upcast::<ListVerb, dyn TodoVerb>()?
        .verb_base::<dyn TodoVerb>()
        .expect_verbs(&[AddVerb::NAME, CompleteVerb::NAME, ListVerb::NAME])
        .build()?;

    if let Some(todo_id) = app.base::<dyn TodoVerb>().as_deref().and_then(|verb| verb.todo_id()) {
        tracing::debug!(todo_id, "todo selected");
    }
    Ok(app)
}

fn report(err: &RunError) {
    match err {
        RunError::ArgumentsInvalid {
            reason: ParseFailure::Help(text),
        } => println!("{text}"),
        RunError::ArgumentsInvalid { reason } => {
            eprintln!("{reason}");
            eprintln!("Run 'verbwire help' for the list of verbs.");
        }
        other => eprintln!("error: {other}"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing("warn");

    let store = Arc::new(TodoStore::from_env());
    tracing::debug!(path = %store.path().display(), "todo store");
    let app = match build_app(CommandLineArguments::from_env(), store) {
        Ok(app) => app,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let result = run_command_line(&app).await;
    if let Err(err) = &result {
        report(err);
    }
    exit_code(&result)
}

//! Host entry point: run the wired app once and turn the result into an exit
//! code.

use std::process::ExitCode;

use super::builder::App;
use crate::domain::RunError;

/// Exit code for invalid command line arguments.
pub const USAGE_EXIT_CODE: u8 = 2;

/// Runs whatever the command line selected.
///
/// An app without a runner succeeds without doing anything. Failures are
/// logged here and returned unchanged.
pub async fn run_command_line(app: &App) -> Result<(), RunError> {
    if app.runner().is_none() {
        tracing::debug!("no command line runner registered; nothing to run");
        return Ok(());
    }

    tracing::info!(arguments = %app.arguments(), "command line run started");
    let result = app.run().await;
    match &result {
        Ok(()) => tracing::info!("command line run finished"),
        Err(err) if err.is_help() => tracing::debug!("help requested"),
        Err(err) => tracing::error!(error = %err, "command line run failed"),
    }
    result
}

/// Maps a run result to the process exit code.
pub fn exit_code(result: &Result<(), RunError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_help() => ExitCode::SUCCESS,
        Err(err) if err.is_usage_error() => ExitCode::from(USAGE_EXIT_CODE),
        Err(_) => ExitCode::FAILURE,
    }
}

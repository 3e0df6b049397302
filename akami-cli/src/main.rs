//! `akami` binary: one index command per invocation.
//!
//! The JSON response goes to stdout and diagnostics go to stderr through
//! `tracing`. Rejected input exits with status 2; store, runtime, and
//! rendering failures exit with status 1.

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use akami_cli::{
    cli::{Cli, CliError, render_output, run_cli},
    logging::{self, LoggingError},
};
use tracing::{error, field};

/// Exit status for requests the index refused as malformed.
const INPUT_ERROR_STATUS: u8 = 2;

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let output = run_cli(cli).context("command failed")?;
    let mut writer = BufWriter::new(io::stdout().lock());
    render_output(&output, &mut writer).context("failed to write response")?;
    writer.flush().context("failed to flush stdout")?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_failure(&err),
    }
}

/// Logs `err` with any stable codes it carries and picks the exit status.
fn report_failure(err: &anyhow::Error) -> ExitCode {
    let cause = err.downcast_ref::<CliError>();
    let code = cause
        .and_then(CliError::code)
        .map(|code| field::display(code.as_str()));
    let storage_code = cause
        .and_then(CliError::storage_code)
        .map(|code| field::display(code.as_str()));
    error!(error = %err, code, storage_code, "akami command failed");

    if cause.is_some_and(CliError::is_input_error) {
        ExitCode::from(INPUT_ERROR_STATUS)
    } else {
        ExitCode::FAILURE
    }
}

#[expect(
    clippy::print_stderr,
    reason = "tracing is not available until logging initialises"
)]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("akami: cannot initialise logging: {err}");
}

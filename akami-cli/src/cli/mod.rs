//! Command-line interface for an akami collection stored in a directory.
//!
//! Each invocation opens the collection under `--store`, runs one command,
//! and returns a JSON-serialisable response.

mod args;
mod commands;

pub use args::{ArgError, DataArg, VectorArg};
pub use commands::{
    AddArgs, Cli, CliError, Command, CommandOutput, ConfigArgs, Empty, QueryArgs, render_output,
    run_cli,
};

#[cfg(test)]
mod tests;

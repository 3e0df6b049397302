//! Support library for the akami CLI binary.
//!
//! Re-exports the CLI module so doctests and integration tests can exercise
//! commands against a directory store without forking a subprocess.

pub mod cli;
pub mod logging;

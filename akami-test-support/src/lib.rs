//! Shared test utilities used across akami crates.

pub mod datasets;
pub mod tracing;

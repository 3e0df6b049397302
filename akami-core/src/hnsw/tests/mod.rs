//! Unit tests for the HNSW engine.

mod build;
mod cache;
mod fixtures;
mod instrumentation;

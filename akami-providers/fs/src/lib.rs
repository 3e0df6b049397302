//! Directory-backed [`akami_core::Storage`] provider.
//!
//! Each key is stored as one file inside a directory opened through
//! `cap-std`, so the provider can never reach outside the directory it was
//! given. Blocking file I/O runs on tokio's blocking pool.

mod errors;
mod keys;
mod storage;

pub use errors::FsStorageError;
pub use keys::is_valid_key;
pub use storage::FsStorage;

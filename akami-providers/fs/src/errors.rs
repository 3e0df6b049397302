use akami_core::StorageError;
use thiserror::Error;

/// Failures raised by [`crate::FsStorage`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FsStorageError {
    #[error("key `{key}` may only contain ASCII letters, digits, `_` and `-`")]
    InvalidKey { key: String },
    #[error("directory entry name is not valid UTF-8")]
    NonUtf8Name,
    #[error("blocking i/o task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("i/o error on `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FsStorageError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<FsStorageError> for StorageError {
    fn from(error: FsStorageError) -> Self {
        match error {
            FsStorageError::InvalidKey { key } => Self::InvalidKey { key },
            other => Self::backend(other),
        }
    }
}

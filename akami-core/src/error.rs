//! Error types for the akami core library.
//!
//! Defines the storage error surfaced by [`crate::Storage`] implementations
//! and the macro used to attach stable machine-readable codes to every public
//! error enum.

use std::fmt;

use thiserror::Error;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? $( ( $($tuple:tt)* ) )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl ::std::fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? $( ( $($tuple)* ) )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

pub(crate) use define_error_codes;

/// An error produced by a [`crate::Storage`] backend.
///
/// Storage failures are always fatal to the in-flight index operation; the
/// core never retries them.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum StorageError {
    /// The backend itself failed (I/O, lost connection, poisoned lock).
    #[error("storage backend failure: {message}")]
    Backend {
        /// Human-readable description supplied by the backend.
        message: String,
    },
    /// A value could not be serialised before being written.
    #[error("failed to encode value for key `{key}`: {message}")]
    Encode {
        /// Key the value was destined for.
        key: String,
        /// Serialiser diagnostic.
        message: String,
    },
    /// A stored value could not be deserialised.
    #[error("failed to decode value stored under key `{key}`: {message}")]
    Decode {
        /// Key the value was read from.
        key: String,
        /// Deserialiser diagnostic.
        message: String,
    },
    /// The backend cannot represent the supplied key.
    #[error("storage key `{key}` is not valid for this backend")]
    InvalidKey {
        /// Offending key.
        key: String,
    },
}

impl StorageError {
    /// Wraps any displayable backend failure.
    ///
    /// # Examples
    /// ```
    /// use akami_core::StorageError;
    ///
    /// let err = StorageError::backend("disk full");
    /// assert_eq!(err.to_string(), "storage backend failure: disk full");
    /// ```
    #[must_use]
    pub fn backend(message: impl fmt::Display) -> Self {
        Self::Backend {
            message: message.to_string(),
        }
    }
}

define_error_codes! {
    /// Stable codes describing [`StorageError`] variants.
    enum StorageErrorCode for StorageError {
        /// The backend itself failed.
        Backend => Backend { .. } => "STORAGE_BACKEND",
        /// A value could not be serialised.
        Encode => Encode { .. } => "STORAGE_ENCODE",
        /// A stored value could not be deserialised.
        Decode => Decode { .. } => "STORAGE_DECODE",
        /// The backend cannot represent the supplied key.
        InvalidKey => InvalidKey { .. } => "STORAGE_INVALID_KEY",
    }
}

/// Serialises `value` as JSON for storage under `key`.
pub(crate) fn encode_json<T: serde::Serialize>(key: &str, value: &T) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(value).map_err(|err| StorageError::Encode {
        key: key.to_owned(),
        message: err.to_string(),
    })
}

/// Deserialises a JSON value previously stored under `key`.
pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(
    key: &str,
    bytes: &[u8],
) -> Result<T, StorageError> {
    serde_json::from_slice(bytes).map_err(|err| StorageError::Decode {
        key: key.to_owned(),
        message: err.to_string(),
    })
}

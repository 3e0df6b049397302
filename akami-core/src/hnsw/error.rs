//! Error types produced by the HNSW engine.

use thiserror::Error;

use crate::error::{StorageError, define_error_codes};

use super::types::NodeId;

/// Errors produced by the HNSW engine.
///
/// None of these are retried internally. Input errors leave the index
/// untouched; storage errors abort the in-flight operation before any batched
/// write is issued.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum HnswError {
    /// A vector's width differs from the index's fixed dimensionality.
    #[error("vector has {actual} dimensions but the index expects {expected}")]
    DimensionMismatch {
        /// Dimensionality fixed by the first insertion.
        expected: usize,
        /// Width of the rejected vector.
        actual: usize,
    },
    /// The id has already been inserted.
    #[error("node {id} already exists")]
    DuplicateId {
        /// Offending id.
        id: NodeId,
    },
    /// A search ran before any vector fixed the dimensionality.
    #[error("index dimensionality is unset; add a vector first")]
    DimensionsUnset,
    /// An immutable configuration field was changed after persistence.
    #[error("`{field}` cannot change once persisted (stored {stored}, requested {requested})")]
    ImmutableConfigViolation {
        /// Persisted field name.
        field: &'static str,
        /// Value already persisted.
        stored: usize,
        /// Value the caller asked for.
        requested: usize,
    },
    /// Configuration values were out of range.
    #[error("invalid HNSW parameter: {reason}")]
    InvalidParameters {
        /// Description of the rejected value.
        reason: String,
    },
    /// The vector was empty or contained a non-finite component.
    #[error("invalid vector: {reason}")]
    InvalidVector {
        /// Description of the defect.
        reason: String,
    },
    /// An adjacency list references a node that storage does not hold.
    #[error("node {id} is referenced by the graph but missing from storage")]
    MissingNode {
        /// Dangling id.
        id: NodeId,
    },
    /// The storage capability failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

define_error_codes! {
    /// Stable codes describing [`HnswError`] variants.
    enum HnswErrorCode for HnswError {
        /// A vector's width differs from the index's fixed dimensionality.
        DimensionMismatch => DimensionMismatch { .. } => "HNSW_DIMENSION_MISMATCH",
        /// The id has already been inserted.
        DuplicateId => DuplicateId { .. } => "HNSW_DUPLICATE_ID",
        /// A search ran before any vector fixed the dimensionality.
        DimensionsUnset => DimensionsUnset => "HNSW_DIMENSIONS_UNSET",
        /// An immutable configuration field was changed after persistence.
        ImmutableConfigViolation => ImmutableConfigViolation { .. } => "HNSW_IMMUTABLE_CONFIG",
        /// Configuration values were out of range.
        InvalidParameters => InvalidParameters { .. } => "HNSW_INVALID_PARAMETERS",
        /// The vector was empty or contained a non-finite component.
        InvalidVector => InvalidVector { .. } => "HNSW_INVALID_VECTOR",
        /// An adjacency list references a missing node.
        MissingNode => MissingNode { .. } => "HNSW_MISSING_NODE",
        /// The storage capability failed.
        StorageFailure => Storage(..) => "HNSW_STORAGE_FAILURE",
    }
}

impl HnswError {
    /// Returns the inner [`crate::StorageErrorCode`] when storage failed.
    #[must_use]
    pub const fn storage_code(&self) -> Option<crate::StorageErrorCode> {
        match self {
            Self::Storage(error) => Some(error.code()),
            _ => None,
        }
    }

    /// Whether the caller supplied bad input, as opposed to an operational
    /// failure.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::MissingNode { .. })
    }
}

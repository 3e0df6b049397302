//! Parsers for vector and item-data arguments.

use std::str::FromStr;

use akami_core::collection::ItemData;
use thiserror::Error;

/// A vector given on the command line as comma-separated numbers.
///
/// # Examples
/// ```
/// use akami_cli::cli::VectorArg;
///
/// let vector: VectorArg = "0.5, -1,2e-1".parse().expect("vector must parse");
/// assert_eq!(vector.0, [0.5, -1.0, 0.2]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct VectorArg(pub Vec<f32>);

/// Raised when an argument cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgError {
    /// A vector component is not a number.
    #[error("component {position} (`{raw}`) is not a number")]
    InvalidComponent {
        /// Zero-based position within the list.
        position: usize,
        /// Offending text.
        raw: String,
    },
    /// The data argument is not a JSON object.
    #[error("item data must be a JSON object: {message}")]
    InvalidData {
        /// Parser diagnostic.
        message: String,
    },
}

impl FromStr for VectorArg {
    type Err = ArgError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.split(',')
            .enumerate()
            .map(|(position, component)| {
                component
                    .trim()
                    .parse::<f32>()
                    .map_err(|_| ArgError::InvalidComponent {
                        position,
                        raw: component.trim().to_owned(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

/// A JSON object attached to an added item.
#[derive(Clone, Debug, PartialEq)]
pub struct DataArg(pub ItemData);

impl FromStr for DataArg {
    type Err = ArgError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(raw)
            .map(Self)
            .map_err(|err| ArgError::InvalidData {
                message: err.to_string(),
            })
    }
}

//! Pluggable similarity metrics used by the HNSW engine.
//!
//! Every metric maps a pair of vectors to a scalar where smaller means more
//! similar. Metrics receive each vector together with its cached L2 norm so
//! the cosine form does not recompute magnitudes on every comparison.

mod cosine;
mod euclidean;
mod helpers;
mod inner_product;

use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

pub use self::{
    cosine::CosineDistance, euclidean::SquaredEuclidean, inner_product::NegativeInnerProduct,
};

/// A vector presented to a [`ScoreFunction`] alongside its L2 norm.
#[derive(Clone, Copy, Debug)]
pub struct ScoreOperand<'a> {
    /// Raw components.
    pub vector: &'a [f32],
    /// L2 norm of [`ScoreOperand::vector`], accumulated in `f64`.
    pub norm: f64,
}

impl<'a> ScoreOperand<'a> {
    /// Wraps a vector, computing its norm eagerly.
    ///
    /// # Examples
    /// ```
    /// use akami_core::ScoreOperand;
    ///
    /// let operand = ScoreOperand::new(&[3.0, 4.0]);
    /// assert!((operand.norm - 5.0).abs() < 1e-6);
    /// ```
    #[must_use]
    pub fn new(vector: &'a [f32]) -> Self {
        Self {
            vector,
            norm: helpers::l2_norm(vector),
        }
    }
}

/// Similarity metric strategy injected into the engine.
///
/// Implementations must be symmetric, total over finite inputs, and free of
/// side effects: they run for every comparison of every traversal.
pub trait ScoreFunction: fmt::Debug + Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Scores `left` against `right`; lower is more similar.
    fn score(&self, left: ScoreOperand<'_>, right: ScoreOperand<'_>) -> f32;
}

/// Built-in metrics selectable by name.
///
/// # Examples
/// ```
/// use akami_core::ScoreKind;
///
/// let kind: ScoreKind = "squared-euclidean".parse().expect("known metric");
/// assert_eq!(kind, ScoreKind::SquaredEuclidean);
/// assert_eq!(ScoreKind::default(), ScoreKind::Cosine);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreKind {
    /// `1 - cos(a, b)`.
    #[default]
    Cosine,
    /// `sum((a_i - b_i)^2)`.
    SquaredEuclidean,
    /// `-dot(a, b)`.
    InnerProduct,
}

impl ScoreKind {
    /// Instantiates the metric.
    #[must_use]
    pub fn into_function(self) -> Arc<dyn ScoreFunction> {
        match self {
            Self::Cosine => Arc::new(CosineDistance),
            Self::SquaredEuclidean => Arc::new(SquaredEuclidean),
            Self::InnerProduct => Arc::new(NegativeInnerProduct),
        }
    }

    /// Returns the kebab-case label accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::SquaredEuclidean => "squared-euclidean",
            Self::InnerProduct => "inner-product",
        }
    }
}

impl fmt::Display for ScoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when parsing an unknown metric name.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown score function `{provided}`; expected cosine, squared-euclidean, or inner-product")]
pub struct UnknownScoreKind {
    /// Raw value supplied by the caller.
    pub provided: String,
}

impl FromStr for ScoreKind {
    type Err = UnknownScoreKind;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "squared-euclidean" | "euclidean" => Ok(Self::SquaredEuclidean),
            "inner-product" | "dot" => Ok(Self::InnerProduct),
            other => Err(UnknownScoreKind {
                provided: other.to_owned(),
            }),
        }
    }
}

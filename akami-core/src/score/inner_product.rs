use super::{ScoreFunction, ScoreOperand, helpers::dot};

/// Negated inner product, so larger dot products rank first.
///
/// Only meaningful for vectors normalised ahead of time; scores may be
/// negative.
#[derive(Clone, Copy, Debug, Default)]
pub struct NegativeInnerProduct;

impl ScoreFunction for NegativeInnerProduct {
    fn name(&self) -> &'static str {
        "inner-product"
    }

    fn score(&self, left: ScoreOperand<'_>, right: ScoreOperand<'_>) -> f32 {
        (-dot(left.vector, right.vector)) as f32
    }
}

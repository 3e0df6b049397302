use super::{ScoreFunction, ScoreOperand, helpers::dot};

/// Cosine distance, `1 - dot(a, b) / (|a| * |b|)`.
///
/// Uses the cached norms carried by each [`ScoreOperand`]. A zero-magnitude
/// operand has no direction and scores `1.0` against everything, as an
/// orthogonal vector would.
///
/// # Examples
/// ```
/// use akami_core::{CosineDistance, ScoreFunction, ScoreOperand};
///
/// let score = CosineDistance.score(ScoreOperand::new(&[1.0, 0.0]), ScoreOperand::new(&[0.0, 2.0]));
/// assert!((score - 1.0).abs() < 1e-6);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct CosineDistance;

impl ScoreFunction for CosineDistance {
    fn name(&self) -> &'static str {
        "cosine"
    }

    fn score(&self, left: ScoreOperand<'_>, right: ScoreOperand<'_>) -> f32 {
        let denominator = left.norm * right.norm;
        if denominator <= 0.0 || !denominator.is_finite() {
            return 1.0;
        }
        // Theoretical range is [-1, 1], but numerical noise can spill over.
        let similarity = (dot(left.vector, right.vector) / denominator).clamp(-1.0, 1.0);
        (1.0 - similarity) as f32
    }
}

use super::{ScoreFunction, ScoreOperand};

/// Squared Euclidean distance. Norms are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct SquaredEuclidean;

impl ScoreFunction for SquaredEuclidean {
    fn name(&self) -> &'static str {
        "squared-euclidean"
    }

    fn score(&self, left: ScoreOperand<'_>, right: ScoreOperand<'_>) -> f32 {
        let sum: f64 = left
            .vector
            .iter()
            .zip(right.vector)
            .map(|(&l, &r)| {
                let delta = f64::from(l) - f64::from(r);
                delta * delta
            })
            .sum();
        sum as f32
    }
}

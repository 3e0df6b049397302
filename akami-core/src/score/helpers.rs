//! Shared accumulation helpers for the built-in metrics.

/// Accumulates the dot product of two equally sized vectors in `f64`.
///
/// Mismatched lengths are truncated to the shorter vector; the engine rejects
/// such vectors long before they reach a metric.
pub(crate) fn dot(left: &[f32], right: &[f32]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(&l, &r)| f64::from(l) * f64::from(r))
        .sum()
}

/// Computes the L2 norm of `vector`.
pub(crate) fn l2_norm(vector: &[f32]) -> f64 {
    let squares: f64 = vector.iter().map(|&v| f64::from(v) * f64::from(v)).sum();
    squares.sqrt()
}

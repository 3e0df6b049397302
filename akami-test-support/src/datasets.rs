//! Seeded synthetic vector datasets.

use rand::{Rng, SeedableRng, distributions::Uniform, rngs::SmallRng};

/// Generates `count` vectors of width `dims` with components drawn uniformly
/// from `[-1, 1)`. The same seed always yields the same vectors.
///
/// # Examples
/// ```
/// use akami_test_support::datasets::uniform_vectors;
///
/// let vectors = uniform_vectors(4, 3, 7);
/// assert_eq!(vectors.len(), 4);
/// assert!(vectors.iter().all(|vector| vector.len() == 3));
/// assert_eq!(vectors, uniform_vectors(4, 3, 7));
/// ```
#[must_use]
pub fn uniform_vectors(count: usize, dims: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let range = Uniform::new(-1.0_f32, 1.0);
    (0..count)
        .map(|_| (0..dims).map(|_| rng.sample(range)).collect())
        .collect()
}

/// Generates `clusters * per_cluster` vectors scattered tightly around
/// `clusters` random centres, centre by centre.
///
/// Useful for exercising the neighbour-diversity heuristic, which matters
/// most when many candidates crowd the same region.
#[must_use]
pub fn clustered_vectors(clusters: usize, per_cluster: usize, dims: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let centre_range = Uniform::new(-10.0_f32, 10.0);
    let jitter = Uniform::new(-0.5_f32, 0.5);
    let mut vectors = Vec::with_capacity(clusters * per_cluster);
    for _ in 0..clusters {
        let centre: Vec<f32> = (0..dims).map(|_| rng.sample(centre_range)).collect();
        for _ in 0..per_cluster {
            vectors.push(
                centre
                    .iter()
                    .map(|component| component + rng.sample(jitter))
                    .collect(),
            );
        }
    }
    vectors
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 4)]
    #[case(10, 1)]
    #[case(25, 16)]
    fn uniform_vectors_have_requested_shape(#[case] count: usize, #[case] dims: usize) {
        let vectors = uniform_vectors(count, dims, 1);
        assert_eq!(vectors.len(), count);
        assert!(vectors.iter().flatten().all(|value| (-1.0..1.0).contains(value)));
    }

    #[rstest]
    fn different_seeds_differ() {
        assert_ne!(uniform_vectors(3, 3, 1), uniform_vectors(3, 3, 2));
    }

    #[rstest]
    fn clustered_vectors_stay_near_their_centre() {
        let vectors = clustered_vectors(3, 5, 2, 9);
        assert_eq!(vectors.len(), 15);
        for cluster in vectors.chunks(5) {
            let first = &cluster[0];
            for other in cluster {
                for (a, b) in first.iter().zip(other) {
                    assert!((a - b).abs() <= 1.0);
                }
            }
        }
    }
}

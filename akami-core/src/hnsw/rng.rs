//! Level sampling for new nodes.

use rand::{Rng, SeedableRng, distributions::Standard, rngs::SmallRng};

/// Highest level a sampled node may occupy.
pub const MAX_LEVEL: usize = 16;

/// Seed used when the builder is not given one.
pub(crate) const DEFAULT_RNG_SEED: u64 = 0x5EED_A4A1;

/// Draws node levels from `floor(-ln(U) * multiplier)` with `U` uniform on
/// `(0, 1]`, capped at [`MAX_LEVEL`].
#[derive(Debug)]
pub(crate) struct LevelSampler {
    rng: SmallRng,
    multiplier: f64,
}

impl LevelSampler {
    pub(crate) fn new(seed: u64, multiplier: f64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            multiplier,
        }
    }

    pub(crate) fn sample(&mut self) -> usize {
        let draw: f64 = self.rng.sample(Standard);
        level_for_draw(1.0 - draw, self.multiplier)
    }
}

/// Maps a uniform draw on `(0, 1]` to a level.
pub(crate) fn level_for_draw(uniform: f64, multiplier: f64) -> usize {
    let scaled = -uniform.clamp(f64::MIN_POSITIVE, 1.0).ln() * multiplier;
    if !scaled.is_finite() || scaled <= 0.0 {
        return 0;
    }
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "value is finite, non-negative, and capped below"
    )]
    let level = scaled.floor().min(MAX_LEVEL as f64) as usize;
    level
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1.0, 0)]
    #[case(0.5, 0)]
    #[case(1.0 / 20.0, 1)]
    #[case(1.0 / 300.0, 2)]
    #[case(f64::MIN_POSITIVE, MAX_LEVEL)]
    fn maps_draws_to_levels(#[case] uniform: f64, #[case] expected: usize) {
        let multiplier = 1.0 / 16_f64.ln();
        assert_eq!(level_for_draw(uniform, multiplier), expected);
    }

    #[test]
    fn level_sampling_matches_geometric_tail() {
        let m = 16_f64;
        let mut sampler = LevelSampler::new(1337, m.ln().recip());
        let mut counts = vec![0_usize; MAX_LEVEL + 1];
        for _ in 0..20_000 {
            counts[sampler.sample()] += 1;
        }
        let continue_prob = 1.0 / m;
        for window in counts
            .windows(2)
            .filter(|pair| pair[0] > 0 && pair[1] > 0)
            .take(2)
        {
            let ratio = window[1] as f64 / window[0] as f64;
            assert!(
                (ratio - continue_prob).abs() < 0.035,
                "ratio should approach geometric tail (observed {ratio}, expected {continue_prob})",
            );
        }
    }

    #[test]
    fn identical_seeds_sample_identical_levels() {
        let multiplier = 4_f64.ln().recip();
        let mut left = LevelSampler::new(7, multiplier);
        let mut right = LevelSampler::new(7, multiplier);
        let a: Vec<_> = (0..64).map(|_| left.sample()).collect();
        let b: Vec<_> = (0..64).map(|_| right.sample()).collect();
        assert_eq!(a, b);
    }
}

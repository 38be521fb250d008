//! Random row and label subsets for jungle growth.

use rand::Rng;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::error::JungleError;

/// Draws random subsets from an injected random source.
///
/// Every draw is a fresh shuffle followed by a take, so subsets never
/// contain duplicates.
#[derive(Debug, Clone)]
pub struct Sampler<R = ChaCha8Rng> {
    rng: R,
}

impl Sampler<ChaCha8Rng> {
    /// Create a sampler backed by a `ChaCha8Rng` seeded with `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> Sampler<R> {
    /// Create a sampler that draws from `rng`.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Draw `count` distinct row indices from `0..n_rows`.
    ///
    /// # Errors
    ///
    /// [`JungleError::InsufficientRows`] when `count > n_rows`.
    pub fn rows(&mut self, n_rows: usize, count: usize) -> Result<Vec<usize>, JungleError> {
        if count > n_rows {
            return Err(JungleError::InsufficientRows {
                requested: count,
                available: n_rows,
            });
        }
        let mut all: Vec<usize> = (0..n_rows).collect();
        all.shuffle(&mut self.rng);
        all.truncate(count);
        Ok(all)
    }

    /// Draw `⌊√k⌋` distinct labels from the `k` labels in `labels`.
    #[must_use]
    pub fn label_subspace(&mut self, labels: &[String]) -> Vec<String> {
        let count = (labels.len() as f64).sqrt().floor() as usize;
        let mut all = labels.to_vec();
        all.shuffle(&mut self.rng);
        all.truncate(count);
        all
    }

    /// Draw one `u64`, used to seed independent per-tree samplers.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn rows_are_distinct_and_in_range() {
        let mut sampler = Sampler::seeded(7);
        let rows = sampler.rows(20, 12).unwrap();
        assert_eq!(rows.len(), 12);
        assert!(rows.iter().all(|&r| r < 20));
        let unique: HashSet<_> = rows.iter().collect();
        assert_eq!(unique.len(), 12);
    }

    #[test]
    fn full_draw_is_a_permutation() {
        let mut rows = Sampler::seeded(3).rows(10, 10).unwrap();
        rows.sort_unstable();
        assert_eq!(rows, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn oversized_draw_fails() {
        let err = Sampler::seeded(1).rows(5, 6).unwrap_err();
        assert!(matches!(
            err,
            JungleError::InsufficientRows { requested: 6, available: 5 }
        ));
    }

    #[test]
    fn label_subspace_is_floor_sqrt() {
        let labels: Vec<String> = (0..10).map(|i| format!("c{i}")).collect();
        let mut sampler = Sampler::seeded(11);
        let drawn = sampler.label_subspace(&labels);
        assert_eq!(drawn.len(), 3);
        assert!(drawn.iter().all(|l| labels.contains(l)));
        let unique: HashSet<_> = drawn.iter().collect();
        assert_eq!(unique.len(), 3);

        assert_eq!(sampler.label_subspace(&labels[..3]).len(), 1);
        assert_eq!(sampler.label_subspace(&labels[..4]).len(), 2);
    }

    #[test]
    fn same_seed_same_draws() {
        let a = Sampler::seeded(99).rows(50, 10).unwrap();
        let b = Sampler::seeded(99).rows(50, 10).unwrap();
        assert_eq!(a, b);
    }
}

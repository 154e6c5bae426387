//! Seeded, replayable randomness for the exploration strategies.
//!
//! Every nondeterministic choice a strategy makes flows through a
//! [`SeededRng`], so an exploration is fully determined by its seed and the
//! sequence of calls: re-running the same program under the same seed
//! replays the same schedule. The wrapper remembers its seed so strategies
//! can print it in their description tags and rewind to a pristine stream
//! on reset.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// A deterministic RNG with a remembered seed.
#[derive(Debug, Clone)]
pub struct SeededRng {
    seed: u64,
    rng: StdRng,
}

impl SeededRng {
    /// Create a generator seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The seed this generator was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Rewind to the pristine stream produced by the original seed.
    pub fn reseed(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }

    /// Draw a uniform value in `[0, bound)`.
    ///
    /// # Panics
    /// Panics if `bound == 0`.
    pub fn next_index(&mut self, bound: u64) -> u64 {
        assert!(bound > 0, "cannot draw from an empty range");
        self.rng.gen_range(0..bound)
    }

    /// Draw a uniform `usize` in `[0, bound)`.
    ///
    /// # Panics
    /// Panics if `bound == 0`.
    pub fn next_usize(&mut self, bound: usize) -> usize {
        self.next_index(bound as u64) as usize
    }

    /// Return `true` with probability `1/max`.
    ///
    /// # Panics
    /// Panics if `max == 0`.
    pub fn next_bool(&mut self, max: u64) -> bool {
        self.next_index(max) == 0
    }

    /// Pick one element of `items` uniformly at random.
    ///
    /// # Panics
    /// Panics if `items` is empty.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        assert!(!items.is_empty(), "cannot pick from an empty slice");
        &items[self.next_usize(items.len())]
    }

    /// Draw `count` distinct values from `[0, upper)` without replacement.
    ///
    /// Runs a partial Fisher–Yates shuffle over the full range, so every
    /// subset of size `min(count, upper)` is equally likely. The result is
    /// in shuffle order, not sorted.
    pub fn sample_indices(&mut self, upper: u64, count: usize) -> Vec<u64> {
        let pool: Vec<u64> = (0..upper).collect();
        self.sample(&pool, count)
    }

    /// Draw `count` elements of `items` without replacement, again via a
    /// partial Fisher–Yates shuffle.
    pub fn sample<T: Copy>(&mut self, items: &[T], count: usize) -> Vec<T> {
        let mut pool = items.to_vec();
        let count = count.min(pool.len());
        let (sampled, _) = pool.partial_shuffle(&mut self.rng, count);
        sampled.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn same_seed_same_stream() {
        let mut a = SeededRng::new(42);
        let mut b = SeededRng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_index(1000), b.next_index(1000));
        }
    }

    #[test]
    fn reseed_rewinds_the_stream() {
        let mut rng = SeededRng::new(7);
        let first: Vec<u64> = (0..20).map(|_| rng.next_index(64)).collect();
        rng.reseed();
        let second: Vec<u64> = (0..20).map(|_| rng.next_index(64)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn next_index_stays_in_range() {
        let mut rng = SeededRng::new(0);
        for bound in [1, 2, 3, 17, 1024] {
            for _ in 0..200 {
                assert!(rng.next_index(bound) < bound);
            }
        }
    }

    #[test]
    fn next_bool_with_max_one_is_always_true() {
        let mut rng = SeededRng::new(9);
        assert!((0..50).all(|_| rng.next_bool(1)));
    }

    #[test]
    fn sample_indices_are_distinct_and_in_range() {
        let mut rng = SeededRng::new(3);
        let sample = rng.sample_indices(10, 4);
        assert_eq!(sample.len(), 4);
        let unique: HashSet<u64> = sample.iter().copied().collect();
        assert_eq!(unique.len(), 4);
        assert!(sample.iter().all(|&v| v < 10));
    }

    #[test]
    fn sample_indices_clamps_to_the_range_size() {
        let mut rng = SeededRng::new(3);
        let sample = rng.sample_indices(3, 10);
        assert_eq!(sample.len(), 3);
        let unique: HashSet<u64> = sample.iter().copied().collect();
        assert_eq!(unique, HashSet::from([0, 1, 2]));
    }

    #[test]
    fn sample_indices_from_empty_range_is_empty() {
        let mut rng = SeededRng::new(3);
        assert!(rng.sample_indices(0, 5).is_empty());
    }
}

//! Injectable randomness for challenge generation.
//!
//! Randomness only decides *which* eligible candidates win; eligibility is
//! always computed before the sampler is consulted.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub trait Sampler {
    /// `true` with the given probability. `>= 1.0` always, `<= 0.0` never.
    fn roll(&mut self, probability: f64) -> bool;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick_index(&mut self, len: usize) -> usize;

    /// In-place Fisher-Yates shuffle
    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.pick_index(i + 1);
            items.swap(i, j);
        }
    }
}

/// ChaCha8-backed sampler, seeded per call so results are reproducible.
#[derive(Debug, Clone)]
pub struct SeededSampler {
    rng: ChaCha8Rng,
}

impl SeededSampler {
    pub fn from_seed(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }
}

impl Sampler for SeededSampler {
    fn roll(&mut self, probability: f64) -> bool {
        if probability >= 1.0 {
            return true;
        }
        if probability <= 0.0 {
            return false;
        }
        self.rng.gen::<f64>() < probability
    }

    fn pick_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        self.rng.gen_range(0..len)
    }
}

/// Sampler that never reorders: rolls return a fixed answer, picks take the first item.
#[derive(Debug, Clone, Copy)]
pub struct FixedSampler {
    pub rolls: bool,
}

impl FixedSampler {
    pub fn always() -> Self {
        Self { rolls: true }
    }

    pub fn never() -> Self {
        Self { rolls: false }
    }
}

impl Sampler for FixedSampler {
    fn roll(&mut self, probability: f64) -> bool {
        if probability >= 1.0 {
            return true;
        }
        if probability <= 0.0 {
            return false;
        }
        self.rolls
    }

    fn pick_index(&mut self, _len: usize) -> usize {
        0
    }

    fn shuffle<T>(&mut self, _items: &mut [T]) {}
}

//! # Randomness Source
//!
//! Every nondeterministic choice of a build (candidate shuffles, mirror
//! fallback, repair brick and neighbour selection) goes through one
//! [`RandomSource`]. Seeding it fixes the whole build.
//!
//! - [`SeededRandom`]: `ChaCha8` stream from a `u64` seed
//! - [`ScriptedRandom`]: replays a fixed index sequence (tests)

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A source of uniform indices.
pub trait RandomSource {
    /// Returns an index in `0..bound`. `bound` is never zero.
    fn next_index(&mut self, bound: usize) -> usize;
}

impl dyn RandomSource + '_ {
    /// Picks one element uniformly, or `None` for an empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            items.get(self.next_index(items.len()))
        }
    }

    /// Fisher-Yates shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_index(i + 1);
            items.swap(i, j);
        }
    }
}

/// Deterministic source backed by `ChaCha8`.
#[derive(Clone, Debug)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    /// Creates a source from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    #[inline]
    fn next_index(&mut self, bound: usize) -> usize {
        self.rng.gen_range(0..bound)
    }
}

/// Replays a scripted sequence of indices, each reduced modulo the bound.
///
/// Once the script runs out every draw returns `0`.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRandom {
    script: VecDeque<usize>,
}

impl ScriptedRandom {
    /// Creates a source that replays `script`.
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = usize>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    /// Always picks the first option.
    #[must_use]
    pub fn first() -> Self {
        Self::default()
    }
}

impl RandomSource for ScriptedRandom {
    fn next_index(&mut self, bound: usize) -> usize {
        self.script.pop_front().map_or(0, |i| i % bound)
    }
}

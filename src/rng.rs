//! Deterministic PRNG for simulator adapters.
//!
//! At match start every participant receives the same shared seed, and a
//! conforming simulator must derive all of its entropy from it. This module
//! provides a minimal PCG32 generator whose state is plain data: adapters
//! embed it in their game state so that `save_state`/`load_state` capture
//! and restore the entropy stream exactly. The engine itself never consumes
//! the seed.

use serde::{Deserialize, Serialize};

const PCG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const PCG_DEFAULT_STREAM: u64 = 1_442_695_040_888_963_407;

/// A PCG32 pseudo-random number generator.
///
/// Small (two `u64`s), fast, statistically solid, and — most importantly
/// here — fully deterministic across platforms. Clone/serialize freely; a
/// restored generator continues the exact same stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pcg32 {
    state: u64,
    increment: u64,
}

impl Pcg32 {
    /// Creates a generator from a seed and a stream selector.
    ///
    /// Two generators with the same seed but different streams produce
    /// unrelated sequences; useful when one match seed must feed several
    /// independent consumers (e.g. one stream per player slot).
    #[must_use]
    pub fn new(seed: u64, stream: u64) -> Self {
        let mut rng = Self {
            state: 0,
            increment: (stream << 1) | 1,
        };
        rng.next_u32();
        rng.state = rng.state.wrapping_add(seed);
        rng.next_u32();
        rng
    }

    /// Creates a generator from the 31-bit shared match seed, using the
    /// default stream.
    #[must_use]
    pub fn from_match_seed(seed: u32) -> Self {
        Self::new(u64::from(seed), PCG_DEFAULT_STREAM)
    }

    /// Returns the next `u32` in the sequence.
    pub fn next_u32(&mut self) -> u32 {
        let old_state = self.state;
        self.state = old_state
            .wrapping_mul(PCG_MULTIPLIER)
            .wrapping_add(self.increment);
        let xorshifted = (((old_state >> 18) ^ old_state) >> 27) as u32;
        let rot = (old_state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    /// Returns a uniformly distributed value in `0..bound`.
    ///
    /// Uses rejection sampling to avoid modulo bias. Returns 0 for a zero
    /// bound.
    pub fn next_below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        let threshold = bound.wrapping_neg() % bound;
        loop {
            let candidate = self.next_u32();
            if candidate >= threshold {
                return candidate % bound;
            }
        }
    }
}

// #########
// # TESTS #
// #########

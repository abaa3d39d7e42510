//! Deterministic state checksums.
//!
//! Desyncs between peers are only detectable by comparing checksums of
//! snapshots taken at the same frame. The standard library's default hasher
//! is randomized per process, so it can never be compared across peers;
//! this module provides FNV-1a, which is stable across platforms, fast for
//! the small-to-medium buffers produced by `save_state`, and good enough
//! for corruption detection (it is not cryptographic).

use std::hash::{Hash, Hasher};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Computes the FNV-1a hash of a byte slice.
#[must_use]
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// A [`Hasher`] implementation backed by FNV-1a, for checksumming any
/// `Hash` state type deterministically.
#[derive(Debug, Clone, Copy)]
pub struct Fnv1aHasher(u64);

impl Default for Fnv1aHasher {
    fn default() -> Self {
        Self(FNV_OFFSET_BASIS)
    }
}

impl Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 ^= u64::from(*byte);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }
}

/// Computes a deterministic checksum of any `Hash` value.
#[must_use]
pub fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = Fnv1aHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

// #########
// # TESTS #
// #########

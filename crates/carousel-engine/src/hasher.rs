//! Key-to-score hashing.

use std::hash::Hasher;

use carousel_types::{MAX_SCORE, Score};
use twox_hash::XxHash32;

/// Maps a string to a ring score in `[0, MAX_SCORE)`.
///
/// Implementations must be deterministic, uniformly distributed, and stable
/// across process restarts. A ring must never mix hashers: every node and
/// data key placed on one ring has to go through the same implementation.
pub trait KeyHasher: Send + Sync {
    /// Hash `key` into the score domain.
    fn score(&self, key: &str) -> Score;
}

/// Default hasher: 32-bit xxHash with a fixed seed, reduced into the score
/// domain.
#[derive(Debug, Default, Clone, Copy)]
pub struct XxHasher;

impl KeyHasher for XxHasher {
    fn score(&self, key: &str) -> Score {
        let mut hasher = XxHash32::with_seed(0);
        hasher.write(key.as_bytes());
        (hasher.finish() as u32 % MAX_SCORE as u32) as Score
    }
}

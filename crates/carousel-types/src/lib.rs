//! Shared types for the Carousel placement engine.
//!
//! This crate defines the score domain of the hash ring (a 32-bit circular
//! keyspace), the virtual-node key encoding, and the [`Migration`] record
//! produced by topology changes and handed to the caller's migrator.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A position on the ring.
///
/// Scores live in the half-open range `[0, MAX_SCORE)` and wrap modulo
/// [`MAX_SCORE`]: incrementing past `MAX_SCORE - 1` lands on `0`.
pub type Score = i32;

/// Exclusive upper bound of the score domain: `2^31 - 1`.
pub const MAX_SCORE: Score = i32::MAX;

/// Step one position clockwise, wrapping at the top of the score domain.
pub fn incr_score(score: Score) -> Score {
    if score == MAX_SCORE - 1 { 0 } else { score + 1 }
}

/// Step one position counter-clockwise, wrapping at zero.
pub fn decr_score(score: Score) -> Score {
    if score == 0 { MAX_SCORE - 1 } else { score - 1 }
}

/// Encode the `index`-th virtual node of `node_id` as its ring key.
pub fn vnode_key(node_id: &str, index: usize) -> String {
    format!("{node_id}_{index}")
}

/// Recover the physical node ID from a virtual-node key.
///
/// The replica index is the suffix after the last `_`, so node IDs may
/// themselves contain underscores.
pub fn node_id_of(vkey: &str) -> &str {
    match vkey.rfind('_') {
        Some(pos) => &vkey[..pos],
        None => vkey,
    }
}

/// A batch of data keys that must move between two nodes after a topology
/// change.
///
/// One `Migration` is produced per virtual node that gained or lost
/// ownership of an arc. The engine has already rebound the keys in the
/// ring's bookkeeping; the caller's migrator performs the actual data
/// relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    /// Node that currently holds the data.
    pub from: String,
    /// Node that owns the data after the change.
    pub to: String,
    /// The data keys that must move.
    pub keys: HashSet<String>,
}

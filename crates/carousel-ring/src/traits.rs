//! Core trait for ring backends.

use std::collections::{HashMap, HashSet};

use carousel_types::Score;

use crate::error::RingError;

/// Ordered ring state plus auxiliary bookkeeping and an exclusive lock.
///
/// All implementations must be `Send + Sync` for use across async tasks.
/// The placement engine holds the lock for the whole of a topology change
/// or lookup; the remaining operations do not themselves check lock
/// ownership, so a remote backend is free to enforce it server-side.
///
/// Scores are circular: [`ceiling`](HashRing::ceiling) and
/// [`floor`](HashRing::floor) wrap around the ends of the score domain and
/// return `None` only when the ring has no slots at all.
#[async_trait::async_trait]
pub trait HashRing: Send + Sync {
    /// Acquire exclusive ownership of the ring.
    ///
    /// Ownership auto-releases after `expire_secs` seconds; zero or
    /// negative means no auto-expiry. Blocks (or fails, for backends that
    /// cannot wait) until the ring is free.
    async fn lock(&self, expire_secs: i64) -> Result<(), RingError>;

    /// Release the lock held by this caller.
    ///
    /// Fails with [`RingError::LockNotHeld`] if the lock is free and
    /// [`RingError::LockNotOwned`] if another caller owns it.
    async fn unlock(&self) -> Result<(), RingError>;

    /// Append `vkey` to the slot at `score`, creating the slot if needed.
    /// Idempotent if the vkey is already present.
    async fn add(&self, score: Score, vkey: &str) -> Result<(), RingError>;

    /// Remove `vkey` from the slot at `score`; the slot itself is removed
    /// once its last vkey goes. Fails if the slot or the vkey is absent.
    async fn remove(&self, score: Score, vkey: &str) -> Result<(), RingError>;

    /// Smallest slot score `>= score`, wrapping to the minimum slot score
    /// when none exists above. `None` iff the ring is empty.
    async fn ceiling(&self, score: Score) -> Result<Option<Score>, RingError>;

    /// Largest slot score `<= score`, wrapping to the maximum slot score
    /// when none exists below. `None` iff the ring is empty.
    async fn floor(&self, score: Score) -> Result<Option<Score>, RingError>;

    /// The ordered vkey list at `score`. Fails if the slot is absent.
    async fn slot(&self, score: Score) -> Result<Vec<String>, RingError>;

    /// Snapshot of the node → replica-count map. Doubles as the
    /// authoritative "node exists" index.
    async fn nodes(&self) -> Result<HashMap<String, usize>, RingError>;

    /// Upsert a node's replica count.
    async fn put_node_replicas(&self, node_id: &str, replicas: usize) -> Result<(), RingError>;

    /// Delete a node's replica-count entry.
    async fn delete_node_replicas(&self, node_id: &str) -> Result<(), RingError>;

    /// Snapshot of the data keys currently assigned to `node_id`
    /// (empty if none).
    async fn data_keys(&self, node_id: &str) -> Result<HashSet<String>, RingError>;

    /// Union `keys` into the node's data-key set.
    async fn add_data_keys(&self, node_id: &str, keys: &HashSet<String>) -> Result<(), RingError>;

    /// Subtract `keys` from the node's data-key set, deleting the set once
    /// empty. Keys not present are ignored.
    async fn remove_data_keys(&self, node_id: &str, keys: &HashSet<String>)
    -> Result<(), RingError>;
}

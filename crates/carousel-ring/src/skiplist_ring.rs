//! In-process ring backend backed by a skiplist.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use carousel_types::Score;
use tracing::debug;

use crate::error::RingError;
use crate::lock::ExpiringLock;
use crate::skiplist::Skiplist;
use crate::traits::HashRing;

#[derive(Default)]
struct RingState {
    slots: Skiplist,
    /// Node → effective replica count; doubles as the node-exists index.
    replicas: HashMap<String, usize>,
    /// Node → data keys currently assigned to it. Entries are removed when
    /// their set empties, so a present entry is always non-empty.
    data_keys: HashMap<String, HashSet<String>>,
}

/// Reference in-process ring backend.
///
/// Ordered slot storage is a skiplist; the auxiliary maps are plain hash
/// maps. All reads return snapshots so callers never alias into the shared
/// state. The ring lock is a separate, self-expiring exclusive lock; the
/// interior `RwLock` only protects the data structures themselves.
pub struct SkiplistRing {
    lock: ExpiringLock,
    state: RwLock<RingState>,
}

impl SkiplistRing {
    /// Create a new empty ring.
    pub fn new() -> Self {
        Self {
            lock: ExpiringLock::new(),
            state: RwLock::new(RingState::default()),
        }
    }
}

impl Default for SkiplistRing {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl HashRing for SkiplistRing {
    async fn lock(&self, expire_secs: i64) -> Result<(), RingError> {
        self.lock.lock(expire_secs).await;
        Ok(())
    }

    async fn unlock(&self) -> Result<(), RingError> {
        self.lock.unlock()
    }

    async fn add(&self, score: Score, vkey: &str) -> Result<(), RingError> {
        let mut state = self.state.write().expect("lock poisoned");
        state.slots.insert(score, vkey);
        debug!(score, vkey, slots = state.slots.len(), "added vnode to ring");
        Ok(())
    }

    async fn remove(&self, score: Score, vkey: &str) -> Result<(), RingError> {
        let mut state = self.state.write().expect("lock poisoned");
        let Some(vkeys) = state.slots.vkeys(score) else {
            return Err(RingError::SlotNotFound(score));
        };
        if !vkeys.iter().any(|v| v == vkey) {
            return Err(RingError::VnodeNotFound {
                score,
                vkey: vkey.to_string(),
            });
        }
        state.slots.remove(score, vkey);
        debug!(score, vkey, "removed vnode from ring");
        Ok(())
    }

    async fn ceiling(&self, score: Score) -> Result<Option<Score>, RingError> {
        let state = self.state.read().expect("lock poisoned");
        if state.slots.is_empty() {
            return Ok(None);
        }
        Ok(state.slots.ceiling(score).or_else(|| state.slots.first()))
    }

    async fn floor(&self, score: Score) -> Result<Option<Score>, RingError> {
        let state = self.state.read().expect("lock poisoned");
        if state.slots.is_empty() {
            return Ok(None);
        }
        Ok(state.slots.floor(score).or_else(|| state.slots.last()))
    }

    async fn slot(&self, score: Score) -> Result<Vec<String>, RingError> {
        let state = self.state.read().expect("lock poisoned");
        state
            .slots
            .vkeys(score)
            .map(|vkeys| vkeys.to_vec())
            .ok_or(RingError::SlotNotFound(score))
    }

    async fn nodes(&self) -> Result<HashMap<String, usize>, RingError> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.replicas.clone())
    }

    async fn put_node_replicas(&self, node_id: &str, replicas: usize) -> Result<(), RingError> {
        let mut state = self.state.write().expect("lock poisoned");
        state.replicas.insert(node_id.to_string(), replicas);
        Ok(())
    }

    async fn delete_node_replicas(&self, node_id: &str) -> Result<(), RingError> {
        let mut state = self.state.write().expect("lock poisoned");
        state.replicas.remove(node_id);
        Ok(())
    }

    async fn data_keys(&self, node_id: &str) -> Result<HashSet<String>, RingError> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.data_keys.get(node_id).cloned().unwrap_or_default())
    }

    async fn add_data_keys(&self, node_id: &str, keys: &HashSet<String>) -> Result<(), RingError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut state = self.state.write().expect("lock poisoned");
        state
            .data_keys
            .entry(node_id.to_string())
            .or_default()
            .extend(keys.iter().cloned());
        Ok(())
    }

    async fn remove_data_keys(
        &self,
        node_id: &str,
        keys: &HashSet<String>,
    ) -> Result<(), RingError> {
        let mut state = self.state.write().expect("lock poisoned");
        let Some(assigned) = state.data_keys.get_mut(node_id) else {
            return Ok(());
        };
        for key in keys {
            assigned.remove(key);
        }
        if assigned.is_empty() {
            state.data_keys.remove(node_id);
        }
        Ok(())
    }
}

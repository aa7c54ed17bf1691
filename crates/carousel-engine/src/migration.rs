//! Migration computation: which keys move where on a topology change.
//!
//! The keyspace is circular, so an arc may cross zero. The comparisons
//! linearise such arcs by shifting scores down by the ring modulus onto a
//! virtual negative axis; all arithmetic is done in `i64` so the shifts
//! cannot underflow, and the stored scores stay in the 32-bit domain.

use std::collections::HashSet;

use carousel_types::{MAX_SCORE, Migration, Score, decr_score, incr_score, node_id_of};
use tracing::debug;

use crate::engine::CarouselEngine;
use crate::error::EngineError;

/// Ring modulus for arc linearisation.
const MODULUS: i64 = MAX_SCORE as i64;

impl CarouselEngine {
    /// Inbound migration for a virtual node that just joined at `score`.
    ///
    /// Any data key hashing into the arc that ends at `score` (exclusive at
    /// the previous slot, inclusive at `score`) was owned by the next
    /// slot's owner and must move to `node_id`. Returns `None` when nothing
    /// moves: the new vkey is not its slot's owner, the ring has only this
    /// slot, or the arc holds no keys.
    pub(crate) async fn migrate_in(
        &self,
        score: Score,
        node_id: &str,
    ) -> Result<Option<Migration>, EngineError> {
        if !self.has_migrator() {
            return Ok(None);
        }

        // A slot with more than one vkey already had an owner; joining it
        // changes nothing.
        let vkeys = self.ring().slot(score).await?;
        if vkeys.len() > 1 {
            return Ok(None);
        }

        let Some(last_score) = self.ring().floor(decr_score(score)).await? else {
            return Ok(None);
        };
        if last_score == score {
            return Ok(None);
        }

        let Some(next_score) = self.ring().ceiling(incr_score(score)).await? else {
            return Ok(None);
        };
        if next_score == score {
            return Ok(None);
        }

        // Pattern one: the arc (last, score] crosses zero. Pattern two:
        // score is the ring maximum and the successor wrapped past zero.
        let pattern_one = last_score > score;
        let pattern_two = next_score < score;

        let mut virtual_score = score as i64;
        let mut last = last_score as i64;
        if pattern_one {
            last -= MODULUS;
        }
        if pattern_two {
            virtual_score -= MODULUS;
            last -= MODULUS;
        }

        let next_vkeys = self.ring().slot(next_score).await?;
        let Some(next_owner_vkey) = next_vkeys.first() else {
            return Ok(None);
        };
        let from = node_id_of(next_owner_vkey).to_string();

        let candidates = self.ring().data_keys(&from).await?;
        let mut keys = HashSet::new();
        for data_key in candidates {
            let mut data_score = self.hasher().score(&data_key) as i64;
            if pattern_one && data_score > last + MODULUS {
                data_score -= MODULUS;
            }
            if pattern_two {
                data_score -= MODULUS;
            }
            if data_score <= last || data_score > virtual_score {
                continue;
            }
            keys.insert(data_key);
        }

        if keys.is_empty() {
            return Ok(None);
        }

        self.ring().remove_data_keys(&from, &keys).await?;
        self.ring().add_data_keys(node_id, &keys).await?;
        debug!(
            score,
            from,
            to = node_id,
            keys = keys.len(),
            "inbound migration"
        );

        Ok(Some(Migration {
            from,
            to: node_id.to_string(),
            keys,
        }))
    }

    /// Outbound migration for a leaving node's virtual node at `score`.
    ///
    /// The keys in the vnode's arc go to the next valid owner: the second
    /// vkey sharing the slot if there is one, otherwise the first distinct
    /// node found walking clockwise. Fails with
    /// [`EngineError::NoOtherNode`] when the node holds data and nobody
    /// else can take it.
    pub(crate) async fn migrate_out(
        &self,
        score: Score,
        node_id: &str,
    ) -> Result<Option<Migration>, EngineError> {
        if !self.has_migrator() {
            return Ok(None);
        }

        let vkeys = self.ring().slot(score).await?;
        let Some(first) = vkeys.first() else {
            return Ok(None);
        };
        // Only the slot owner's departure moves data.
        if node_id_of(first) != node_id {
            return Ok(None);
        }

        let all_keys = self.ring().data_keys(node_id).await?;
        if all_keys.is_empty() {
            return Ok(None);
        }

        let last_score = self.ring().floor(decr_score(score)).await?;
        let only_slot = last_score.is_none() || last_score == Some(score);
        if only_slot && vkeys.len() == 1 {
            return Err(EngineError::NoOtherNode);
        }

        // With a single slot, every key the node holds moves; otherwise
        // select the keys inside the arc (last, score], linearised if it
        // crosses zero.
        let mut last = last_score.unwrap_or(0) as i64;
        let pattern = !only_slot && last > score as i64;
        if pattern {
            last -= MODULUS;
        }

        let mut keys = HashSet::new();
        for data_key in all_keys {
            if only_slot {
                keys.insert(data_key);
                continue;
            }
            let mut data_score = self.hasher().score(&data_key) as i64;
            if pattern && data_score > last + MODULUS {
                data_score -= MODULUS;
            }
            if data_score <= last || data_score > score as i64 {
                continue;
            }
            keys.insert(data_key);
        }

        let to = if vkeys.len() > 1 {
            node_id_of(&vkeys[1]).to_string()
        } else {
            match self.next_distinct_node(score, node_id).await? {
                Some(node) => node,
                None => return Err(EngineError::NoOtherNode),
            }
        };

        if keys.is_empty() {
            return Ok(None);
        }

        self.ring().remove_data_keys(node_id, &keys).await?;
        self.ring().add_data_keys(&to, &keys).await?;
        debug!(
            score,
            from = node_id,
            to,
            keys = keys.len(),
            "outbound migration"
        );

        Ok(Some(Migration {
            from: node_id.to_string(),
            to,
            keys,
        }))
    }

    /// Walk clockwise from `score` to the first slot whose owner is not
    /// `avoid`. A slot owned by `avoid` that carries a second vkey yields
    /// that vkey's node. Returns `None` once the walk wraps onto itself
    /// without finding a distinct node.
    pub(crate) async fn next_distinct_node(
        &self,
        score: Score,
        avoid: &str,
    ) -> Result<Option<String>, EngineError> {
        let mut visited: HashSet<Score> = HashSet::new();
        let mut current = score;

        loop {
            let Some(next) = self.ring().ceiling(incr_score(current)).await? else {
                return Ok(None);
            };
            if visited.contains(&next) {
                return Ok(None);
            }

            let vkeys = self.ring().slot(next).await?;
            let Some(first) = vkeys.first() else {
                return Ok(None);
            };

            let owner = node_id_of(first);
            if owner != avoid {
                return Ok(Some(owner.to_string()));
            }
            if vkeys.len() > 1 {
                return Ok(Some(node_id_of(&vkeys[1]).to_string()));
            }

            visited.insert(current);
            current = next;
        }
    }
}

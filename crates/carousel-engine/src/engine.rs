//! [`CarouselEngine`] — the placement orchestrator.
//!
//! Every public operation follows the same shape: acquire the ring lock,
//! query/mutate the ring, release the lock, then fan out any migrations the
//! change produced. Migration callbacks always run unlocked.

use std::collections::HashSet;
use std::sync::Arc;

use carousel_ring::HashRing;
use carousel_types::{Migration, node_id_of, vnode_key};
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::hasher::KeyHasher;
use crate::migrator::Migrator;

/// Default auto-release delay for the ring lock, in seconds.
const DEFAULT_LOCK_EXPIRE_SECS: i64 = 15;

/// Default virtual nodes per unit of node weight.
const DEFAULT_REPLICAS: usize = 5;

/// Smallest and largest accepted node weights; values outside are clamped.
const MIN_WEIGHT: usize = 1;
const MAX_WEIGHT: usize = 10;

/// Configuration for creating a [`CarouselEngine`].
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Auto-release delay for the ring lock, in seconds. Out-of-range
    /// values (`<= 0`) fall back to the default of 15.
    pub lock_expire_secs: i64,
    /// Virtual nodes per unit of node weight: a node of weight `w` gets
    /// `w * replicas` positions on the ring. Zero falls back to the
    /// default of 5.
    pub replicas: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_expire_secs: DEFAULT_LOCK_EXPIRE_SECS,
            replicas: DEFAULT_REPLICAS,
        }
    }
}

/// Consistent-hash placement engine.
///
/// Decides which node owns each data key and drives the data migration
/// triggered when nodes join or leave. Ring state lives behind the
/// [`HashRing`] trait; key hashing behind [`KeyHasher`]; the byte-moving
/// side effects behind an optional [`Migrator`].
pub struct CarouselEngine {
    ring: Arc<dyn HashRing>,
    hasher: Arc<dyn KeyHasher>,
    migrator: Option<Arc<dyn Migrator>>,
    lock_expire_secs: i64,
    replicas: usize,
}

impl CarouselEngine {
    /// Create a new engine over the given ring backend and hasher.
    pub fn new(ring: Arc<dyn HashRing>, hasher: Arc<dyn KeyHasher>, config: EngineConfig) -> Self {
        let lock_expire_secs = if config.lock_expire_secs <= 0 {
            DEFAULT_LOCK_EXPIRE_SECS
        } else {
            config.lock_expire_secs
        };
        let replicas = if config.replicas == 0 {
            DEFAULT_REPLICAS
        } else {
            config.replicas
        };
        Self {
            ring,
            hasher,
            migrator: None,
            lock_expire_secs,
            replicas,
        }
    }

    /// Set the migration callback invoked on topology changes.
    ///
    /// Without a migrator the engine still maintains ring membership and
    /// key lookups, but skips migration computation and the data-key
    /// rebalancing that goes with it.
    pub fn with_migrator(mut self, migrator: Arc<dyn Migrator>) -> Self {
        self.migrator = Some(migrator);
        self
    }

    pub(crate) fn ring(&self) -> &Arc<dyn HashRing> {
        &self.ring
    }

    pub(crate) fn hasher(&self) -> &Arc<dyn KeyHasher> {
        &self.hasher
    }

    pub(crate) fn has_migrator(&self) -> bool {
        self.migrator.is_some()
    }

    /// Add a physical node to the ring.
    ///
    /// The node gets `clamp(weight, 1, 10) * replicas` virtual nodes. For
    /// every virtual node that becomes a slot owner, the data keys in its
    /// arc are rebound from the next slot's owner and handed to the
    /// migrator after the lock is released.
    pub async fn add_node(&self, node_id: &str, weight: usize) -> Result<(), EngineError> {
        self.ring.lock(self.lock_expire_secs).await?;
        let result = self.add_node_locked(node_id, weight).await;
        if let Err(e) = self.ring.unlock().await {
            debug!(%e, "ring unlock failed");
        }
        self.run_migrations(result?).await;
        Ok(())
    }

    async fn add_node_locked(
        &self,
        node_id: &str,
        weight: usize,
    ) -> Result<Vec<Migration>, EngineError> {
        let nodes = self.ring.nodes().await?;
        if nodes.contains_key(node_id) {
            return Err(EngineError::DuplicateNode(node_id.to_string()));
        }

        let replicas = weight.clamp(MIN_WEIGHT, MAX_WEIGHT) * self.replicas;
        self.ring.put_node_replicas(node_id, replicas).await?;
        info!(node_id, weight, replicas, "adding node to ring");

        let mut migrations = Vec::new();
        for index in 0..replicas {
            let vkey = vnode_key(node_id, index);
            let score = self.hasher.score(&vkey);
            self.ring.add(score, &vkey).await?;

            if let Some(migration) = self.migrate_in(score, node_id).await? {
                migrations.push(migration);
            }
        }

        Ok(migrations)
    }

    /// Remove a physical node from the ring.
    ///
    /// Every virtual node the leaving node owned hands the data keys of its
    /// arc to the next valid owner. Fails with
    /// [`EngineError::NoOtherNode`] if the node holds data and no other
    /// node exists to take it.
    pub async fn remove_node(&self, node_id: &str) -> Result<(), EngineError> {
        self.ring.lock(self.lock_expire_secs).await?;
        let result = self.remove_node_locked(node_id).await;
        if let Err(e) = self.ring.unlock().await {
            debug!(%e, "ring unlock failed");
        }
        self.run_migrations(result?).await;
        Ok(())
    }

    async fn remove_node_locked(&self, node_id: &str) -> Result<Vec<Migration>, EngineError> {
        let nodes = self.ring.nodes().await?;
        let Some(&replicas) = nodes.get(node_id) else {
            return Err(EngineError::UnknownNode(node_id.to_string()));
        };

        self.ring.delete_node_replicas(node_id).await?;
        info!(node_id, replicas, "removing node from ring");

        let mut migrations = Vec::new();
        for index in 0..replicas {
            let vkey = vnode_key(node_id, index);
            let score = self.hasher.score(&vkey);

            // Compute the outbound move while the vnode is still on the
            // ring, then drop the vnode.
            let migration = self.migrate_out(score, node_id).await?;
            self.ring.remove(score, &vkey).await?;

            if let Some(migration) = migration {
                migrations.push(migration);
            }
        }

        Ok(migrations)
    }

    /// Look up (and register) the owner of a data key.
    ///
    /// Returns the owning virtual-node key, e.g. `"cache-1_3"`; the
    /// data-key registry records the stripped node ID (`"cache-1"`). Use
    /// [`node_id_of`] to normalise the returned value.
    pub async fn get_node(&self, data_key: &str) -> Result<String, EngineError> {
        self.ring.lock(self.lock_expire_secs).await?;
        let result = self.get_node_locked(data_key).await;
        if let Err(e) = self.ring.unlock().await {
            debug!(%e, "ring unlock failed");
        }
        result
    }

    async fn get_node_locked(&self, data_key: &str) -> Result<String, EngineError> {
        let score = self.hasher.score(data_key);
        let Some(slot_score) = self.ring.ceiling(score).await? else {
            return Err(EngineError::EmptyRing);
        };

        let vkeys = self.ring.slot(slot_score).await?;
        let Some(owner_vkey) = vkeys.first() else {
            return Err(EngineError::EmptyRing);
        };

        let owner = node_id_of(owner_vkey);
        let keys = HashSet::from([data_key.to_string()]);
        self.ring.add_data_keys(owner, &keys).await?;
        debug!(data_key, owner, "registered data key");

        Ok(owner_vkey.clone())
    }

    /// Fan migrations out to the caller's migrator, joining all tasks
    /// before returning. Per-task failures and panics are logged and
    /// swallowed.
    async fn run_migrations(&self, migrations: Vec<Migration>) {
        let Some(migrator) = &self.migrator else {
            return;
        };

        let mut tasks = tokio::task::JoinSet::new();
        for migration in migrations {
            let migrator = Arc::clone(migrator);
            tasks.spawn(async move {
                if let Err(e) = migrator
                    .migrate(&migration.keys, &migration.from, &migration.to)
                    .await
                {
                    warn!(
                        from = %migration.from,
                        to = %migration.to,
                        keys = migration.keys.len(),
                        %e,
                        "migration callback failed"
                    );
                }
            });
        }

        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                warn!(%e, "migration task panicked");
            }
        }
    }
}

//! Shared test harness for carousel integration tests.
//!
//! Provides [`MigratingCluster`] — a placement engine wired to per-node
//! in-memory byte stores and a migrator that physically moves entries
//! between them, so tests can verify that data follows ring ownership
//! across topology changes.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use carousel_engine::{CarouselEngine, EngineConfig, MigrateError, Migrator, XxHasher};
use carousel_ring::SkiplistRing;
use carousel_types::node_id_of;

type NodeStores = HashMap<String, HashMap<String, Vec<u8>>>;

/// Migrator that relocates stored values between node stores.
struct StoreMigrator {
    stores: Arc<Mutex<NodeStores>>,
}

#[async_trait]
impl Migrator for StoreMigrator {
    async fn migrate(
        &self,
        keys: &HashSet<String>,
        from: &str,
        to: &str,
    ) -> Result<(), MigrateError> {
        let mut stores = self.stores.lock().unwrap();
        let moved: Vec<(String, Vec<u8>)> = {
            let Some(source) = stores.get_mut(from) else {
                return Ok(());
            };
            keys.iter().filter_map(|k| source.remove_entry(k)).collect()
        };
        stores.entry(to.to_string()).or_default().extend(moved);
        Ok(())
    }
}

/// A placement engine plus per-node byte stores.
pub struct MigratingCluster {
    engine: CarouselEngine,
    stores: Arc<Mutex<NodeStores>>,
}

impl MigratingCluster {
    /// Create an empty cluster with the given vnodes-per-weight-unit.
    pub fn new(replicas: usize) -> Self {
        let stores: Arc<Mutex<NodeStores>> = Arc::new(Mutex::new(HashMap::new()));
        let ring = Arc::new(SkiplistRing::new());
        let engine = CarouselEngine::new(
            ring,
            Arc::new(XxHasher),
            EngineConfig {
                replicas,
                ..EngineConfig::default()
            },
        )
        .with_migrator(Arc::new(StoreMigrator {
            stores: stores.clone(),
        }));
        Self { engine, stores }
    }

    pub fn engine(&self) -> &CarouselEngine {
        &self.engine
    }

    pub async fn add_node(&self, node_id: &str, weight: usize) {
        self.engine.add_node(node_id, weight).await.unwrap();
        self.stores
            .lock()
            .unwrap()
            .entry(node_id.to_string())
            .or_default();
    }

    pub async fn remove_node(&self, node_id: &str) {
        self.engine.remove_node(node_id).await.unwrap();
        // The migrator has already drained this node's store.
        self.stores.lock().unwrap().remove(node_id);
    }

    /// Write a value to whichever node owns `key`.
    pub async fn put(&self, key: &str, value: &[u8]) {
        let vkey = self.engine.get_node(key).await.unwrap();
        let node = node_id_of(&vkey).to_string();
        self.stores
            .lock()
            .unwrap()
            .entry(node)
            .or_default()
            .insert(key.to_string(), value.to_vec());
    }

    /// Read a value from the node that currently owns `key`.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let vkey = self.engine.get_node(key).await.unwrap();
        let stores = self.stores.lock().unwrap();
        stores
            .get(node_id_of(&vkey))
            .and_then(|store| store.get(key).cloned())
    }

    /// The node `key` currently resolves to.
    pub async fn owner_of(&self, key: &str) -> String {
        let vkey = self.engine.get_node(key).await.unwrap();
        node_id_of(&vkey).to_string()
    }

    /// Number of values stored on `node_id`.
    pub fn stored_on(&self, node_id: &str) -> usize {
        self.stores
            .lock()
            .unwrap()
            .get(node_id)
            .map_or(0, HashMap::len)
    }

    /// Total values across every node store.
    pub fn total_stored(&self) -> usize {
        self.stores.lock().unwrap().values().map(HashMap::len).sum()
    }
}

/// Deterministic test payload.
pub fn test_value(seed: usize) -> Vec<u8> {
    format!("value-{seed}").into_bytes()
}

//! Shared test utilities for carousel-engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use carousel_ring::SkiplistRing;
use carousel_types::{Migration, Score};

use crate::engine::{CarouselEngine, EngineConfig};
use crate::hasher::{KeyHasher, XxHasher};
use crate::migrator::{MigrateError, Migrator};

/// Migrator that records every invocation and succeeds.
#[derive(Default)]
pub struct RecordingMigrator {
    calls: Mutex<Vec<Migration>>,
}

impl RecordingMigrator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Migration> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// All keys across recorded calls, for conservation checks.
    pub fn moved_keys(&self) -> HashSet<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .flat_map(|m| m.keys.iter().cloned())
            .collect()
    }
}

#[async_trait::async_trait]
impl Migrator for RecordingMigrator {
    async fn migrate(
        &self,
        keys: &HashSet<String>,
        from: &str,
        to: &str,
    ) -> Result<(), MigrateError> {
        self.calls.lock().unwrap().push(Migration {
            from: from.to_string(),
            to: to.to_string(),
            keys: keys.clone(),
        });
        Ok(())
    }
}

/// Migrator that always fails.
pub struct FailingMigrator;

#[async_trait::async_trait]
impl Migrator for FailingMigrator {
    async fn migrate(
        &self,
        _keys: &HashSet<String>,
        _from: &str,
        _to: &str,
    ) -> Result<(), MigrateError> {
        Err("destination unreachable".into())
    }
}

/// Migrator that panics mid-flight.
pub struct PanickingMigrator;

#[async_trait::async_trait]
impl Migrator for PanickingMigrator {
    async fn migrate(
        &self,
        _keys: &HashSet<String>,
        _from: &str,
        _to: &str,
    ) -> Result<(), MigrateError> {
        panic!("migrator exploded");
    }
}

/// Hasher with a fixed score table, falling back to xxHash for keys the
/// test did not pin. Lets wrap scenarios place vnodes and data keys at
/// exact ring positions.
pub struct TableHasher {
    scores: HashMap<String, Score>,
    fallback: XxHasher,
}

impl TableHasher {
    pub fn new(entries: &[(&str, Score)]) -> Arc<Self> {
        Arc::new(Self {
            scores: entries
                .iter()
                .map(|(key, score)| (key.to_string(), *score))
                .collect(),
            fallback: XxHasher,
        })
    }
}

impl KeyHasher for TableHasher {
    fn score(&self, key: &str) -> Score {
        self.scores
            .get(key)
            .copied()
            .unwrap_or_else(|| self.fallback.score(key))
    }
}

/// Engine over a fresh skiplist ring, the default hasher, and a recording
/// migrator. Returns all three so tests can inspect backend state and
/// migrator calls directly.
pub fn recording_engine(
    replicas: usize,
) -> (CarouselEngine, Arc<SkiplistRing>, Arc<RecordingMigrator>) {
    let ring = Arc::new(SkiplistRing::new());
    let migrator = RecordingMigrator::new();
    let engine = CarouselEngine::new(
        ring.clone(),
        Arc::new(XxHasher),
        EngineConfig {
            replicas,
            ..EngineConfig::default()
        },
    )
    .with_migrator(migrator.clone());
    (engine, ring, migrator)
}

/// Engine with pinned scores, one vnode per weight unit.
pub fn table_engine(
    entries: &[(&str, Score)],
) -> (CarouselEngine, Arc<SkiplistRing>, Arc<RecordingMigrator>) {
    let ring = Arc::new(SkiplistRing::new());
    let migrator = RecordingMigrator::new();
    let engine = CarouselEngine::new(
        ring.clone(),
        TableHasher::new(entries),
        EngineConfig {
            replicas: 1,
            ..EngineConfig::default()
        },
    )
    .with_migrator(migrator.clone());
    (engine, ring, migrator)
}

//! Integration test: engine operations wait behind a held ring lock and
//! proceed once it expires.

use std::sync::Arc;
use std::time::{Duration, Instant};

use carousel_engine::{CarouselEngine, EngineConfig, XxHasher};
use carousel_ring::{HashRing, SkiplistRing};

#[tokio::test]
#[ntest::timeout(30000)]
async fn test_lookup_blocks_until_foreign_lock_expires() {
    let ring = Arc::new(SkiplistRing::new());
    let engine = CarouselEngine::new(ring.clone(), Arc::new(XxHasher), EngineConfig::default());
    engine.add_node("node-1", 1).await.unwrap();

    // Another task grabs the ring lock with a 1-second lease and abandons
    // it, as a crashed holder would.
    let holder = ring.clone();
    tokio::spawn(async move {
        holder.lock(1).await.unwrap();
    })
    .await
    .unwrap();

    let start = Instant::now();
    let vkey = engine.get_node("blocked-key").await.unwrap();
    let waited = start.elapsed();

    assert!(vkey.starts_with("node-1_"));
    assert!(
        waited >= Duration::from_millis(900),
        "lookup returned before the lease expired ({waited:?})"
    );
}

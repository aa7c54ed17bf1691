//! Integration test: basic write/read across a small cluster.

use carousel_integration_tests::{MigratingCluster, test_value};

#[tokio::test]
async fn test_write_read_across_three_nodes() {
    let cluster = MigratingCluster::new(5);
    cluster.add_node("node-1", 1).await;
    cluster.add_node("node-2", 1).await;
    cluster.add_node("node-3", 1).await;

    for i in 0..200 {
        cluster.put(&format!("obj-{i:03}"), &test_value(i)).await;
    }

    for i in 0..200 {
        let got = cluster.get(&format!("obj-{i:03}")).await;
        assert_eq!(got, Some(test_value(i)), "obj-{i:03} unreadable");
    }
    assert_eq!(cluster.total_stored(), 200);
}

#[tokio::test]
async fn test_keys_spread_over_all_nodes() {
    let cluster = MigratingCluster::new(10);
    cluster.add_node("node-1", 1).await;
    cluster.add_node("node-2", 1).await;
    cluster.add_node("node-3", 1).await;

    for i in 0..300 {
        cluster.put(&format!("obj-{i:03}"), &test_value(i)).await;
    }

    for node in ["node-1", "node-2", "node-3"] {
        assert!(cluster.stored_on(node) > 0, "{node} got no keys");
    }
}

#[tokio::test]
async fn test_overwrite_stays_on_owner() {
    let cluster = MigratingCluster::new(5);
    cluster.add_node("node-1", 1).await;
    cluster.add_node("node-2", 1).await;

    cluster.put("config", b"v1").await;
    cluster.put("config", b"v2").await;

    assert_eq!(cluster.get("config").await, Some(b"v2".to_vec()));
    assert_eq!(cluster.total_stored(), 1);
}

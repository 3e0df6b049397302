//! Node cache tests: write-through, eviction, and paginated listing.

use std::sync::Arc;

use super::fixtures::FlakyStorage;
use crate::{
    MemoryStorage, Node, NodeCache, NodeCacheConfig, NodeId, Storage, StorageError, node_key,
};

fn node(id: u64) -> Arc<Node> {
    Arc::new(Node::new(NodeId::new(id), vec![id as f32, 1.0], 0))
}

fn ids(range: std::ops::RangeInclusive<u64>) -> Vec<NodeId> {
    range.map(NodeId::new).collect()
}

/// Footprint of the two-dimensional level-0 nodes built by [`node`].
fn item_size() -> usize {
    node(0).estimated_size()
}

#[tokio::test]
async fn set_writes_through_and_get_serves_from_memory() {
    let storage = Arc::new(MemoryStorage::new());
    let mut cache = NodeCache::new(Arc::clone(&storage), NodeCacheConfig::default());
    cache.set(node(1)).await.expect("set must succeed");
    assert!(storage
        .get(&node_key(NodeId::new(1)))
        .await
        .expect("read must succeed")
        .is_some());

    storage.clear().await.expect("clear must succeed");
    let cached = cache.get(NodeId::new(1)).await.expect("get must succeed");
    assert_eq!(cached.as_deref(), Some(&*node(1)));
}

#[tokio::test]
async fn misses_are_loaded_and_cached() {
    let storage = Arc::new(MemoryStorage::new());
    let mut writer = NodeCache::new(Arc::clone(&storage), NodeCacheConfig::default());
    writer
        .set_many(vec![node(1), node(2), node(3)])
        .await
        .expect("set must succeed");

    let mut reader = NodeCache::new(Arc::clone(&storage), NodeCacheConfig::default());
    let found = reader
        .get_many(&[NodeId::new(1), NodeId::new(3), NodeId::new(9)])
        .await
        .expect("get must succeed");
    assert_eq!(found.len(), 2);
    assert!(reader.contains(NodeId::new(1)));
    assert!(reader.contains(NodeId::new(3)));
    assert!(!reader.contains(NodeId::new(2)));
    assert_eq!(reader.estimated_bytes(), 2 * item_size());
}

#[tokio::test]
async fn eviction_keeps_the_most_used_entries_under_budget() {
    let storage = Arc::new(MemoryStorage::new());
    let budget = 10 * item_size();
    let mut cache = NodeCache::new(
        Arc::clone(&storage),
        NodeCacheConfig::default().with_budget_bytes(budget),
    );
    cache
        .set_many((1..=20).map(node).collect())
        .await
        .expect("seed must succeed");
    assert_eq!(cache.len(), 20);

    for _ in 0..3 {
        cache.get_many(&ids(15..=20)).await.expect("hits must succeed");
    }
    cache.set(node(21)).await.expect("set must succeed");

    assert_eq!(cache.len(), 7);
    assert!(cache.estimated_bytes() <= budget);
    for id in ids(15..=21) {
        assert!(cache.contains(id), "node {id} should have been retained");
    }
    let evicted = cache.get(NodeId::new(1)).await.expect("get must succeed");
    assert!(evicted.is_some(), "evicted nodes reload from storage");
}

#[tokio::test]
async fn clear_drops_memory_only_and_delete_all_wipes_storage() {
    let storage = Arc::new(MemoryStorage::new());
    let mut cache = NodeCache::new(Arc::clone(&storage), NodeCacheConfig::default());
    cache.set_many(vec![node(1), node(2)]).await.expect("set must succeed");

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(storage.len().expect("lock must be healthy"), 2);

    cache.set(node(3)).await.expect("set must succeed");
    cache.delete_all().await.expect("delete must succeed");
    assert!(cache.is_empty());
    assert!(storage.is_empty().expect("lock must be healthy"));
}

#[tokio::test]
async fn listing_pages_without_populating_the_cache() {
    let storage = Arc::new(MemoryStorage::new());
    let mut cache = NodeCache::new(Arc::clone(&storage), NodeCacheConfig::default());
    cache
        .set_many((1..=5).map(node).collect())
        .await
        .expect("set must succeed");
    cache.clear();

    let first = cache.list_page(None, 3).await.expect("page must load");
    assert_eq!(first.nodes.len(), 3);
    let second = cache
        .list_page(first.cursor.as_deref(), 3)
        .await
        .expect("page must load");
    assert_eq!(second.nodes.len(), 2);
    let third = cache
        .list_page(second.cursor.as_deref(), 3)
        .await
        .expect("page must load");
    assert!(third.nodes.is_empty());
    assert!(third.cursor.is_none());

    let mut streamed = 0;
    cache
        .list_all(&mut |batch| {
            streamed += batch.len();
            Ok(())
        })
        .await
        .expect("listing must succeed");
    assert_eq!(streamed, 5);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn failed_writes_leave_the_cache_unchanged() {
    let storage = Arc::new(FlakyStorage::default());
    let mut cache = NodeCache::new(Arc::clone(&storage), NodeCacheConfig::default());
    storage.fail_writes(true);
    let err = cache.set(node(1)).await.expect_err("set must fail");
    assert!(matches!(err, StorageError::Backend { .. }));
    assert!(!cache.contains(NodeId::new(1)));
}

#[tokio::test]
async fn undecodable_nodes_are_reported() {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .put(&node_key(NodeId::new(4)), b"{}".to_vec())
        .await
        .expect("raw write must succeed");
    let mut cache = NodeCache::new(Arc::clone(&storage), NodeCacheConfig::default());
    let err = cache.get(NodeId::new(4)).await.expect_err("decode must fail");
    assert!(matches!(err, StorageError::Decode { .. }));
}

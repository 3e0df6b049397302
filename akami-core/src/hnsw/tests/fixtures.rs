//! Shared fixtures and helpers for HNSW tests.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;

use crate::{
    HnswConfig, HnswIndex, IndexBuilder, MemoryStorage, Neighbour, Node, NodeId, Page, ScoreKind,
    Storage, StorageError,
};

pub(super) fn small_config() -> HnswConfig {
    HnswConfig {
        m: 4,
        m_max: 4,
        m_max0: 8,
        ef_construction: 32,
        ef_search: 32,
    }
}

pub(super) async fn open_with<S: Storage>(
    storage: Arc<S>,
    config: HnswConfig,
    kind: ScoreKind,
) -> HnswIndex<S> {
    IndexBuilder::new()
        .with_config(config)
        .with_score_kind(kind)
        .with_rng_seed(42)
        .open(storage)
        .await
        .expect("index must open")
}

pub(super) async fn open_memory(config: HnswConfig) -> (Arc<MemoryStorage>, HnswIndex<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let index = open_with(Arc::clone(&storage), config, ScoreKind::SquaredEuclidean).await;
    (storage, index)
}

/// Unit square corners with ids 1 to 4.
pub(super) fn corners() -> Vec<(u64, Vec<f32>)> {
    vec![
        (1, vec![0.0, 0.0]),
        (2, vec![0.0, 1.0]),
        (3, vec![1.0, 1.0]),
        (4, vec![1.0, 0.0]),
    ]
}

pub(super) async fn insert_all<S: Storage>(index: &mut HnswIndex<S>, vectors: &[Vec<f32>]) {
    for (offset, vector) in vectors.iter().enumerate() {
        let id = NodeId::new(offset as u64 + 1);
        index
            .add_item(id, vector.clone(), None)
            .await
            .expect("insert must succeed");
    }
}

pub(super) async fn all_nodes<S: Storage>(index: &HnswIndex<S>) -> Vec<Node> {
    let mut nodes = Vec::new();
    index
        .for_each_node(&mut |batch| {
            nodes.extend(batch);
            Ok(())
        })
        .await
        .expect("listing must succeed");
    nodes
}

/// Asserts degree bounds, absence of self-loops, and that every edge points
/// at a stored node occupying the edge's layer.
pub(super) fn assert_graph_well_formed(nodes: &[Node], config: &HnswConfig) {
    let levels: HashMap<NodeId, usize> = nodes.iter().map(|node| (node.id(), node.level())).collect();
    for node in nodes {
        assert_eq!(node.layers().len(), node.level() + 1);
        for (layer, neighbours) in node.layers().iter().enumerate() {
            assert!(
                neighbours.len() <= config.max_degree(layer),
                "node {} has {} neighbours at layer {layer}",
                node.id(),
                neighbours.len(),
            );
            assert!(!neighbours.contains(&node.id()), "node {} links to itself", node.id());
            for neighbour in neighbours {
                let level = levels.get(neighbour).copied();
                assert!(
                    level.is_some_and(|level| level >= layer),
                    "node {} links to {neighbour} at layer {layer}",
                    node.id(),
                );
            }
        }
    }
}

pub(super) fn assert_sorted_by_score(neighbours: &[Neighbour]) {
    for window in neighbours.windows(2) {
        if let [left, right] = window {
            assert!(
                left.score <= right.score,
                "scores must be non-decreasing: {neighbours:?}",
            );
        }
    }
}

/// Memory storage whose writes can be made to fail on demand, either
/// wholesale or only when they touch one key.
#[derive(Debug, Default)]
pub(super) struct FlakyStorage {
    inner: MemoryStorage,
    fail_writes: AtomicBool,
    fail_key: Mutex<Option<String>>,
}

impl FlakyStorage {
    pub(super) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub(super) fn fail_writes_to(&self, key: Option<&str>) {
        *self.fail_key.lock().expect("lock must be healthy") = key.map(str::to_owned);
    }

    pub(super) fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.inner.snapshot().expect("snapshot must succeed")
    }

    fn check<'k>(&self, mut keys: impl Iterator<Item = &'k str>) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::backend("injected write failure"));
        }
        let fail_key = self.fail_key.lock().expect("lock must be healthy");
        match fail_key.as_deref() {
            Some(blocked) if keys.any(|key| key == blocked) => {
                Err(StorageError::backend(format!("injected failure writing {blocked}")))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.get(key).await
    }

    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>, StorageError> {
        self.inner.get_many(keys).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        self.check(std::iter::once(key))?;
        self.inner.put(key, value).await
    }

    async fn put_many(&self, entries: BTreeMap<String, Vec<u8>>) -> Result<(), StorageError> {
        self.check(entries.keys().map(String::as_str))?;
        self.inner.put_many(entries).await
    }

    async fn list_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        limit: usize,
    ) -> Result<Page, StorageError> {
        self.inner.list_page(prefix, start_after, limit).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.check(std::iter::empty())?;
        self.inner.clear().await
    }
}

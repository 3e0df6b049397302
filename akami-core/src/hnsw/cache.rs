//! Write-through node cache with byte-budgeted eviction.
//!
//! Nodes are served from memory when present and batch-fetched from storage
//! otherwise. Every access bumps a per-id usage counter. Before each mutating
//! cache operation the estimated footprint is compared with the budget; when
//! it is exceeded the coldest 70% of entries are dropped and all counters
//! restart from zero, approximating a decaying LFU without tracking recency.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use tracing::debug;

use super::{node::Node, types::NodeId};
use crate::{
    error::{StorageError, decode_json, encode_json},
    storage::{NODE_KEY_PREFIX, Storage},
};

/// Share of cached entries dropped by one eviction pass, in tenths.
const EVICTION_TENTHS: usize = 7;

/// Sizing for the [`NodeCache`].
///
/// # Examples
/// ```
/// use akami_core::NodeCacheConfig;
///
/// let config = NodeCacheConfig::default().with_budget_bytes(1 << 20);
/// assert_eq!(config.budget_bytes(), 1 << 20);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NodeCacheConfig {
    budget_bytes: usize,
}

impl NodeCacheConfig {
    /// Default memory budget: 80 MiB.
    pub const DEFAULT_BUDGET_BYTES: usize = 80 * 1024 * 1024;

    /// Overrides the memory budget.
    #[must_use]
    pub const fn with_budget_bytes(mut self, budget_bytes: usize) -> Self {
        self.budget_bytes = budget_bytes;
        self
    }

    /// Returns the memory budget in bytes.
    #[must_use]
    pub const fn budget_bytes(&self) -> usize {
        self.budget_bytes
    }
}

impl Default for NodeCacheConfig {
    fn default() -> Self {
        Self {
            budget_bytes: Self::DEFAULT_BUDGET_BYTES,
        }
    }
}

/// One page of persisted nodes returned by [`NodeCache::list_page`].
#[derive(Debug, Default)]
pub struct NodePage {
    /// Decoded nodes in key order.
    pub nodes: Vec<Node>,
    /// Key to resume after, or `None` once the listing is exhausted.
    pub cursor: Option<String>,
}

/// Storage key for `id`.
#[must_use]
pub fn node_key(id: NodeId) -> String {
    format!("{NODE_KEY_PREFIX}{id}")
}

/// Write-through cache of graph nodes backed by a [`Storage`].
#[derive(Debug)]
pub struct NodeCache<S> {
    storage: Arc<S>,
    config: NodeCacheConfig,
    nodes: HashMap<NodeId, Arc<Node>>,
    usage: HashMap<NodeId, u64>,
    item_size: Option<usize>,
}

impl<S: Storage> NodeCache<S> {
    /// Creates an empty cache over `storage`.
    pub fn new(storage: Arc<S>, config: NodeCacheConfig) -> Self {
        Self {
            storage,
            config,
            nodes: HashMap::new(),
            usage: HashMap::new(),
            item_size: None,
        }
    }

    /// Fetches one node.
    ///
    /// # Errors
    /// Propagates storage and decoding failures.
    pub async fn get(&mut self, id: NodeId) -> Result<Option<Arc<Node>>, StorageError> {
        let mut found = self.get_many(&[id]).await?;
        Ok(found.remove(&id))
    }

    /// Fetches several nodes; ids absent from storage are absent from the
    /// result. Misses are loaded with a single batched read.
    ///
    /// # Errors
    /// Propagates storage and decoding failures.
    pub async fn get_many(
        &mut self,
        ids: &[NodeId],
    ) -> Result<HashMap<NodeId, Arc<Node>>, StorageError> {
        let mut found = HashMap::with_capacity(ids.len());
        let mut missing: Vec<NodeId> = Vec::new();
        for &id in ids {
            *self.usage.entry(id).or_default() += 1;
            match self.nodes.get(&id) {
                Some(node) => {
                    found.insert(id, Arc::clone(node));
                }
                None if !missing.contains(&id) => missing.push(id),
                None => {}
            }
        }
        record_hits(found.len());
        if missing.is_empty() {
            return Ok(found);
        }
        record_misses(missing.len());

        let keys: Vec<String> = missing.into_iter().map(node_key).collect();
        let fetched = self.storage.get_many(&keys).await?;
        let mut loaded = Vec::with_capacity(fetched.len());
        for (key, bytes) in fetched {
            let node: Node = decode_json(&key, &bytes)?;
            if !node.is_well_formed() {
                return Err(StorageError::Decode {
                    key,
                    message: format!(
                        "node at level {} carries {} adjacency lists",
                        node.level(),
                        node.layers().len()
                    ),
                });
            }
            loaded.push(Arc::new(node));
        }
        if let Some(first) = loaded.first() {
            self.note_item_size(first);
        }
        self.evict_if_needed();
        for node in loaded {
            found.insert(node.id(), Arc::clone(&node));
            self.nodes.insert(node.id(), node);
        }
        Ok(found)
    }

    /// Persists one node and caches it.
    ///
    /// # Errors
    /// Propagates storage and encoding failures; the cache is unchanged on
    /// failure.
    pub async fn set(&mut self, node: Arc<Node>) -> Result<(), StorageError> {
        self.set_many(vec![node]).await
    }

    /// Persists several nodes as one batch and caches them.
    ///
    /// # Errors
    /// Propagates storage and encoding failures; the cache is unchanged on
    /// failure.
    pub async fn set_many(&mut self, nodes: Vec<Arc<Node>>) -> Result<(), StorageError> {
        self.set_many_with(nodes, BTreeMap::new()).await
    }

    /// Persists `nodes` and the raw `batch` entries in one storage write,
    /// then caches the nodes.
    ///
    /// # Errors
    /// Propagates storage and encoding failures; neither storage nor the
    /// cached nodes change on failure.
    pub async fn set_many_with(
        &mut self,
        nodes: Vec<Arc<Node>>,
        mut batch: BTreeMap<String, Vec<u8>>,
    ) -> Result<(), StorageError> {
        if nodes.is_empty() && batch.is_empty() {
            return Ok(());
        }
        if let Some(first) = nodes.first() {
            self.note_item_size(first);
        }
        for node in &nodes {
            let key = node_key(node.id());
            let bytes = encode_json(&key, node.as_ref())?;
            batch.insert(key, bytes);
        }
        self.evict_if_needed();
        self.storage.put_many(batch).await?;
        for node in nodes {
            *self.usage.entry(node.id()).or_default() += 1;
            self.nodes.insert(node.id(), node);
        }
        Ok(())
    }

    /// Drops every cached node; storage is untouched.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.usage.clear();
        self.item_size = None;
    }

    /// Wipes storage and the in-memory cache together.
    ///
    /// # Errors
    /// Propagates storage failures. The in-memory cache is dropped either
    /// way.
    pub async fn delete_all(&mut self) -> Result<(), StorageError> {
        self.clear();
        self.storage.clear().await
    }

    /// Returns one page of persisted nodes after `cursor`, bypassing the
    /// cache.
    ///
    /// # Errors
    /// Propagates storage and decoding failures.
    pub async fn list_page(
        &self,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<NodePage, StorageError> {
        let page = self
            .storage
            .list_page(NODE_KEY_PREFIX, cursor, limit)
            .await?;
        let cursor = page.last().map(|(key, _)| key.clone());
        let nodes = page
            .into_iter()
            .map(|(key, bytes)| decode_json(&key, &bytes))
            .collect::<Result<Vec<Node>, _>>()?;
        Ok(NodePage { nodes, cursor })
    }

    /// Streams every persisted node to `on_batch` in pages, bypassing the
    /// cache.
    ///
    /// # Errors
    /// Propagates storage and decoding failures and any error returned by
    /// `on_batch`.
    pub async fn list_all(
        &self,
        on_batch: &mut (dyn FnMut(Vec<Node>) -> Result<(), StorageError> + Send),
    ) -> Result<(), StorageError> {
        self.storage
            .list_all(NODE_KEY_PREFIX, &mut |page| {
                let nodes = page
                    .into_iter()
                    .map(|(key, bytes)| decode_json(&key, &bytes))
                    .collect::<Result<Vec<Node>, _>>()?;
                on_batch(nodes)
            })
            .await
    }

    /// Number of cached nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `id` is currently held in memory.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Estimated memory held by cached nodes.
    #[must_use]
    pub fn estimated_bytes(&self) -> usize {
        self.nodes.len() * self.item_size.unwrap_or(0)
    }

    /// Returns the configured sizing.
    #[must_use]
    pub const fn config(&self) -> NodeCacheConfig {
        self.config
    }

    fn note_item_size(&mut self, node: &Node) {
        if self.item_size.is_none() {
            self.item_size = Some(node.estimated_size().max(1));
        }
    }

    fn evict_if_needed(&mut self) {
        if self.estimated_bytes() <= self.config.budget_bytes {
            return;
        }
        let to_remove = self.nodes.len() * EVICTION_TENTHS / 10;
        let mut ranked: Vec<(u64, NodeId)> = self
            .nodes
            .keys()
            .map(|id| (self.usage.get(id).copied().unwrap_or(0), *id))
            .collect();
        ranked.sort_unstable();
        for (_, id) in ranked.into_iter().take(to_remove) {
            self.nodes.remove(&id);
        }
        self.usage.clear();
        debug!(
            evicted = to_remove,
            retained = self.nodes.len(),
            budget_bytes = self.config.budget_bytes,
            "node cache evicted cold entries"
        );
        record_evictions(to_remove);
    }
}

#[cfg(feature = "metrics")]
fn record_hits(count: usize) {
    metrics::counter!("akami_node_cache_hits").increment(count as u64);
}

#[cfg(not(feature = "metrics"))]
fn record_hits(_count: usize) {}

#[cfg(feature = "metrics")]
fn record_misses(count: usize) {
    metrics::counter!("akami_node_cache_misses").increment(count as u64);
}

#[cfg(not(feature = "metrics"))]
fn record_misses(_count: usize) {}

#[cfg(feature = "metrics")]
fn record_evictions(count: usize) {
    metrics::counter!("akami_node_cache_evictions").increment(count as u64);
}

#[cfg(not(feature = "metrics"))]
fn record_evictions(_count: usize) {}

//! Transport-agnostic host for one logical collection.
//!
//! A [`Collection`] owns a single [`HnswIndex`] behind an async mutex, so every
//! request runs to completion before the next one starts. It assigns ids from
//! a persisted counter and keeps optional per-item data next to the graph.

mod models;

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;
use tracing::{Span, field, instrument};

pub use self::models::{
    AddItemsRequest, AddItemsResponse, AddedItem, DEFAULT_QUERY_K, Item, ItemData, QueryHit,
    QueryRequest, QueryResponse, StatsResponse,
};
use crate::{
    error::{decode_json, encode_json},
    hnsw::{
        ConfigUpdate, HnswConfig, HnswError, HnswIndex, IndexBuilder, NodeId, check_dimensions,
        validate_vector,
    },
    storage::{AUTOINCREMENT_KEY, ITEM_DATA_KEY_PREFIX, Storage},
};

/// Storage key of the data attached to `id`.
#[must_use]
pub fn item_data_key(id: NodeId) -> String {
    format!("{ITEM_DATA_KEY_PREFIX}{id}")
}

/// One collection: an index plus the id counter and item data.
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use akami_core::{
///     IndexBuilder, MemoryStorage,
///     collection::{AddItemsRequest, Collection, Item, QueryRequest},
/// };
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let collection = Collection::open(Arc::new(MemoryStorage::new()), IndexBuilder::new()).await?;
/// let added = collection
///     .add_items(AddItemsRequest {
///         items: vec![Item { vector: vec![1.0, 0.0], data: None }],
///     })
///     .await?;
/// assert_eq!(added.items[0].id.get(), 1);
///
/// let found = collection
///     .query(QueryRequest { vector: vec![1.0, 0.1], k: None, threshold: None })
///     .await?;
/// assert_eq!(found.items[0].id.get(), 1);
/// # Ok::<(), akami_core::HnswError>(())
/// # }).unwrap();
/// ```
#[derive(Debug)]
pub struct Collection<S> {
    inner: Mutex<Inner<S>>,
}

#[derive(Debug)]
struct Inner<S> {
    index: HnswIndex<S>,
    autoincrement: u64,
}

impl<S: Storage> Collection<S> {
    /// Opens the collection stored in `storage`.
    ///
    /// # Errors
    /// Propagates failures from [`IndexBuilder::open`] and from reading the
    /// id counter.
    pub async fn open(storage: Arc<S>, builder: IndexBuilder) -> Result<Self, HnswError> {
        let autoincrement = match storage.get(AUTOINCREMENT_KEY).await? {
            Some(bytes) => decode_json(AUTOINCREMENT_KEY, &bytes)?,
            None => 0,
        };
        let index = builder.open(storage).await?;
        Ok(Self {
            inner: Mutex::new(Inner {
                index,
                autoincrement,
            }),
        })
    }

    /// Inserts every item in `request`, assigning consecutive ids.
    ///
    /// The whole batch is validated before anything is written: one bad
    /// vector rejects all of them.
    ///
    /// # Errors
    /// Returns [`HnswError::InvalidVector`] or
    /// [`HnswError::DimensionMismatch`] for a bad batch, and propagates
    /// insertion and storage failures.
    #[instrument(
        name = "collection.add_items",
        err,
        skip(self, request),
        fields(items = request.items.len(), first_id = field::Empty),
    )]
    pub async fn add_items(&self, request: AddItemsRequest) -> Result<AddItemsResponse, HnswError> {
        let Some(first) = request.items.first() else {
            return Ok(AddItemsResponse::default());
        };
        let mut inner = self.inner.lock().await;
        let expected = inner
            .index
            .dimensions()
            .unwrap_or_else(|| first.vector.len());
        for item in &request.items {
            validate_vector(&item.vector)?;
            check_dimensions(expected, &item.vector)?;
        }

        Span::current().record("first_id", inner.autoincrement + 1);
        let mut added = Vec::with_capacity(request.items.len());
        for item in request.items {
            let id = inner.next_id().await?;
            inner
                .index
                .add_item(id, item.vector.clone(), None)
                .await?;
            if let Some(data) = &item.data {
                let key = item_data_key(id);
                let bytes = encode_json(&key, data)?;
                inner.index.storage().put(&key, bytes).await?;
            }
            added.push(AddedItem { id, item });
        }
        Ok(AddItemsResponse { items: added })
    }

    /// Returns the items closest to the query vector.
    ///
    /// # Errors
    /// Propagates [`HnswIndex::search`] failures and storage failures while
    /// loading item data.
    #[instrument(
        name = "collection.query",
        err,
        skip(self, request),
        fields(k = request.k.unwrap_or(DEFAULT_QUERY_K), results = field::Empty),
    )]
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse, HnswError> {
        let k = request.k.unwrap_or(DEFAULT_QUERY_K);
        let mut inner = self.inner.lock().await;
        let mut hits = inner.index.search(&request.vector, k).await?;
        if let Some(threshold) = request.threshold {
            hits.retain(|hit| hit.score <= threshold);
        }

        let keys: Vec<String> = hits.iter().map(|hit| item_data_key(hit.id)).collect();
        let mut data: HashMap<String, Vec<u8>> = inner.index.storage().get_many(&keys).await?;
        let mut items = Vec::with_capacity(hits.len());
        for (hit, key) in hits.into_iter().zip(keys) {
            let node = inner
                .index
                .get_node(hit.id)
                .await?
                .ok_or(HnswError::MissingNode { id: hit.id })?;
            let data = data
                .remove(&key)
                .map(|bytes| decode_json::<ItemData>(&key, &bytes))
                .transpose()?;
            items.push(QueryHit {
                id: hit.id,
                item: Item {
                    vector: node.vector().to_vec(),
                    data,
                },
                score: hit.score,
            });
        }
        Span::current().record("results", items.len());
        Ok(QueryResponse { items })
    }

    /// Applies a configuration update.
    ///
    /// # Errors
    /// Propagates [`HnswIndex::set_config`] failures.
    pub async fn set_config(&self, update: ConfigUpdate) -> Result<HnswConfig, HnswError> {
        self.inner.lock().await.index.set_config(update).await
    }

    /// Returns the active configuration.
    pub async fn config(&self) -> HnswConfig {
        self.inner.lock().await.index.config()
    }

    /// Reports the item count and self-query recall.
    ///
    /// # Errors
    /// Propagates [`HnswIndex::calc_recall`] failures.
    #[instrument(name = "collection.stats", err, skip(self))]
    pub async fn stats(&self) -> Result<StatsResponse, HnswError> {
        let recall = self.inner.lock().await.index.calc_recall().await?;
        Ok(recall.into())
    }

    /// Removes every item while keeping the configuration and the id counter.
    ///
    /// # Errors
    /// Propagates storage failures.
    #[instrument(name = "collection.clear", err, skip(self))]
    pub async fn clear(&self) -> Result<(), HnswError> {
        let mut inner = self.inner.lock().await;
        inner.index.clear().await?;
        inner.persist_counter().await
    }

    /// Removes everything, including the configuration and the id counter.
    ///
    /// # Errors
    /// Propagates storage failures.
    #[instrument(name = "collection.reset", err, skip(self))]
    pub async fn reset(&self) -> Result<(), HnswError> {
        let mut inner = self.inner.lock().await;
        inner.index.reset().await?;
        inner.autoincrement = 0;
        Ok(())
    }
}

impl<S: Storage> Inner<S> {
    /// Advances and persists the id counter. Ids are burned even when the
    /// insertion that claimed them fails.
    async fn next_id(&mut self) -> Result<NodeId, HnswError> {
        self.autoincrement += 1;
        self.persist_counter().await?;
        Ok(NodeId::new(self.autoincrement))
    }

    async fn persist_counter(&self) -> Result<(), HnswError> {
        let bytes = encode_json(AUTOINCREMENT_KEY, &self.autoincrement)?;
        self.index.storage().put(AUTOINCREMENT_KEY, bytes).await?;
        Ok(())
    }
}

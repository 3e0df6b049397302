//! Key-value storage capability consumed by the HNSW engine.
//!
//! The engine never talks to a concrete database. It consumes the async
//! [`Storage`] trait, which any backend (an embedded store, a remote object
//! store, the in-memory map used by tests) can implement. Values are opaque
//! bytes; the engine owns the encoding.

mod memory;

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;

use crate::error::StorageError;

pub use self::memory::MemoryStorage;

/// Number of entries requested per page by [`Storage::list_all`].
pub const LIST_PAGE_SIZE: usize = 100;

/// Key holding the persisted engine state.
pub const STATE_KEY: &str = "hnsw_state";
/// Key holding the persisted index configuration.
pub const CONFIG_KEY: &str = "config";
/// Key holding the host's id counter.
pub const AUTOINCREMENT_KEY: &str = "autoincrement";
/// Prefix shared by every persisted graph node.
pub const NODE_KEY_PREFIX: &str = "hnsw_node_";
/// Prefix shared by the optional item payloads stored by the collection host.
pub const ITEM_DATA_KEY_PREFIX: &str = "item_data_";

/// A page of `(key, value)` pairs in ascending key order.
pub type Page = Vec<(String, Vec<u8>)>;

/// Async key-value capability backing an index.
///
/// Implementations must return keys from [`Storage::list_page`] in ascending
/// byte order so the cursor in [`Storage::list_all`] makes progress.
///
/// # Examples
/// ```
/// use akami_core::{MemoryStorage, Storage};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let storage = MemoryStorage::new();
/// storage.put("greeting", b"hello".to_vec()).await?;
/// assert_eq!(storage.get("greeting").await?, Some(b"hello".to_vec()));
/// # Ok::<(), akami_core::StorageError>(())
/// # }).unwrap();
/// ```
#[async_trait]
pub trait Storage: Send + Sync {
    /// Reads a single value.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Reads several values at once. Missing keys are absent from the result.
    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>, StorageError>;

    /// Writes a single value.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Writes several values as one batch.
    async fn put_many(&self, entries: BTreeMap<String, Vec<u8>>) -> Result<(), StorageError>;

    /// Returns up to `limit` entries whose keys start with `prefix` and sort
    /// strictly after `start_after`, in ascending key order.
    async fn list_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        limit: usize,
    ) -> Result<Page, StorageError>;

    /// Deletes every key.
    async fn clear(&self) -> Result<(), StorageError>;

    /// Enumerates every entry under `prefix`, handing each non-empty page of
    /// at most [`LIST_PAGE_SIZE`] entries to `on_batch`.
    ///
    /// The cursor resumes after the last key of the previous page and stops
    /// once a page comes back empty.
    async fn list_all(
        &self,
        prefix: &str,
        on_batch: &mut (dyn FnMut(Page) -> Result<(), StorageError> + Send),
    ) -> Result<(), StorageError> {
        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .list_page(prefix, cursor.as_deref(), LIST_PAGE_SIZE)
                .await?;
            let Some((last, _)) = page.last() else {
                return Ok(());
            };
            cursor = Some(last.clone());
            on_batch(page)?;
        }
    }
}

#[async_trait]
impl<T: Storage + ?Sized> Storage for std::sync::Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key).await
    }

    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>, StorageError> {
        (**self).get_many(keys).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        (**self).put(key, value).await
    }

    async fn put_many(&self, entries: BTreeMap<String, Vec<u8>>) -> Result<(), StorageError> {
        (**self).put_many(entries).await
    }

    async fn list_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        limit: usize,
    ) -> Result<Page, StorageError> {
        (**self).list_page(prefix, start_after, limit).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        (**self).clear().await
    }
}

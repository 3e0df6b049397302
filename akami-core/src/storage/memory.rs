//! In-memory [`Storage`] backend used by tests and ephemeral indexes.

use std::{
    collections::{BTreeMap, HashMap},
    ops::Bound,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use super::{Page, Storage};
use crate::error::StorageError;

/// Ordered in-memory key-value map.
///
/// Batched writes are applied under a single lock acquisition, so readers
/// never observe half of a [`Storage::put_many`] batch.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every stored entry.
    ///
    /// # Errors
    /// Returns [`StorageError::Backend`] when the internal lock is poisoned.
    pub fn snapshot(&self) -> Result<BTreeMap<String, Vec<u8>>, StorageError> {
        Ok(self.lock()?.clone())
    }

    /// Returns the number of stored keys.
    ///
    /// # Errors
    /// Returns [`StorageError::Backend`] when the internal lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.len())
    }

    /// Returns whether the store holds no keys.
    ///
    /// # Errors
    /// Returns [`StorageError::Backend`] when the internal lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<u8>>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::backend("memory storage lock poisoned"))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>, StorageError> {
        let entries = self.lock()?;
        Ok(keys
            .iter()
            .filter_map(|key| entries.get(key).map(|value| (key.clone(), value.clone())))
            .collect())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_owned(), value);
        Ok(())
    }

    async fn put_many(&self, batch: BTreeMap<String, Vec<u8>>) -> Result<(), StorageError> {
        self.lock()?.extend(batch);
        Ok(())
    }

    async fn list_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        limit: usize,
    ) -> Result<Page, StorageError> {
        let entries = self.lock()?;
        let lower = match start_after {
            Some(cursor) if cursor >= prefix => Bound::Excluded(cursor),
            _ => Bound::Included(prefix),
        };
        Ok(entries
            .range::<str, _>((lower, Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .take(limit)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.lock()?.clear();
        Ok(())
    }
}

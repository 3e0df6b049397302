//! The HNSW index handle, its builder, and lifecycle operations.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::{
    cache::{NodeCache, NodeCacheConfig},
    config::{ConfigUpdate, HnswConfig},
    error::HnswError,
    node::Node,
    rng::{DEFAULT_RNG_SEED, LevelSampler},
    state::EngineState,
    types::NodeId,
};
use crate::{
    error::{StorageError, decode_json, encode_json},
    score::{ScoreFunction, ScoreKind},
    storage::{CONFIG_KEY, STATE_KEY, Storage},
};

/// Configures and opens an [`HnswIndex`].
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use akami_core::{HnswConfig, IndexBuilder, MemoryStorage, NodeId, ScoreKind};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let mut index = IndexBuilder::new()
///     .with_config(HnswConfig { m: 8, ..HnswConfig::default() })
///     .with_score_kind(ScoreKind::SquaredEuclidean)
///     .with_rng_seed(42)
///     .open(Arc::new(MemoryStorage::new()))
///     .await?;
/// index.add_item(NodeId::new(1), vec![0.0, 1.0], None).await?;
/// let hits = index.search(&[0.0, 0.9], 1).await?;
/// assert_eq!(hits[0].id, NodeId::new(1));
/// # Ok::<(), akami_core::HnswError>(())
/// # }).unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct IndexBuilder {
    config: Option<HnswConfig>,
    score: Arc<dyn ScoreFunction>,
    rng_seed: u64,
    cache: NodeCacheConfig,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self {
            config: None,
            score: ScoreKind::default().into_function(),
            rng_seed: DEFAULT_RNG_SEED,
            cache: NodeCacheConfig::default(),
        }
    }
}

impl IndexBuilder {
    /// Starts from default configuration, cosine scoring, and an 80 MiB
    /// node cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests an explicit configuration. When the store already holds a
    /// configuration the two must agree on every frozen field.
    #[must_use]
    pub fn with_config(mut self, config: HnswConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Injects a custom score function.
    #[must_use]
    pub fn with_score_function(mut self, score: Arc<dyn ScoreFunction>) -> Self {
        self.score = score;
        self
    }

    /// Selects one of the built-in score functions.
    #[must_use]
    pub fn with_score_kind(self, kind: ScoreKind) -> Self {
        self.with_score_function(kind.into_function())
    }

    /// Seeds level sampling so graph construction is reproducible.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }

    /// Sizes the node cache.
    #[must_use]
    pub fn with_cache_config(mut self, cache: NodeCacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Loads persisted configuration and state from `storage`.
    ///
    /// # Errors
    /// Returns [`HnswError::InvalidParameters`] for an out-of-range requested
    /// configuration, [`HnswError::ImmutableConfigViolation`] when it
    /// contradicts the persisted one, and [`HnswError::Storage`] when reads
    /// fail.
    #[instrument(name = "hnsw.open", err, skip(self, storage))]
    pub async fn open<S: Storage>(self, storage: Arc<S>) -> Result<HnswIndex<S>, HnswError> {
        let requested = self.config.map(HnswConfig::validated).transpose()?;
        let stored: Option<HnswConfig> = match storage.get(CONFIG_KEY).await? {
            Some(bytes) => Some(decode_json(CONFIG_KEY, &bytes)?),
            None => None,
        };
        let (config, config_persisted) = match (stored, requested) {
            (Some(stored), Some(requested)) => {
                stored.ensure_compatible(&requested)?;
                (requested, true)
            }
            (Some(stored), None) => (stored, true),
            (None, requested) => (requested.unwrap_or_default(), false),
        };
        let state: EngineState = match storage.get(STATE_KEY).await? {
            Some(bytes) => decode_json(STATE_KEY, &bytes)?,
            None => EngineState::default(),
        };
        debug!(
            ?state,
            config_persisted,
            score = self.score.name(),
            "opened hnsw index"
        );
        Ok(HnswIndex {
            cache: NodeCache::new(Arc::clone(&storage), self.cache),
            storage,
            config,
            config_persisted,
            state,
            score: self.score,
            sampler: LevelSampler::new(self.rng_seed, config.level_multiplier()),
            rng_seed: self.rng_seed,
        })
    }
}

/// An HNSW graph persisted through a [`Storage`] capability.
///
/// Every operation takes `&mut self`: the exclusive borrow is the
/// per-collection mutual-exclusion token, so no two operations on the same
/// index can interleave. Hosts sharing an index across tasks wrap it in an
/// async mutex.
#[derive(Debug)]
pub struct HnswIndex<S> {
    pub(super) storage: Arc<S>,
    pub(super) cache: NodeCache<S>,
    pub(super) config: HnswConfig,
    pub(super) config_persisted: bool,
    pub(super) state: EngineState,
    pub(super) score: Arc<dyn ScoreFunction>,
    pub(super) sampler: LevelSampler,
    rng_seed: u64,
}

impl<S: Storage> HnswIndex<S> {
    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> HnswConfig {
        self.config
    }

    /// Whether the configuration has been written to storage, freezing its
    /// graph-shaping fields.
    #[must_use]
    pub const fn is_config_persisted(&self) -> bool {
        self.config_persisted
    }

    /// Returns the engine state.
    #[must_use]
    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// Returns the fixed vector width, if any vector has been added.
    #[must_use]
    pub const fn dimensions(&self) -> Option<usize> {
        self.state.dimensions
    }

    /// Returns the injected score function.
    #[must_use]
    pub fn score_function(&self) -> &dyn ScoreFunction {
        self.score.as_ref()
    }

    /// Returns the node cache.
    #[must_use]
    pub const fn cache(&self) -> &NodeCache<S> {
        &self.cache
    }

    /// Returns the backing storage handle.
    #[must_use]
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Fetches a node through the cache.
    ///
    /// # Errors
    /// Propagates storage failures.
    pub async fn get_node(&mut self, id: NodeId) -> Result<Option<Arc<Node>>, HnswError> {
        Ok(self.cache.get(id).await?)
    }

    /// Streams every persisted node to `on_batch`, one page at a time,
    /// without populating the cache.
    ///
    /// # Errors
    /// Propagates storage failures and any error `on_batch` returns.
    pub async fn for_each_node(
        &self,
        on_batch: &mut (dyn FnMut(Vec<Node>) -> Result<(), StorageError> + Send),
    ) -> Result<(), HnswError> {
        Ok(self.cache.list_all(on_batch).await?)
    }

    /// Applies a configuration update and persists the result.
    ///
    /// Before the configuration is first persisted every field may change.
    /// Afterwards only `efSearch` may.
    ///
    /// # Errors
    /// Returns [`HnswError::InvalidParameters`] for out-of-range values,
    /// [`HnswError::ImmutableConfigViolation`] when a frozen field would
    /// change, and [`HnswError::Storage`] when the write fails. The active
    /// configuration is unchanged on error.
    #[instrument(name = "hnsw.set_config", err, skip(self), fields(persisted = self.config_persisted))]
    pub async fn set_config(&mut self, update: ConfigUpdate) -> Result<HnswConfig, HnswError> {
        let candidate = self.config.merged(&update).validated()?;
        if self.config_persisted {
            self.config.ensure_compatible(&candidate)?;
        }
        self.write_config(&candidate).await?;
        if !self.config_persisted {
            self.sampler = LevelSampler::new(self.rng_seed, candidate.level_multiplier());
        }
        self.config = candidate;
        self.config_persisted = true;
        Ok(candidate)
    }

    /// Removes every node and the engine state, keeping the configuration.
    ///
    /// # Errors
    /// Returns [`HnswError::Storage`] when the wipe or the configuration
    /// rewrite fails.
    #[instrument(name = "hnsw.clear", err, skip(self))]
    pub async fn clear(&mut self) -> Result<(), HnswError> {
        self.cache.delete_all().await?;
        self.state = EngineState::default();
        if self.config_persisted {
            self.write_config(&self.config).await?;
        }
        Ok(())
    }

    /// Removes everything, reverting to an unpersisted default
    /// configuration.
    ///
    /// # Errors
    /// Returns [`HnswError::Storage`] when the wipe fails.
    #[instrument(name = "hnsw.reset", err, skip(self))]
    pub async fn reset(&mut self) -> Result<(), HnswError> {
        self.cache.delete_all().await?;
        self.state = EngineState::default();
        self.config = HnswConfig::default();
        self.config_persisted = false;
        self.sampler = LevelSampler::new(self.rng_seed, self.config.level_multiplier());
        Ok(())
    }

    async fn write_config(&self, config: &HnswConfig) -> Result<(), HnswError> {
        let bytes = encode_json(CONFIG_KEY, config)?;
        self.storage.put(CONFIG_KEY, bytes).await?;
        Ok(())
    }

    /// Fetches `ids` in order, failing when any is missing.
    pub(super) async fn fetch(&mut self, ids: &[NodeId]) -> Result<Vec<Arc<Node>>, HnswError> {
        let mut found = self.cache.get_many(ids).await?;
        ids.iter()
            .map(|id| found.remove(id).ok_or(HnswError::MissingNode { id: *id }))
            .collect()
    }

    pub(super) async fn fetch_one(&mut self, id: NodeId) -> Result<Arc<Node>, HnswError> {
        self.cache
            .get(id)
            .await?
            .ok_or(HnswError::MissingNode { id })
    }
}

/// Rejects empty vectors and non-finite components.
pub(crate) fn validate_vector(vector: &[f32]) -> Result<(), HnswError> {
    if vector.is_empty() {
        return Err(HnswError::InvalidVector {
            reason: "vector must not be empty".into(),
        });
    }
    if let Some(position) = vector.iter().position(|value| !value.is_finite()) {
        return Err(HnswError::InvalidVector {
            reason: format!("component {position} is not finite"),
        });
    }
    Ok(())
}

/// Rejects vectors whose width differs from the fixed dimensionality.
pub(crate) fn check_dimensions(expected: usize, vector: &[f32]) -> Result<(), HnswError> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(HnswError::DimensionMismatch {
            expected,
            actual: vector.len(),
        })
    }
}

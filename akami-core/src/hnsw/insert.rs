//! Insertion: level sampling, neighbour selection, and back-edge upkeep.

use std::{collections::BTreeMap, ops::ControlFlow, sync::Arc};

use tracing::{Span, debug, field, instrument, trace};

use super::{
    candidates::CandidateList,
    error::HnswError,
    heuristic::filter_candidates_by_heuristic,
    index::{HnswIndex, check_dimensions, validate_vector},
    node::Node,
    rng::MAX_LEVEL,
    types::NodeId,
};
use crate::{
    error::encode_json,
    storage::{CONFIG_KEY, STATE_KEY, Storage},
};

/// Working copies of existing nodes whose adjacency changed during one
/// insertion, keyed by id.
type Affected = BTreeMap<NodeId, Node>;

impl<S: Storage> HnswIndex<S> {
    /// Inserts `vector` under `id`.
    ///
    /// `level` pins the node's top layer and may not exceed [`MAX_LEVEL`];
    /// when `None` it is sampled from the exponential layer distribution.
    /// Every node whose adjacency changes is written in one batch together
    /// with the engine state and, on first use, the configuration.
    ///
    /// # Errors
    /// Returns [`HnswError::InvalidVector`] for empty or non-finite vectors,
    /// [`HnswError::InvalidParameters`] for a pinned level above
    /// [`MAX_LEVEL`], [`HnswError::DimensionMismatch`] when the width differs
    /// from earlier insertions, [`HnswError::DuplicateId`] when `id` exists,
    /// and [`HnswError::Storage`] or [`HnswError::MissingNode`] when the
    /// graph cannot be read or written. Neither storage nor the in-memory
    /// state changes unless the whole insertion succeeds.
    #[instrument(
        name = "hnsw.add_item",
        err,
        skip(self, vector),
        fields(id = %id, dims = vector.len(), level = field::Empty),
    )]
    pub async fn add_item(
        &mut self,
        id: NodeId,
        vector: Vec<f32>,
        level: Option<usize>,
    ) -> Result<(), HnswError> {
        validate_vector(&vector)?;
        if let Some(pinned) = level.filter(|pinned| *pinned > MAX_LEVEL) {
            return Err(HnswError::InvalidParameters {
                reason: format!("level {pinned} exceeds the maximum of {MAX_LEVEL}"),
            });
        }
        if let Some(expected) = self.state.dimensions {
            check_dimensions(expected, &vector)?;
        }
        if self.cache.get(id).await?.is_some() {
            return Err(HnswError::DuplicateId { id });
        }

        let level = level.unwrap_or_else(|| self.sampler.sample());
        Span::current().record("level", level);
        debug!(%id, level, "assigned node level");

        let dims = vector.len();
        let mut node = Arc::new(Node::new(id, vector, level));
        let mut affected = Affected::new();
        if let Some(entry_id) = self.state.entrypoint_id {
            let layers = self.connect(&node, entry_id, &mut affected).await?;
            let working = Arc::make_mut(&mut node);
            for (layer, ids) in layers {
                working.set_neighbours(layer, ids);
            }
        }

        let mut next_state = self.state;
        next_state.dimensions = Some(dims);
        let promoted = next_state.promote(id, level);

        let mut records = BTreeMap::new();
        if !self.config_persisted {
            records.insert(CONFIG_KEY.to_owned(), encode_json(CONFIG_KEY, &self.config)?);
        }
        if next_state != self.state {
            records.insert(STATE_KEY.to_owned(), encode_json(STATE_KEY, &next_state)?);
        }
        let mut batch: Vec<Arc<Node>> = affected.into_values().map(Arc::new).collect();
        batch.push(node);
        self.cache.set_many_with(batch, records).await?;

        self.config_persisted = true;
        self.state = next_state;
        if promoted {
            debug!(%id, level, "promoted entry point");
        }
        Ok(())
    }

    /// Selects neighbours for `node` on every layer it shares with the graph
    /// and records back-edges in `affected`. Returns the new node's adjacency
    /// per layer.
    async fn connect(
        &mut self,
        node: &Arc<Node>,
        entry_id: NodeId,
        affected: &mut Affected,
    ) -> Result<Vec<(usize, Vec<NodeId>)>, HnswError> {
        let max_level = self.state.max_level.unwrap_or(0);
        let entry = self.fetch_one(entry_id).await?;
        let mut closest = self
            .greedy_descent(node.operand(), entry, max_level, node.level() + 1)
            .await?;

        let metric = Arc::clone(&self.score);
        let config = self.config;
        let top = closest.level().min(node.level());
        let mut layers = Vec::with_capacity(top + 1);
        for layer in (0..=top).rev() {
            let bound = config.max_degree(layer);
            let mut candidates = CandidateList::new(node.operand(), metric.as_ref(), bound);
            candidates.add(Arc::clone(&closest));
            self.traverse(Arc::clone(&closest), config.ef_construction, layer, |found| {
                candidates.add(Arc::clone(found));
                ControlFlow::Continue(())
            })
            .await?;
            if let Some(best) = candidates.best() {
                closest = Arc::clone(&best.node);
            }

            let selected = filter_candidates_by_heuristic(candidates, config.m, metric.as_ref());
            let ids: Vec<NodeId> = selected.iter().map(|item| item.node.id()).collect();
            trace!(layer, neighbours = ids.len(), "selected neighbours");
            for neighbour in &ids {
                self.link_back(*neighbour, node, layer, bound, affected)
                    .await?;
            }
            layers.push((layer, ids));
        }
        Ok(layers)
    }

    /// Adds an edge from `neighbour_id` to `node` at `layer`. A full
    /// adjacency list is re-selected with the heuristic over its current
    /// members plus `node`, so the new edge may displace older ones or be
    /// refused.
    async fn link_back(
        &mut self,
        neighbour_id: NodeId,
        node: &Arc<Node>,
        layer: usize,
        bound: usize,
        affected: &mut Affected,
    ) -> Result<(), HnswError> {
        let mut working = match affected.remove(&neighbour_id) {
            Some(working) => working,
            None => Node::clone(&*self.fetch_one(neighbour_id).await?),
        };
        if working.neighbours(layer).len() < bound {
            working.push_neighbour(layer, node.id());
            affected.insert(neighbour_id, working);
            return Ok(());
        }

        let current = working.neighbours(layer).to_vec();
        let existing = self.fetch(&current).await?;
        let metric = Arc::clone(&self.score);
        let kept: Vec<NodeId> = {
            let mut pool = CandidateList::new(working.operand(), metric.as_ref(), bound + 1);
            for member in existing {
                pool.add(member);
            }
            pool.add(Arc::clone(node));
            filter_candidates_by_heuristic(pool, bound, metric.as_ref())
                .iter()
                .map(|item| item.node.id())
                .collect()
        };
        debug!(
            neighbour = %neighbour_id,
            layer,
            accepted = kept.contains(&node.id()),
            dropped = current.len() + 1 - kept.len(),
            "re-selected full adjacency list"
        );
        working.set_neighbours(layer, kept);
        affected.insert(neighbour_id, working);
        Ok(())
    }
}

//! Graph traversal, greedy descent, and k-nearest queries.

use std::{
    collections::{HashSet, VecDeque},
    ops::ControlFlow,
    sync::Arc,
};

use tracing::{Span, field, instrument};

use super::{
    candidates::CandidateList,
    error::HnswError,
    index::{HnswIndex, check_dimensions, validate_vector},
    node::Node,
    types::{Neighbour, NodeId, Recall},
};
use crate::{
    score::ScoreOperand,
    storage::{LIST_PAGE_SIZE, Storage},
};

impl<S: Storage> HnswIndex<S> {
    /// Breadth-first exploration of the `layer` subgraph from `entry`.
    ///
    /// At most `ef` nodes are expanded. For each expanded node, `on_node` is
    /// invoked with every neighbour not yet expanded and may stop the walk by
    /// returning [`ControlFlow::Break`]. Nodes below `layer` are not
    /// expanded.
    pub(super) async fn traverse<F>(
        &mut self,
        entry: Arc<Node>,
        ef: usize,
        layer: usize,
        mut on_node: F,
    ) -> Result<(), HnswError>
    where
        F: FnMut(&Arc<Node>) -> ControlFlow<()> + Send,
    {
        let mut visited: HashSet<NodeId> = HashSet::with_capacity(ef.min(4096));
        let mut frontier = VecDeque::from([entry]);
        while let Some(node) = frontier.pop_front() {
            if visited.len() >= ef {
                break;
            }
            if !visited.insert(node.id()) || node.level() < layer {
                continue;
            }
            let pending: Vec<NodeId> = node
                .neighbours(layer)
                .iter()
                .copied()
                .filter(|id| !visited.contains(id))
                .collect();
            for neighbour in self.fetch(&pending).await? {
                if on_node(&neighbour).is_break() {
                    return Ok(());
                }
                frontier.push_back(neighbour);
            }
        }
        Ok(())
    }

    /// Walks layers `top` down to `bottom` inclusive, at each layer moving to
    /// the best-scoring neighbour of the current node until no neighbour
    /// improves on it.
    pub(super) async fn greedy_descent(
        &mut self,
        target: ScoreOperand<'_>,
        entry: Arc<Node>,
        top: usize,
        bottom: usize,
    ) -> Result<Arc<Node>, HnswError> {
        let metric = Arc::clone(&self.score);
        let mut closest = entry;
        let mut closest_score = metric.score(closest.operand(), target);
        for layer in (bottom..=top).rev() {
            loop {
                let mut improved: Option<Arc<Node>> = None;
                self.traverse(Arc::clone(&closest), 1, layer, |node| {
                    let score = metric.score(node.operand(), target);
                    if score < closest_score {
                        closest_score = score;
                        improved = Some(Arc::clone(node));
                    }
                    ControlFlow::Continue(())
                })
                .await?;
                match improved {
                    Some(node) => closest = node,
                    None => break,
                }
            }
        }
        Ok(closest)
    }

    /// Returns up to `k` nodes closest to `query`, ascending by score.
    ///
    /// # Errors
    /// Returns [`HnswError::InvalidVector`] for empty or non-finite queries,
    /// [`HnswError::DimensionsUnset`] before any vector has been added,
    /// [`HnswError::DimensionMismatch`] for queries of the wrong width, and
    /// [`HnswError::Storage`] or [`HnswError::MissingNode`] when the graph
    /// cannot be read.
    #[instrument(
        name = "hnsw.search",
        err,
        skip(self, query),
        fields(dims = query.len(), k = k, results = field::Empty),
    )]
    pub async fn search(&mut self, query: &[f32], k: usize) -> Result<Vec<Neighbour>, HnswError> {
        validate_vector(query)?;
        let dimensions = self.state.dimensions.ok_or(HnswError::DimensionsUnset)?;
        check_dimensions(dimensions, query)?;
        let (Some(entry_id), Some(max_level)) = (self.state.entrypoint_id, self.state.max_level)
        else {
            Span::current().record("results", 0);
            return Ok(Vec::new());
        };
        if k == 0 {
            Span::current().record("results", 0);
            return Ok(Vec::new());
        }

        let target = ScoreOperand::new(query);
        let entry = self.fetch_one(entry_id).await?;
        let closest = self.greedy_descent(target, entry, max_level, 1).await?;

        let metric = Arc::clone(&self.score);
        let mut results = CandidateList::new(target, metric.as_ref(), k);
        results.add(Arc::clone(&closest));
        let ef = self.config.ef_search;
        self.traverse(closest, ef, 0, |node| {
            results.add(Arc::clone(node));
            ControlFlow::Continue(())
        })
        .await?;

        let neighbours: Vec<Neighbour> = results
            .into_items()
            .into_iter()
            .map(|item| Neighbour {
                id: item.node.id(),
                score: item.score,
            })
            .collect();
        Span::current().record("results", neighbours.len());
        Ok(neighbours)
    }

    /// Queries every persisted node with its own vector and reports how often
    /// it comes back as its own nearest neighbour.
    ///
    /// Nodes are paged straight from storage so the sweep does not churn the
    /// cache with nodes the queries never touch.
    ///
    /// # Errors
    /// Propagates any search or storage failure.
    #[instrument(
        name = "hnsw.calc_recall",
        err,
        skip(self),
        fields(total = field::Empty, recall = field::Empty),
    )]
    pub async fn calc_recall(&mut self) -> Result<Recall, HnswError> {
        let mut cursor: Option<String> = None;
        let mut found = 0_usize;
        let mut total = 0_usize;
        loop {
            let page = self
                .cache
                .list_page(cursor.as_deref(), LIST_PAGE_SIZE)
                .await?;
            if page.nodes.is_empty() {
                break;
            }
            for node in &page.nodes {
                total += 1;
                let hits = self.search(node.vector(), 1).await?;
                if hits.first().is_some_and(|hit| hit.id == node.id()) {
                    found += 1;
                }
            }
            cursor = page.cursor;
        }
        let recall = Recall::from_counts(found, total);
        let span = Span::current();
        span.record("total", recall.total);
        span.record("recall", recall.recall);
        Ok(recall)
    }
}

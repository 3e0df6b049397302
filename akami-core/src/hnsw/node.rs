//! Graph vertices as persisted by the node cache.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::types::NodeId;
use crate::score::ScoreOperand;

/// Number of neighbour ids assumed per layer when estimating a node's memory
/// footprint.
const ESTIMATED_EDGES_PER_LAYER: usize = 20;

/// A vertex of the layered graph.
///
/// Adjacency is stored as one id list per layer `0..=level`, ordered by
/// relevance to this node. Everything except the adjacency lists is
/// write-once; the engine is the sole mutator of `neighbours`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    vector: Vec<f32>,
    level: usize,
    #[serde(rename = "neighbors")]
    neighbours: Vec<Vec<NodeId>>,
    #[serde(skip)]
    norm: OnceLock<f64>,
}

impl Node {
    /// Creates a node with empty adjacency for layers `0..=level`.
    ///
    /// # Examples
    /// ```
    /// use akami_core::{Node, NodeId};
    ///
    /// let node = Node::new(NodeId::new(1), vec![3.0, 4.0], 2);
    /// assert_eq!(node.neighbours(2), &[] as &[NodeId]);
    /// assert!((node.norm() - 5.0).abs() < 1e-9);
    /// ```
    #[must_use]
    pub fn new(id: NodeId, vector: Vec<f32>, level: usize) -> Self {
        Self {
            id,
            vector,
            level,
            neighbours: vec![Vec::new(); level + 1],
            norm: OnceLock::new(),
        }
    }

    /// Returns the node's id.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the stored vector.
    #[must_use]
    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    /// Returns the highest layer the node occupies.
    #[must_use]
    pub const fn level(&self) -> usize {
        self.level
    }

    /// Returns the adjacency list at `layer`, empty above the node's level.
    #[must_use]
    pub fn neighbours(&self, layer: usize) -> &[NodeId] {
        self.neighbours.get(layer).map_or(&[], Vec::as_slice)
    }

    /// Returns every adjacency list, indexed by layer.
    #[must_use]
    pub fn layers(&self) -> &[Vec<NodeId>] {
        &self.neighbours
    }

    /// Returns the vector's L2 norm, computing it on first use.
    pub fn norm(&self) -> f64 {
        *self
            .norm
            .get_or_init(|| ScoreOperand::new(&self.vector).norm)
    }

    /// Presents the node to a score function.
    pub fn operand(&self) -> ScoreOperand<'_> {
        ScoreOperand {
            vector: &self.vector,
            norm: self.norm(),
        }
    }

    pub(crate) fn set_neighbours(&mut self, layer: usize, ids: Vec<NodeId>) {
        if let Some(slot) = self.neighbours.get_mut(layer) {
            *slot = ids;
        }
    }

    pub(crate) fn push_neighbour(&mut self, layer: usize, id: NodeId) {
        if let Some(slot) = self.neighbours.get_mut(layer) {
            slot.push(id);
        }
    }

    /// Rough in-memory footprint used to budget the node cache.
    pub(crate) fn estimated_size(&self) -> usize {
        self.vector.len() * size_of::<f32>()
            + self.neighbours.len() * ESTIMATED_EDGES_PER_LAYER * size_of::<NodeId>()
    }

    /// Whether the adjacency shape agrees with the level.
    pub(crate) fn is_well_formed(&self) -> bool {
        self.neighbours.len() == self.level + 1
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.level == other.level
            && self.vector == other.vector
            && self.neighbours == other.neighbours
    }
}

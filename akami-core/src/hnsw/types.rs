//! Identifiers and result types shared across the HNSW engine. Scores are
//! finite `f32` values because every stored vector passes validation.

use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

/// Caller-assigned identity of an indexed vector.
///
/// Ids are unique per index and never reused. Adjacency lists refer to other
/// nodes exclusively through these ids.
///
/// # Examples
/// ```
/// use akami_core::NodeId;
///
/// let id = NodeId::new(7);
/// assert_eq!(id.get(), 7);
/// assert_eq!(id.to_string(), "7");
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A search hit together with its score against the query.
///
/// # Examples
/// ```
/// use akami_core::{Neighbour, NodeId};
///
/// let near = Neighbour { id: NodeId::new(3), score: 0.1 };
/// let far = Neighbour { id: NodeId::new(1), score: 0.9 };
/// assert!(near < far);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Neighbour {
    /// Id of the matched node.
    pub id: NodeId,
    /// Score between the query and [`Neighbour::id`]; lower is closer.
    pub score: f32,
}

impl Eq for Neighbour {}

impl Ord for Neighbour {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Neighbour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Outcome of a self-query recall sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Recall {
    /// Fraction of nodes whose own id came back as their nearest neighbour.
    /// `0.0` for an empty index.
    pub recall: f64,
    /// Number of nodes examined.
    pub total: usize,
}

impl Recall {
    pub(crate) fn from_counts(found: usize, total: usize) -> Self {
        #[expect(
            clippy::cast_precision_loss,
            reason = "recall is a diagnostic ratio; counts beyond 2^53 are not expected"
        )]
        let recall = if total == 0 {
            0.0
        } else {
            found as f64 / total as f64
        };
        Self { recall, total }
    }
}

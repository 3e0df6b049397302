//! Request and response bodies exchanged with a [`super::Collection`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::hnsw::{NodeId, Recall};

/// Free-form JSON object attached to an item.
pub type ItemData = Map<String, Value>;

/// Number of results returned when a query does not specify `k`.
pub const DEFAULT_QUERY_K: usize = 5;

/// A vector with optional attached data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Components of the vector.
    pub vector: Vec<f32>,
    /// Data stored alongside the vector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ItemData>,
}

/// Body of an add request.
///
/// # Examples
/// ```
/// use akami_core::collection::AddItemsRequest;
///
/// let request: AddItemsRequest =
///     serde_json::from_str(r#"{"items":[{"vector":[1,2],"data":{"tag":"a"}}]}"#)
///         .expect("request must parse");
/// assert_eq!(request.items[0].vector, [1.0, 2.0]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AddItemsRequest {
    /// Items to insert, in order.
    pub items: Vec<Item>,
}

/// An item accepted by an add request, with its assigned id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddedItem {
    /// Id assigned from the collection's counter.
    pub id: NodeId,
    /// The stored item.
    #[serde(flatten)]
    pub item: Item,
}

/// Echo of the items an add request inserted. Serialises as `{}` when
/// nothing was added.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AddItemsResponse {
    /// Inserted items in request order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<AddedItem>,
}

/// Body of a query request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Query vector.
    pub vector: Vec<f32>,
    /// Maximum number of results; defaults to [`DEFAULT_QUERY_K`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<usize>,
    /// Keeps only results whose score is at most this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
}

/// One query result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    /// Id of the matched item.
    pub id: NodeId,
    /// The matched item.
    pub item: Item,
    /// Score against the query; lower is closer.
    pub score: f32,
}

/// Results of a query, ascending by score.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Matches, best first.
    pub items: Vec<QueryHit>,
}

/// Index statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Number of indexed items.
    pub total: usize,
    /// Self-query recall in `[0, 1]`.
    pub recall: f64,
}

impl From<Recall> for StatsResponse {
    fn from(recall: Recall) -> Self {
        Self {
            total: recall.total,
            recall: recall.recall,
        }
    }
}

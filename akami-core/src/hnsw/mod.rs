//! Hierarchical Navigable Small World index over an async key-value store.
//!
//! Nodes reference each other by [`NodeId`] only, so the graph lives in
//! storage as one record per node plus a small engine-state record. The
//! [`NodeCache`] keeps hot nodes in memory while a traversal runs.

mod cache;
mod candidates;
mod config;
mod error;
mod heuristic;
mod index;
mod insert;
mod node;
mod rng;
mod search;
mod state;
mod types;

pub use self::{
    cache::{NodeCache, NodeCacheConfig, NodePage, node_key},
    config::{
        ConfigUpdate, DEFAULT_EF_CONSTRUCTION, DEFAULT_EF_SEARCH, DEFAULT_M, DEFAULT_M_MAX,
        DEFAULT_M_MAX0, HnswConfig,
    },
    error::{HnswError, HnswErrorCode},
    index::{HnswIndex, IndexBuilder},
    node::Node,
    rng::MAX_LEVEL,
    state::EngineState,
    types::{Neighbour, NodeId, Recall},
};
pub(crate) use self::index::{check_dimensions, validate_vector};

#[cfg(test)]
mod tests;

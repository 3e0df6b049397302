//! Akami core library: an HNSW approximate nearest-neighbour index persisted
//! through a pluggable async key-value store.
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod collection;
mod error;
mod hnsw;
mod score;
mod storage;

pub use crate::{
    error::{StorageError, StorageErrorCode},
    hnsw::{
        ConfigUpdate, DEFAULT_EF_CONSTRUCTION, DEFAULT_EF_SEARCH, DEFAULT_M, DEFAULT_M_MAX,
        DEFAULT_M_MAX0, EngineState, HnswConfig, HnswError, HnswErrorCode, HnswIndex,
        IndexBuilder, MAX_LEVEL, Neighbour, Node, NodeCache, NodeCacheConfig, NodeId, NodePage,
        Recall, node_key,
    },
    score::{
        CosineDistance, NegativeInnerProduct, ScoreFunction, ScoreKind, ScoreOperand,
        SquaredEuclidean, UnknownScoreKind,
    },
    storage::{
        AUTOINCREMENT_KEY, CONFIG_KEY, ITEM_DATA_KEY_PREFIX, LIST_PAGE_SIZE, MemoryStorage,
        NODE_KEY_PREFIX, Page, STATE_KEY, Storage,
    },
};

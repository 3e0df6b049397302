//! Graph construction tests.

use std::{collections::HashSet, sync::Arc};

use akami_test_support::datasets::{clustered_vectors, uniform_vectors};
use rstest::rstest;

use super::fixtures::{
    all_nodes, assert_graph_well_formed, corners, insert_all, open_memory, open_with,
    small_config,
};
use crate::{
    CONFIG_KEY, EngineState, HnswConfig, IndexBuilder, MemoryStorage, NodeId, STATE_KEY,
    ScoreKind, node_key,
};

#[rstest]
#[case(ScoreKind::Cosine)]
#[case(ScoreKind::SquaredEuclidean)]
#[tokio::test]
async fn finds_nearest_corner(#[case] kind: ScoreKind) {
    let storage = Arc::new(MemoryStorage::new());
    let mut index = open_with(storage, HnswConfig::default(), kind).await;
    for (id, vector) in corners() {
        index
            .add_item(NodeId::new(id), vector, Some(0))
            .await
            .expect("insert must succeed");
    }
    let hits = index.search(&[2.0, 2.0], 1).await.expect("search must succeed");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, NodeId::new(3));
}

#[tokio::test]
async fn first_insert_fixes_entry_point_and_dimensions() {
    let (storage, mut index) = open_memory(small_config()).await;
    index
        .add_item(NodeId::new(10), vec![1.0, 2.0, 3.0], Some(2))
        .await
        .expect("insert must succeed");

    let expected = EngineState {
        max_level: Some(2),
        entrypoint_id: Some(NodeId::new(10)),
        dimensions: Some(3),
    };
    assert_eq!(index.state(), expected);
    assert!(index.is_config_persisted());

    let snapshot = storage.snapshot().expect("snapshot must succeed");
    let stored: EngineState =
        serde_json::from_slice(&snapshot[STATE_KEY]).expect("state must decode");
    assert_eq!(stored, expected);
    assert!(snapshot.contains_key(CONFIG_KEY));
    assert!(snapshot.contains_key(&node_key(NodeId::new(10))));
}

#[rstest]
#[case(3, true)]
#[case(1, false)]
#[case(0, false)]
#[tokio::test]
async fn only_higher_levels_take_over_the_entry_point(#[case] level: usize, #[case] promoted: bool) {
    let (_storage, mut index) = open_memory(small_config()).await;
    index
        .add_item(NodeId::new(1), vec![0.0, 0.0], Some(1))
        .await
        .expect("first insert must succeed");
    index
        .add_item(NodeId::new(2), vec![1.0, 0.0], Some(level))
        .await
        .expect("second insert must succeed");

    let state = index.state();
    if promoted {
        assert_eq!(state.entrypoint_id, Some(NodeId::new(2)));
        assert_eq!(state.max_level, Some(level));
    } else {
        assert_eq!(state.entrypoint_id, Some(NodeId::new(1)));
        assert_eq!(state.max_level, Some(1));
    }
}

#[tokio::test]
async fn unpruned_graphs_link_both_ways() {
    let (_storage, mut index) = open_memory(HnswConfig::default()).await;
    let vectors = uniform_vectors(12, 3, 5);
    insert_all(&mut index, &vectors).await;

    let nodes = all_nodes(&index).await;
    let edges: HashSet<(NodeId, NodeId, usize)> = nodes
        .iter()
        .flat_map(|node| {
            node.layers().iter().enumerate().flat_map(move |(layer, ids)| {
                ids.iter().map(move |id| (node.id(), *id, layer))
            })
        })
        .collect();
    assert!(!edges.is_empty());
    for (from, to, layer) in &edges {
        assert!(
            edges.contains(&(*to, *from, *layer)),
            "edge {from}->{to} at layer {layer} has no reverse edge",
        );
    }
}

#[rstest]
#[case::uniform(uniform_vectors(300, 6, 11))]
#[case::clustered(clustered_vectors(10, 30, 4, 3))]
#[tokio::test]
async fn degree_bounds_hold_under_pruning(#[case] vectors: Vec<Vec<f32>>) {
    let config = small_config();
    let (_storage, mut index) = open_memory(config).await;
    insert_all(&mut index, &vectors).await;

    let nodes = all_nodes(&index).await;
    assert_eq!(nodes.len(), vectors.len());
    assert_graph_well_formed(&nodes, &config);
    assert!(nodes.iter().all(|node| !node.neighbours(0).is_empty()));
}

#[tokio::test]
async fn reopening_restores_state_and_graph() {
    let config = small_config();
    let (storage, mut index) = open_memory(config).await;
    let vectors = uniform_vectors(40, 4, 8);
    insert_all(&mut index, &vectors).await;
    let state = index.state();
    let before = index.search(&vectors[7], 3).await.expect("search must succeed");
    drop(index);

    let mut reopened = IndexBuilder::new()
        .with_score_kind(ScoreKind::SquaredEuclidean)
        .open(storage)
        .await
        .expect("reopen must succeed");
    assert_eq!(reopened.state(), state);
    assert_eq!(reopened.config(), config);
    assert!(reopened.is_config_persisted());
    let after = reopened
        .search(&vectors[7], 3)
        .await
        .expect("search must succeed");
    assert_eq!(before, after);
}

#[tokio::test]
async fn seeded_builds_are_reproducible() {
    let vectors = uniform_vectors(60, 5, 21);
    let (left_storage, mut left) = open_memory(small_config()).await;
    let (right_storage, mut right) = open_memory(small_config()).await;
    insert_all(&mut left, &vectors).await;
    insert_all(&mut right, &vectors).await;
    assert_eq!(
        left_storage.snapshot().expect("snapshot must succeed"),
        right_storage.snapshot().expect("snapshot must succeed"),
    );
}

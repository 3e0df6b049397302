//! Tracing span and event coverage.

use akami_test_support::tracing::RecordingLayer;

use super::fixtures::{open_memory, small_config};
use crate::NodeId;

#[tokio::test]
async fn insertions_and_queries_emit_spans() {
    let (layer, _guard) = RecordingLayer::install();
    let (_storage, mut index) = open_memory(small_config()).await;
    index
        .add_item(NodeId::new(7), vec![1.0, 2.0], Some(2))
        .await
        .expect("insert must succeed");
    index
        .add_item(NodeId::new(8), vec![2.0, 2.0], Some(0))
        .await
        .expect("insert must succeed");
    index.search(&[1.0, 1.0], 3).await.expect("search must succeed");

    let add = layer.span("hnsw.add_item").expect("add span must be recorded");
    assert_eq!(add.field("id"), Some("7"));
    assert_eq!(add.field("dims"), Some("2"));
    assert_eq!(add.field("level"), Some("2"));

    let search = layer.span("hnsw.search").expect("search span must be recorded");
    assert_eq!(search.field("k"), Some("3"));
    assert_eq!(search.field("results"), Some("2"));

    let assigned = layer.events_with_message("assigned node level");
    assert_eq!(assigned.len(), 2);
    assert_eq!(layer.events_with_message("promoted entry point").len(), 1);
}

#[tokio::test]
async fn failures_are_recorded_on_the_span() {
    let (layer, _guard) = RecordingLayer::install();
    let (_storage, mut index) = open_memory(small_config()).await;
    let _ = index.search(&[1.0], 1).await;

    assert!(layer.span("hnsw.search").is_some());
    assert!(
        layer
            .events()
            .iter()
            .any(|event| event.level == tracing::Level::ERROR),
        "instrumented errors are emitted as events",
    );
}

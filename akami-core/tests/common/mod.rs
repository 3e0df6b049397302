use std::sync::Arc;

use akami_core::{
    IndexBuilder, MemoryStorage, ScoreKind,
    collection::{AddItemsRequest, Collection, Item, ItemData},
};

pub async fn open_collection(storage: &Arc<MemoryStorage>) -> Collection<MemoryStorage> {
    Collection::open(
        Arc::clone(storage),
        IndexBuilder::new()
            .with_score_kind(ScoreKind::SquaredEuclidean)
            .with_rng_seed(7),
    )
    .await
    .expect("collection must open")
}

#[must_use]
pub fn item(vector: &[f32]) -> Item {
    Item {
        vector: vector.to_vec(),
        data: None,
    }
}

#[must_use]
pub fn tagged(vector: &[f32], tag: &str) -> Item {
    let mut data = ItemData::new();
    data.insert("tag".into(), tag.into());
    Item {
        vector: vector.to_vec(),
        data: Some(data),
    }
}

#[must_use]
pub fn request(items: Vec<Item>) -> AddItemsRequest {
    AddItemsRequest { items }
}

use super::*;

fn metadata(canvas_id: CanvasId, owner_id: UserId, is_public: bool) -> EntryMetadata {
    EntryMetadata {
        canvas_id,
        owner_id,
        title: format!("Canvas {}", canvas_id),
        is_public,
        text: format!("text_box:canvas {}", canvas_id),
    }
}

#[test]
fn add_assigns_increasing_ids() {
    let mut index = VectorIndex::new();
    let first = index
        .add(vec![1.0, 0.0], metadata(1, 1, true))
        .expect("add should succeed");
    let second = index
        .add(vec![0.0, 1.0], metadata(2, 1, true))
        .expect("add should succeed");

    assert!(second > first);
    assert_eq!(index.len(), 2);
    assert_eq!(index.dimension(), Some(2));
    assert!(index.contains(first));
}

#[test]
fn ids_are_never_reused_after_delete() {
    let mut index = VectorIndex::new();
    let first = index
        .add(vec![1.0, 0.0], metadata(1, 1, true))
        .expect("add should succeed");
    assert_eq!(index.delete(&[first]), 1);

    let second = index
        .add(vec![1.0, 0.0], metadata(1, 1, true))
        .expect("add should succeed");
    assert_ne!(first, second);
    assert!(!index.contains(first));
}

#[test]
fn delete_ignores_unknown_ids() {
    let mut index = VectorIndex::new();
    let id = index
        .add(vec![1.0, 0.0], metadata(1, 1, true))
        .expect("add should succeed");

    assert_eq!(index.delete(&[EntryId(99), id, id]), 1);
    assert!(index.is_empty());
}

#[test]
fn add_rejects_dimension_change() {
    let mut index = VectorIndex::new();
    index
        .add(vec![1.0, 0.0, 0.0], metadata(1, 1, true))
        .expect("add should succeed");

    let error = index
        .add(vec![1.0, 0.0], metadata(2, 1, true))
        .expect_err("shorter vector should be rejected");
    assert!(matches!(
        error,
        CanvasSearchError::DimensionMismatch {
            expected: 3,
            actual: 2
        }
    ));
    assert_eq!(index.len(), 1);
}

#[test]
fn emptying_the_index_releases_the_dimension() {
    let mut index = VectorIndex::new();
    let first = index
        .add(vec![1.0, 0.0, 0.0], metadata(1, 1, true))
        .expect("add should succeed");

    assert_eq!(index.delete(&[first]), 1);
    assert_eq!(index.dimension(), None);

    let second = index
        .add(vec![1.0, 0.0], metadata(2, 1, true))
        .expect("empty index should accept a new dimension");
    assert_eq!(index.dimension(), Some(2));
    assert!(second > first);
}

#[test]
fn clear_keeps_the_id_counter() {
    let mut index = VectorIndex::new();
    index
        .add(vec![1.0, 0.0], metadata(1, 1, true))
        .expect("add should succeed");
    let last = index
        .add(vec![0.0, 1.0], metadata(2, 1, true))
        .expect("add should succeed");

    assert_eq!(index.clear(), 2);
    assert!(index.is_empty());
    assert_eq!(index.dimension(), None);

    let next = index
        .add(vec![1.0, 0.0, 0.0, 0.0], metadata(3, 1, true))
        .expect("add should succeed");
    assert!(next > last);
}

#[test]
fn search_orders_by_cosine_similarity() {
    let mut index = VectorIndex::new();
    let far = index
        .add(vec![0.0, 1.0], metadata(1, 1, true))
        .expect("add should succeed");
    let near = index
        .add(vec![3.0, 0.1], metadata(2, 1, true))
        .expect("add should succeed");
    let opposite = index
        .add(vec![-1.0, 0.0], metadata(3, 1, true))
        .expect("add should succeed");

    let results = index
        .similarity_search(&[1.0, 0.0], 10)
        .expect("search should succeed");

    let ids: Vec<EntryId> = results.iter().map(|r| r.entry_id).collect();
    assert_eq!(ids, vec![near, far, opposite]);
    assert!(results[0].score > 0.99);
    assert!(results[1].score.abs() < 1e-6);
    assert!((results[2].score + 1.0).abs() < 1e-6);
}

#[test]
fn ties_keep_insertion_order() {
    let mut index = VectorIndex::new();
    let ids: Vec<EntryId> = (1..=4)
        .map(|canvas| {
            index
                .add(vec![1.0, 1.0], metadata(canvas, 1, true))
                .expect("add should succeed")
        })
        .collect();

    let results = index
        .similarity_search(&[1.0, 1.0], 3)
        .expect("search should succeed");

    let found: Vec<EntryId> = results.iter().map(|r| r.entry_id).collect();
    assert_eq!(found, ids[..3].to_vec());
}

#[test]
fn zero_limit_and_empty_index_return_nothing() {
    let mut index = VectorIndex::new();
    assert!(
        index
            .similarity_search(&[1.0, 0.0], 5)
            .expect("empty search should succeed")
            .is_empty()
    );

    index
        .add(vec![1.0, 0.0], metadata(1, 1, true))
        .expect("add should succeed");
    assert!(
        index
            .similarity_search(&[1.0, 0.0], 0)
            .expect("zero limit should succeed")
            .is_empty()
    );
}

#[test]
fn zero_vector_scores_zero() {
    let mut index = VectorIndex::new();
    index
        .add(vec![0.0, 0.0], metadata(1, 1, true))
        .expect("zero vector is well formed");

    let results = index
        .similarity_search(&[1.0, 0.0], 1)
        .expect("search should succeed");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].score, 0.0);
}

#[test]
fn query_dimension_must_match() {
    let mut index = VectorIndex::new();
    index
        .add(vec![1.0, 0.0], metadata(1, 1, true))
        .expect("add should succeed");

    assert!(index.similarity_search(&[1.0, 0.0, 0.0], 1).is_err());
}

#[test]
fn filter_runs_before_truncation() {
    let mut index = VectorIndex::new();
    for canvas in 1..=5 {
        index
            .add(vec![1.0, 0.0], metadata(canvas, 7, false))
            .expect("add should succeed");
    }
    let public = index
        .add(vec![0.2, 1.0], metadata(6, 7, true))
        .expect("add should succeed");

    let results = index
        .search_filtered(&[1.0, 0.0], 2, |meta| meta.is_public)
        .expect("search should succeed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].entry_id, public);
}

#[test]
fn serde_preserves_counter_and_entries() {
    let mut index = VectorIndex::new();
    let id = index
        .add(vec![1.0, 2.0], metadata(1, 1, true))
        .expect("add should succeed");
    index.delete(&[id]);
    index
        .add(vec![2.0, 1.0], metadata(2, 1, false))
        .expect("add should succeed");

    let json = serde_json::to_string(&index).expect("should serialize");
    let mut restored: VectorIndex = serde_json::from_str(&json).expect("should deserialize");

    assert_eq!(restored, index);
    let next = restored
        .add(vec![1.0, 1.0], metadata(3, 1, true))
        .expect("add should succeed");
    assert_eq!(next, EntryId(2));
}

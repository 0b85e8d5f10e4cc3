use canvas_search::index::{EntryMetadata, VectorIndex};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const DIMENSION: usize = 768;

// Deterministic xorshift so runs are comparable
fn vector(seed: u64) -> Vec<f32> {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    (0..DIMENSION)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 2000) as f32 / 1000.0 - 1.0
        })
        .collect()
}

fn build_index(size: u64) -> VectorIndex {
    let mut index = VectorIndex::new();
    for seed in 0..size {
        let canvas_id = seed as i64;
        let metadata = EntryMetadata {
            canvas_id,
            owner_id: canvas_id % 10,
            title: format!("Canvas {}", canvas_id),
            is_public: seed % 3 == 0,
            text: String::new(),
        };
        index
            .add(vector(seed), metadata)
            .expect("bench vectors share a dimension");
    }
    index
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let query = vector(u64::MAX);
    let mut group = c.benchmark_group("search_filtered");
    for size in [1_000_u64, 10_000] {
        let index = build_index(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &index, |b, index| {
            b.iter(|| {
                index.search_filtered(black_box(&query), black_box(10), |metadata| {
                    metadata.is_public || metadata.owner_id == 4
                })
            })
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

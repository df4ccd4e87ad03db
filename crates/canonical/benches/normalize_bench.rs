use canonical::{normalize_query, normalize_text, NormalizeConfig, QueryHints};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

const DESCRIPTORS: &[&str] = &[
    "Potatoes, mashed, home-prepared, whole milk and butter added",
    "grilled chicken breast with lemon and herbs",
    "Kraft macaroni and cheese, original flavor",
    "garden salad without croutons",
];

fn bench_normalize_query(c: &mut Criterion) {
    let config = NormalizeConfig::default();
    let hints = QueryHints::default();
    let mut group = c.benchmark_group("normalize_query");

    for (idx, descriptor) in DESCRIPTORS.iter().enumerate() {
        group.throughput(Throughput::Bytes(descriptor.len() as u64));
        group.bench_function(format!("descriptor_{idx}"), |b| {
            b.iter(|| {
                normalize_query(black_box(descriptor), black_box(&hints), black_box(&config))
                    .expect("normalize")
            })
        });
    }

    group.finish();
}

fn bench_normalize_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_text");
    for size in [64usize, 512, 4096] {
        let text = "Roasted Sweet-Potatoes, ".repeat(size / 24 + 1);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_function(format!("bytes_{size}"), |b| {
            b.iter(|| normalize_text(black_box(&text), true))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_normalize_query, bench_normalize_text);
criterion_main!(benches);

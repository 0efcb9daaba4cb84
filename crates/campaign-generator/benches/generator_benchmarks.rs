//! Performance benchmarks for the deterministic domain generator.
//!
//! Run with: cargo bench -p campaign-generator --bench generator_benchmarks

use campaign_core::generation::GeneratorConfigInput;
use campaign_generator::generator::{config_hash, generate_batch, normalise, total_combinations};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn config(prefix_length: u32, suffix_length: u32, character_set: &str) -> campaign_core::generation::GeneratorConfig {
    normalise(&GeneratorConfigInput {
        pattern: "both".to_string(),
        prefix_length,
        suffix_length,
        character_set: character_set.to_string(),
        constant_string: "shop".to_string(),
        tld: "com".to_string(),
    })
    .expect("valid benchmark config")
}

fn bench_generate_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_batch");
    let cfg = config(3, 3, "abcdefghijklmnopqrstuvwxyz0123456789");
    let total = total_combinations(&cfg);

    for batch_size in [10u64, 100, 1_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch_size,
            |b, &batch_size| {
                b.iter(|| generate_batch(black_box(&cfg), black_box(total / 2), black_box(batch_size)))
            },
        );
    }
    group.finish();
}

fn bench_config_hash(c: &mut Criterion) {
    let cfg = config(3, 3, "abcdefghijklmnopqrstuvwxyz0123456789");
    c.bench_function("config_hash", |b| b.iter(|| config_hash(black_box(&cfg))));
}

fn bench_full_space_walk(c: &mut Criterion) {
    let small = config(2, 2, "abc");
    let total = total_combinations(&small);
    c.bench_function("generate_batch_full_small_space", |b| {
        b.iter(|| generate_batch(black_box(&small), 0, black_box(total)))
    });
}

criterion_group!(benches, bench_generate_batch, bench_config_hash, bench_full_space_walk);
criterion_main!(benches);

//! Performance benchmarks for the per-domain scoring hot path.
//!
//! Run with: cargo bench -p campaign-scoring --bench scoring_benchmarks

use campaign_core::feature::FeatureVector;
use campaign_core::scoring::{default_weights, NormalisedWeights};
use campaign_scoring::score_one;
use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn weights() -> NormalisedWeights {
    NormalisedWeights::from_validated(default_weights())
}

fn feature(kw_unique: f64, kw_hits_total: f64, content_bytes: f64, parked: bool) -> FeatureVector {
    FeatureVector {
        kw_unique,
        kw_hits_total,
        content_bytes,
        title_has_keyword: true,
        is_parked: parked,
        parked_confidence: parked.then_some(0.5),
        last_fetched_at: Some(Utc::now() - chrono::Duration::hours(1)),
        ..Default::default()
    }
}

fn bench_score_one(c: &mut Criterion) {
    let w = weights();
    let now = Utc::now();
    let mut group = c.benchmark_group("score_one");

    let small = feature(2.0, 4.0, 2_000.0, false);
    group.bench_function("small_document_no_tf_lite", |b| {
        b.iter(|| score_one(black_box(&small), black_box(&w), 0.5, false, now))
    });

    let large = feature(5.0, 120.0, 48_000.0, false);
    group.bench_function("large_document_with_tf_lite", |b| {
        b.iter(|| score_one(black_box(&large), black_box(&w), 0.5, true, now))
    });

    let parked = feature(5.0, 15.0, 20_000.0, true);
    group.bench_function("parked_domain_penalty", |b| {
        b.iter(|| score_one(black_box(&parked), black_box(&w), 0.5, false, now))
    });

    group.finish();
}

fn bench_score_domains_batch(c: &mut Criterion) {
    let w = weights();
    let now = Utc::now();
    let batch: Vec<FeatureVector> = (0..1_000)
        .map(|i| feature((i % 6) as f64, (i % 50) as f64, 1_000.0 + i as f64 * 37.0, i % 11 == 0))
        .collect();

    c.bench_function("score_one_1000_domain_batch", |b| {
        b.iter(|| {
            for fv in &batch {
                black_box(score_one(fv, &w, 0.5, true, now));
            }
        })
    });
}

criterion_group!(benches, bench_score_one, bench_score_domains_batch);
criterion_main!(benches);

//! Criterion benchmarks for StockLens hot paths.
//!
//! Benchmarks:
//! 1. Full engine run (partition, augment, aggregate, rank)
//! 2. Lag window evaluation on a single partition
//! 3. Top-k offer and merge

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use stocklens_core::domain::Dataset;
use stocklens_core::partition::{partition_by_ticker, DuplicatePolicy};
use stocklens_core::rank::TopK;
use stocklens_core::window::LagWindow;
use stocklens_core::{AnalyticsEngine, CancelFlag};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_dataset(tickers: usize, days: usize) -> Dataset {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let mut ds = Dataset::with_capacity(tickers * days);
    for d in 0..days {
        let date = base_date + chrono::Duration::days(d as i64);
        for t in 0..tickers {
            let close = 100.0 + ((d + t * 7) as f64 * 0.1).sin() * 10.0;
            let volume = 1_000_000.0 + ((d * 31 + t) % 500_000) as f64;
            ds.push(format!("T{t:04}"), date, close, volume);
        }
    }
    ds
}

// ── 1. Engine Run ────────────────────────────────────────────────────

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_run");
    group.sample_size(20);

    for &(tickers, days) in &[(10, 252), (100, 252), (500, 1260)] {
        let ds = make_dataset(tickers, days);
        let engine = AnalyticsEngine::default();
        let cancel = CancelFlag::new();

        group.bench_with_input(
            BenchmarkId::new("tickers_x_days", format!("{tickers}x{days}")),
            &ds,
            |b, ds| {
                b.iter(|| engine.run(black_box(ds), &cancel));
            },
        );
    }

    group.finish();
}

// ── 2. Lag Windows ───────────────────────────────────────────────────

fn bench_windows(c: &mut Criterion) {
    let mut group = c.benchmark_group("lag_window");

    for &days in &[252, 2520] {
        let ds = make_dataset(1, days);
        let set = partition_by_ticker(ds.rows().to_vec(), DuplicatePolicy::Reject);
        let partition = &set.partitions[0];

        group.bench_with_input(BenchmarkId::new("daily", days), &days, |b, _| {
            b.iter(|| LagWindow::daily().evaluate(black_box(partition)));
        });
        group.bench_with_input(BenchmarkId::new("monthly", days), &days, |b, _| {
            b.iter(|| LagWindow::monthly().evaluate(black_box(partition)));
        });
    }

    group.finish();
}

// ── 3. Top-k ─────────────────────────────────────────────────────────

fn bench_top_k(c: &mut Criterion) {
    let mut group = c.benchmark_group("top_k");
    let scores: Vec<f64> = (0..100_000).map(|i| (i as f64 * 0.37).sin()).collect();

    group.bench_function("offer_100k_k3", |b| {
        b.iter(|| {
            let mut top = TopK::new(3);
            for (i, &s) in scores.iter().enumerate() {
                top.offer(Some(s), i as u64, i);
            }
            top.into_sorted_vec()
        });
    });

    group.bench_function("merge_1000_locals_k3", |b| {
        b.iter(|| {
            let mut merged = TopK::new(3);
            for chunk in scores.chunks(100) {
                let mut local = TopK::new(3);
                for (i, &s) in chunk.iter().enumerate() {
                    local.offer(Some(s), i as u64, ());
                }
                merged = merged.merge(local);
            }
            merged.len()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_engine, bench_windows, bench_top_k);
criterion_main!(benches);

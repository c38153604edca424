//! Criterion benchmarks for SlotLab core hot paths.
//!
//! Benchmarks:
//! 1. Tick aggregation with indicator calculation on every sealed bar
//! 2. Signal-event resolution over a sealed bar series

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;

use slotlab_core::data::tick_pairs;
use slotlab_core::domain::{Tick, TickPair, Timeframe};
use slotlab_core::engine::{signal_events, CandlestickAggregator, SignalEventPolicy};
use slotlab_core::indicators::IndicatorSettings;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_ticks(n: usize) -> Vec<Tick> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n)
        .map(|i| {
            let wave = ((i as f64 * 0.002).sin() * 500.0) as i64;
            let bid = Decimal::new(110_000 + wave, 5);
            Tick::new(
                start + chrono::Duration::seconds(20 * i as i64),
                bid,
                bid + Decimal::new(12, 5),
            )
        })
        .collect()
}

fn make_pairs(n: usize) -> Vec<TickPair> {
    tick_pairs(&make_ticks(n)).collect()
}

// ── 1. Aggregation ───────────────────────────────────────────────────

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");
    for n in [10_000usize, 100_000] {
        let pairs = make_pairs(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &pairs, |b, pairs| {
            b.iter(|| {
                let mut agg =
                    CandlestickAggregator::new(Timeframe::m15(), IndicatorSettings::default());
                black_box(agg.run(pairs).unwrap())
            })
        });
    }
    group.finish();
}

// ── 2. Signal Events ─────────────────────────────────────────────────

fn bench_signal_events(c: &mut Criterion) {
    let pairs = make_pairs(100_000);
    let mut agg = CandlestickAggregator::new(Timeframe::m15(), IndicatorSettings::default());
    let bars = agg.run(&pairs).unwrap();
    let tf = Timeframe::m15();

    c.bench_function("signal_events_collapse", |b| {
        b.iter(|| black_box(signal_events(&bars, SignalEventPolicy::CollapseRuns, &tf)))
    });
}

criterion_group!(benches, bench_aggregation, bench_signal_events);
criterion_main!(benches);

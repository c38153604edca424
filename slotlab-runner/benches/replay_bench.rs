//! Criterion benchmarks for the replay hot loop.
//!
//! Run with: `cargo bench -p slotlab-runner`
//!
//! Benchmarks:
//! 1. Single-event replay over the default 91-entry grid
//! 2. Full statistics run, serial vs parallel
//! 3. Slot selection over the resulting statistics

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;

use slotlab_core::domain::{Instrument, OrderType, Signal, Tick, TimeScope, Timeframe};
use slotlab_core::engine::SignalEvent;
use slotlab_runner::{RiskGrid, SelectionConfig, Simulator, SlotSelector, SweepConfig};

fn make_ticks(n: usize) -> Vec<Tick> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n)
        .map(|i| {
            let wave = ((i as f64 * 0.0007).sin() * 9_000.0) as i64;
            let bid = Decimal::new(110_000 + wave, 5);
            Tick::new(
                start + Duration::seconds(10 * i as i64),
                bid,
                bid + Decimal::new(12, 5),
            )
        })
        .collect()
}

fn make_events(ticks: &[Tick], every: usize) -> Vec<SignalEvent> {
    let tf = Timeframe::m15();
    ticks
        .iter()
        .step_by(every)
        .enumerate()
        .map(|(i, t)| {
            let (signal, order_type) = if i % 2 == 0 {
                (Signal::Bullish, OrderType::Buy)
            } else {
                (Signal::Bearish, OrderType::Sell)
            };
            SignalEvent {
                bar_timestamp: tf.bar_start(t.timestamp),
                opened_at: t.timestamp,
                signal,
                order_type,
                scope: TimeScope::of(t.timestamp, &tf),
            }
        })
        .collect()
}

fn simulator() -> Simulator {
    let grid = RiskGrid::from_sweep(&SweepConfig::default()).unwrap();
    let instrument = Instrument::new("EURUSD", Decimal::new(1, 4), Decimal::ZERO, Decimal::ZERO);
    Simulator::new(grid, instrument)
}

// ── 1. Single Event ──────────────────────────────────────────────────

fn bench_single_replay(c: &mut Criterion) {
    let ticks = make_ticks(200_000);
    let events = make_events(&ticks, 50_000);
    let sim = simulator();

    c.bench_function("replay_single_event", |b| {
        b.iter(|| black_box(sim.replay(&ticks, &events[0])))
    });
}

// ── 2. Statistics Run ────────────────────────────────────────────────

fn bench_run(c: &mut Criterion) {
    let ticks = make_ticks(200_000);
    let events = make_events(&ticks, 2_000);
    let mut group = c.benchmark_group("replay_run");
    group.sample_size(10);

    for parallel in [false, true] {
        let sim = simulator().with_parallelism(parallel);
        group.bench_with_input(
            BenchmarkId::from_parameter(if parallel { "parallel" } else { "serial" }),
            &events,
            |b, events| b.iter(|| black_box(sim.run(&ticks, events))),
        );
    }
    group.finish();
}

// ── 3. Selection ─────────────────────────────────────────────────────

fn bench_select(c: &mut Criterion) {
    let ticks = make_ticks(100_000);
    let events = make_events(&ticks, 500);
    let stats = simulator().run(&ticks, &events);
    let selector = SlotSelector::from(&SelectionConfig::default());
    let tf = Timeframe::m15();

    c.bench_function("select_slots", |b| {
        b.iter(|| black_box(selector.select(&stats, &tf)))
    });
}

criterion_group!(benches, bench_single_replay, bench_run, bench_select);
criterion_main!(benches);

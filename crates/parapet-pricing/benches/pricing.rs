//! Pricing engine benchmarks
//!
//! The quote path prices on every request, so the engine has to stay well
//! under a millisecond even for dense multi-decade catalogs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;

use parapet_common::{HazardEvent, HazardHistory, PoolType};
use parapet_pricing::{backtest, PricingEngine};

fn dense_history(years: u32, events_per_year: u32) -> HazardHistory {
    let mut events = Vec::new();
    for y in 0..years {
        for e in 0..events_per_year {
            // Spread values around the trigger so both branches run.
            let value = 4.0 + f64::from((y * 7 + e * 3) % 40) / 10.0;
            events.push(HazardEvent {
                year: (1984 + y) as u16,
                value,
            });
        }
    }
    HazardHistory {
        pool_type: PoolType::Earthquake,
        events,
        years_of_data: years,
        source: "bench catalog".into(),
        range_label: "1984-2023".into(),
        is_simulated: false,
    }
}

fn bench_price(c: &mut Criterion) {
    let mut group = c.benchmark_group("price");
    let engine = PricingEngine::new();
    let coverage = Decimal::from(100_000u64);

    for (years, per_year) in [(10u32, 2u32), (30, 5), (40, 20)] {
        let history = dense_history(years, per_year);
        group.bench_with_input(
            BenchmarkId::new("events", years * per_year),
            &history,
            |b, h| {
                b.iter(|| engine.price(black_box(h), black_box(5.0), black_box(coverage)));
            },
        );
    }

    group.finish();
}

fn bench_backtest(c: &mut Criterion) {
    let history = dense_history(40, 10);
    c.bench_function("backtest_40y", |b| {
        b.iter(|| backtest::run(black_box(&history), black_box(5.0)));
    });
}

criterion_group!(benches, bench_price, bench_backtest);
criterion_main!(benches);

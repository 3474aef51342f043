//! Benchmarks for the pure hot-path components: gas planning, batch
//! planning, and adaptive state transitions.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use dex_keeper::adaptive::AdaptiveController;
use dex_keeper::config::AppConfig;
use dex_keeper::executor::{BatchPlanner, GasEstimator};
use dex_keeper::utils::types::PriceUpdate;

fn updates(n: usize) -> Vec<PriceUpdate> {
    (0..n)
        .map(|i| PriceUpdate {
            symbol: format!("TOK{i}"),
            token: Address::repeat_byte(i as u8 + 1),
            price: U256::from(1_000_000_000_000_000_000u128 + i as u128),
        })
        .collect()
}

fn bench_gas_planning(c: &mut Criterion) {
    let adaptive = Arc::new(AdaptiveController::new(6));
    let estimator = GasEstimator::new(AppConfig::default_for_test().gas, adaptive);

    c.bench_function("gas_price_plan", |b| {
        b.iter(|| {
            let price = estimator.price_gwei(black_box(35.0), black_box(1.44));
            black_box(price)
        })
    });

    c.bench_function("gas_limit_plan", |b| {
        b.iter(|| {
            let limit = estimator.limit_for(black_box(6), black_box(2), black_box(1.44));
            black_box(limit)
        })
    });
}

fn bench_batch_planning(c: &mut Criterion) {
    let adaptive = Arc::new(AdaptiveController::new(6));
    let planner = BatchPlanner::new(adaptive);
    let feed = updates(24);

    c.bench_function("batch_plan_24_updates", |b| {
        b.iter(|| black_box(planner.plan(black_box(feed.clone()))))
    });
}

fn bench_adaptive_transitions(c: &mut Criterion) {
    c.bench_function("adaptive_failure_success_cycle", |b| {
        let controller = AdaptiveController::new(6);
        b.iter(|| {
            controller.on_failure();
            controller.on_failure();
            controller.on_success();
            controller.on_success();
            black_box(controller.snapshot())
        })
    });
}

criterion_group!(
    benches,
    bench_gas_planning,
    bench_batch_planning,
    bench_adaptive_transitions
);
criterion_main!(benches);

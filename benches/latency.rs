//! Latency benchmarks for single trading and valuation operations.
//!
//! Run with: `cargo bench --bench latency`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::runtime::Runtime;

use market_core::config::TradingConfig;
use market_core::feed::PriceBook;
use market_core::numeric::{pct_change, round_display};
use market_core::types::{Holding, PlayerId, PlayerPriceObservation, Trade, TradeSide};
use trading_engine::{apply_average_cost, Ledger, PortfolioValuator, TradeExecutor};

/// Price book with `players` players, each quoted `depth` times.
fn generate_book(players: u32, depth: i64) -> Arc<PriceBook> {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let book = PriceBook::new();
    for player in 0..players {
        for i in 0..depth {
            book.record(PlayerPriceObservation::new(
                PlayerId(player),
                base + Duration::hours(i),
                Decimal::new(1000 + (player as i64 * 7 + i * 13) % 500, 2),
            ))
            .unwrap();
        }
    }
    Arc::new(book)
}

fn unlimited_cash() -> TradingConfig {
    TradingConfig {
        enforce_cash: false,
        ..Default::default()
    }
}

/// Benchmark the pure average-cost update.
fn bench_average_cost(c: &mut Criterion) {
    let mut group = c.benchmark_group("average_cost");

    let holding = Holding::new("user", PlayerId(1), Decimal::new(15, 0), Decimal::new(12, 0));
    let buy = Trade::new(
        "user",
        PlayerId(1),
        TradeSide::Buy,
        Decimal::new(5, 0),
        Decimal::new(16, 0),
    );
    let sell = Trade::new(
        "user",
        PlayerId(1),
        TradeSide::Sell,
        Decimal::new(5, 0),
        Decimal::new(20, 0),
    );

    group.bench_function("buy", |b| {
        b.iter(|| black_box(apply_average_cost(black_box(Some(&holding)), black_box(&buy))))
    });

    group.bench_function("sell", |b| {
        b.iter(|| black_box(apply_average_cost(black_box(Some(&holding)), black_box(&sell))))
    });

    group.finish();
}

/// Benchmark a full buy/sell round trip through the executor.
fn bench_trade_execution(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let book = generate_book(10, 5);
    let ledger = Arc::new(Ledger::in_memory(&unlimited_cash()));
    let executor = TradeExecutor::new(book, ledger);
    let executor = &executor;

    c.bench_function("execute_round_trip", |b| {
        b.to_async(&rt).iter(|| async move {
            executor
                .execute("bench", PlayerId(3), TradeSide::Buy, Decimal::new(2, 0))
                .await
                .unwrap();
            black_box(
                executor
                    .execute("bench", PlayerId(3), TradeSide::Sell, Decimal::new(2, 0))
                    .await
                    .unwrap(),
            )
        })
    });
}

/// Benchmark portfolio valuation by number of holdings.
fn bench_portfolio_valuation(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("portfolio_valuation");

    for holdings in [1u32, 10, 50, 200].iter() {
        let book = generate_book(*holdings, 3);
        let ledger = Arc::new(Ledger::in_memory(&unlimited_cash()));
        let executor = TradeExecutor::new(book.clone(), ledger.clone());

        rt.block_on(async {
            for player in 0..*holdings {
                executor
                    .execute("bench", PlayerId(player), TradeSide::Buy, Decimal::new(10, 0))
                    .await
                    .unwrap();
            }
        });

        let valuator = PortfolioValuator::new(book, ledger);

        group.throughput(Throughput::Elements(*holdings as u64));
        group.bench_with_input(
            BenchmarkId::new("value_portfolio", holdings),
            &valuator,
            |b, valuator| {
                b.to_async(&rt).iter(|| async move {
                    black_box(valuator.value_portfolio("bench").await.unwrap())
                })
            },
        );
    }

    group.finish();
}

/// Benchmark Decimal helpers on the display path.
fn bench_decimal_helpers(c: &mut Criterion) {
    let mut group = c.benchmark_group("decimal_helpers");

    let from = Decimal::new(1234, 2);
    let to = Decimal::new(1357, 2);

    group.bench_function("pct_change", |b| {
        b.iter(|| black_box(pct_change(black_box(from), black_box(to))))
    });

    group.bench_function("round_display", |b| {
        b.iter(|| black_box(round_display(black_box(Decimal::new(123455, 4)))))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_average_cost,
    bench_trade_execution,
    bench_portfolio_valuation,
    bench_decimal_helpers,
);

criterion_main!(benches);

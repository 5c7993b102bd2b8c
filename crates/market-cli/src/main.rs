//! BallStreet CLI
//!
//! Loads a market snapshot and runs the core's rankings, insights, and trade
//! replay against it, printing JSON to stdout.

mod cli;
mod snapshot;

use anyhow::Result;
use clap::Parser;
use market_analytics::{InsightAggregator, MarketRanker};
use market_core::config::Config;
use market_core::numeric::round_display;
use market_core::types::{Opportunity, TrendingEntry, VolatilityEntry};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trading_engine::{Ledger, PortfolioValuator, TradeExecutor};

use cli::{Cli, Commands};
use snapshot::MarketData;

const DEFAULT_FILTER: &str =
    "ballstreet=info,trading_engine=info,market_analytics=info,market_core=warn";

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn first_n<T>(mut entries: Vec<T>, n: usize) -> Vec<T> {
    entries.truncate(n);
    entries
}

fn round_f64(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(round_display)
}

#[derive(Serialize)]
struct VolatilityRow {
    player_id: market_core::types::PlayerId,
    stddev_pct: Option<Decimal>,
    samples: usize,
}

fn display_trending(entries: Vec<TrendingEntry>) -> Vec<TrendingEntry> {
    entries
        .into_iter()
        .map(|e| TrendingEntry {
            current_price: round_display(e.current_price),
            price_change: round_display(e.price_change),
            pct_change: round_display(e.pct_change),
            ..e
        })
        .collect()
}

fn display_volatile(entries: Vec<VolatilityEntry>) -> Vec<VolatilityRow> {
    entries
        .into_iter()
        .map(|e| VolatilityRow {
            player_id: e.player_id,
            stddev_pct: round_f64(e.stddev_pct),
            samples: e.samples,
        })
        .collect()
}

fn display_opportunities(opportunities: Vec<Opportunity>) -> Vec<Opportunity> {
    opportunities
        .into_iter()
        .map(|o| Opportunity {
            current_price: round_display(o.current_price),
            predicted_price: round_display(o.predicted_price),
            potential_return_pct: round_display(o.potential_return_pct),
            ..o
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let config = match &cli.config {
        Some(dir) => Config::load_from(dir)?,
        None => Config::from_env()?,
    };

    let data = MarketData::load(&cli.market)?;
    info!(
        players = data.prices.len(),
        predictions = data.predictions.len(),
        "Loaded market snapshot"
    );

    let prices = Arc::new(data.prices);
    let predictions = Arc::new(data.predictions);

    match cli.command {
        Commands::Trending { window, limit } => {
            let window = window.unwrap_or(config.analytics.default_trending_window);
            let limit = limit.unwrap_or(config.analytics.default_top_n);
            let ranker = MarketRanker::new(prices);
            let ranked = first_n(ranker.trending(window).await?, limit);
            print_json(&display_trending(ranked))?;
        }
        Commands::Volatile { window, limit } => {
            let window = window.unwrap_or(config.analytics.default_volatility_window);
            let limit = limit.unwrap_or(config.analytics.default_top_n);
            let ranker = MarketRanker::new(prices);
            let ranked = first_n(ranker.volatile(window).await?, limit);
            print_json(&display_volatile(ranked))?;
        }
        Commands::Insights { top } => {
            let top = top.unwrap_or(config.analytics.default_top_n);
            let aggregator = InsightAggregator::new(prices, predictions, &config.analytics);
            let mut report = aggregator.insights(top).await?;
            report.top_opportunities = display_opportunities(report.top_opportunities);
            print_json(&report)?;
        }
        Commands::Replay { trades, user } => {
            let instructions = snapshot::load_trades(&trades)?;
            let ledger = Arc::new(Ledger::in_memory(&config.trading));
            let executor = TradeExecutor::new(prices.clone(), ledger.clone());

            for instruction in &instructions {
                // A rejected trade is reported and the replay continues.
                if let Err(e) = executor
                    .execute(&user, instruction.player_id, instruction.side, instruction.shares)
                    .await
                {
                    warn!(player_id = %instruction.player_id, error = %e, "Skipped trade");
                }
            }

            let metrics = executor.metrics();
            info!(
                executed = metrics.trades_executed,
                rejected = metrics.trades_rejected,
                "Replay complete"
            );

            let valuator = PortfolioValuator::new(prices, ledger);
            print_json(&valuator.value_portfolio(&user).await?.rounded())?;
        }
    }

    Ok(())
}

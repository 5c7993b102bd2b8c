//! BallStreet: valuation and analytics core for a synthetic NBA player stock market
//!
//! This is the root crate that provides benchmark access to the internal modules.
//! For actual functionality, use the individual crates directly:
//!
//! - `market-core`: Player, price, holding and trade types, price feeds, configuration
//! - `trading-engine`: Average-cost ledger, trade execution, portfolio valuation
//! - `market-analytics`: Trending and volatility rankings, predictor insights
//! - `market-cli`: The `ballstreet` command-line tool

// Re-export for benchmarks
pub use market_analytics as analytics;
pub use market_core as core;
pub use trading_engine as trading;

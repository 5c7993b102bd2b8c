//! Market Analytics
//!
//! Trending and volatility rankings, and AI-driven opportunity and sentiment
//! aggregation, for the BallStreet player market.

pub mod insights;
pub mod ranker;

pub use insights::{sentiment_from_returns, InsightAggregator};
pub use ranker::{MarketRanker, MIN_TRENDING_OBSERVATIONS, MIN_VOLATILITY_OBSERVATIONS};

//! Derived market ranking types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PlayerId;

/// Most recent percentage move for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingEntry {
    pub player_id: PlayerId,
    pub current_price: Decimal,
    pub price_change: Decimal,
    pub pct_change: Decimal,
}

/// Population standard deviation of consecutive percentage moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityEntry {
    pub player_id: PlayerId,
    pub stddev_pct: f64,
    /// Number of percentage moves the deviation was taken over.
    pub samples: usize,
}

/// Rankings recomputed on demand; never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub trending: Vec<TrendingEntry>,
    pub volatile: Vec<VolatilityEntry>,
}

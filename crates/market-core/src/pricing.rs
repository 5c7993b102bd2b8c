//! Box-score performance scoring and the score-to-price mapping.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::config::PricingConfig;
use crate::types::{PlayerId, PlayerPriceObservation, RawStats};

const PTS_WEIGHT: f64 = 1.0;
const REB_WEIGHT: f64 = 1.2;
const AST_WEIGHT: f64 = 1.5;
const STL_WEIGHT: f64 = 2.0;
const BLK_WEIGHT: f64 = 2.0;
const TOV_WEIGHT: f64 = -2.0;

/// Turns a box score into a share price.
#[derive(Debug, Clone)]
pub struct PriceModel {
    config: PricingConfig,
}

impl PriceModel {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    /// Weighted sum of the box-score line. Turnovers count against the player.
    pub fn performance_score(stats: &RawStats) -> f64 {
        stats.pts * PTS_WEIGHT
            + stats.reb * REB_WEIGHT
            + stats.ast * AST_WEIGHT
            + stats.stl * STL_WEIGHT
            + stats.blk * BLK_WEIGHT
            + stats.tov * TOV_WEIGHT
    }

    /// Map a score linearly from the configured score range onto the price
    /// range, clamping scores outside it. Rounded to cents.
    pub fn price_for_score(&self, score: f64) -> Decimal {
        let c = &self.config;
        if !score.is_finite() {
            return c.price_floor;
        }

        let clamped = score.clamp(c.score_floor, c.score_ceiling);
        let fraction = (clamped - c.score_floor) / (c.score_ceiling - c.score_floor);
        let fraction = Decimal::from_f64(fraction).unwrap_or(Decimal::ZERO);

        let price = c.price_floor + (c.price_ceiling - c.price_floor) * fraction;
        price.round_dp(2).clamp(c.price_floor, c.price_ceiling)
    }

    /// Build an observation from a box score, filling in its performance score.
    pub fn observe(
        &self,
        player_id: PlayerId,
        timestamp: DateTime<Utc>,
        mut stats: RawStats,
    ) -> PlayerPriceObservation {
        stats.performance_score = Self::performance_score(&stats);
        let price = self.price_for_score(stats.performance_score);
        PlayerPriceObservation::new(player_id, timestamp, price).with_stats(stats)
    }
}

impl Default for PriceModel {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(pts: f64, reb: f64, ast: f64, stl: f64, blk: f64, tov: f64) -> RawStats {
        RawStats {
            pts,
            reb,
            ast,
            stl,
            blk,
            tov,
            performance_score: 0.0,
        }
    }

    #[test]
    fn test_performance_score_weights() {
        let stats = line(20.0, 10.0, 4.0, 1.0, 1.0, 3.0);
        // 20 + 12 + 6 + 2 + 2 - 6
        assert!((PriceModel::performance_score(&stats) - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_price_bounds() {
        let model = PriceModel::default();
        assert_eq!(model.price_for_score(-50.0), Decimal::new(10, 0));
        assert_eq!(model.price_for_score(100.0), Decimal::new(1000, 0));
        assert_eq!(model.price_for_score(-500.0), Decimal::new(10, 0));
        assert_eq!(model.price_for_score(500.0), Decimal::new(1000, 0));
        assert_eq!(model.price_for_score(f64::NAN), Decimal::new(10, 0));
    }

    #[test]
    fn test_price_midpoint() {
        let model = PriceModel::default();
        // 25 is halfway between -50 and 100.
        assert_eq!(model.price_for_score(25.0), Decimal::new(505, 0));
    }

    #[test]
    fn test_observe_fills_score() {
        let model = PriceModel::default();
        let obs = model.observe(PlayerId(3), Utc::now(), line(25.0, 0.0, 0.0, 0.0, 0.0, 0.0));
        assert!((obs.raw_stats.performance_score - 25.0).abs() < 1e-9);
        assert!(obs.price > Decimal::ZERO);
    }
}

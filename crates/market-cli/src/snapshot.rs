//! Loading market and trade files at the CLI boundary.
//!
//! Everything read from disk is coerced into the core's typed entities here;
//! malformed input is rejected before any arithmetic sees it.

use anyhow::{Context, Result};
use market_core::feed::{PriceBook, StaticPredictionFeed};
use market_core::types::{
    FeatureImportance, PlayerId, PlayerPriceObservation, Prediction, TradeSide,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct MarketFile {
    observations: Vec<PlayerPriceObservation>,
    #[serde(default)]
    predictions: HashMap<PlayerId, PredictionInput>,
}

#[derive(Debug, Deserialize)]
struct PredictionInput {
    predicted_price: f64,
    feature_importance: FeatureImportance,
}

/// A trade instruction from a replay file.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeInstruction {
    pub player_id: PlayerId,
    #[serde(rename = "type")]
    pub side: TradeSide,
    pub shares: Decimal,
}

/// Price history and predictions for one run.
pub struct MarketData {
    pub prices: PriceBook,
    pub predictions: StaticPredictionFeed,
}

impl MarketData {
    pub fn from_json(raw: &str) -> Result<Self> {
        let file: MarketFile = serde_json::from_str(raw).context("Malformed market file")?;

        let prices = PriceBook::from_observations(file.observations)
            .context("Invalid price observations")?;

        let predictions = StaticPredictionFeed::new();
        for (player_id, input) in file.predictions {
            let prediction =
                Prediction::from_raw(player_id, input.predicted_price, input.feature_importance)?;
            predictions.publish(player_id, prediction);
        }

        Ok(Self {
            prices,
            predictions,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read market file {}", path.display()))?;
        Self::from_json(&raw)
    }
}

pub fn load_trades(path: &Path) -> Result<Vec<TradeInstruction>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read trades file {}", path.display()))?;
    serde_json::from_str(&raw).context("Malformed trades file")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKET: &str = r#"{
        "observations": [
            {"player_id": 1, "timestamp": "2024-01-02T00:00:00Z", "price": "12"},
            {"player_id": 1, "timestamp": "2024-01-01T00:00:00Z", "price": "10",
             "raw_stats": {"PTS": 20, "REB": 5, "AST": 3, "STL": 1, "BLK": 0, "TOV": 2}}
        ],
        "predictions": {
            "1": {"predicted_price": 13.2, "feature_importance": {"PTS": 0.7, "AST": 0.3}}
        }
    }"#;

    #[test]
    fn test_loads_market_file() {
        let data = MarketData::from_json(MARKET).unwrap();
        let series = data.prices.snapshot(PlayerId(1)).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.current_price(), Decimal::new(12, 0));
        assert_eq!(data.predictions.len(), 1);
    }

    #[test]
    fn test_rejects_non_positive_price() {
        let raw = r#"{"observations": [
            {"player_id": 1, "timestamp": "2024-01-01T00:00:00Z", "price": "-1"}
        ]}"#;
        assert!(MarketData::from_json(raw).is_err());
    }

    #[test]
    fn test_rejects_unknown_trade_side() {
        let raw = r#"[{"player_id": 1, "type": "HOLD", "shares": "1"}]"#;
        assert!(serde_json::from_str::<Vec<TradeInstruction>>(raw).is_err());
    }

    #[test]
    fn test_parses_trade_instructions() {
        let raw = r#"[{"player_id": 3, "type": "BUY", "shares": "2.5"}]"#;
        let trades: Vec<TradeInstruction> = serde_json::from_str(raw).unwrap();
        assert_eq!(trades[0].side, TradeSide::Buy);
        assert_eq!(trades[0].shares, Decimal::new(25, 1));
    }
}

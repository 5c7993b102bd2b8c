//! Predictor output and the derived opportunity/sentiment types.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::PlayerId;
use crate::{Error, Result};

/// Feature name to non-negative weight, expected to sum to 1.0.
pub type FeatureImportance = BTreeMap<String, f64>;

/// Output of the external price predictor for one player. Untrusted until validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_price: Decimal,
    pub feature_importance: FeatureImportance,
}

impl Prediction {
    pub fn new(predicted_price: Decimal, feature_importance: FeatureImportance) -> Self {
        Self {
            predicted_price,
            feature_importance,
        }
    }

    /// Coerce a float prediction into decimal form, rejecting NaN, infinities
    /// and non-positive prices instead of letting them reach the arithmetic.
    pub fn from_raw(
        player_id: PlayerId,
        predicted_price: f64,
        feature_importance: FeatureImportance,
    ) -> Result<Self> {
        if !predicted_price.is_finite() {
            return Err(Error::InvalidPrediction {
                player_id,
                reason: format!("predicted price {} is not finite", predicted_price),
            });
        }
        let price = Decimal::from_f64(predicted_price).ok_or_else(|| Error::InvalidPrediction {
            player_id,
            reason: format!("predicted price {} is out of range", predicted_price),
        })?;
        let prediction = Self::new(price, feature_importance);
        prediction.validate_price(player_id)?;
        Ok(prediction)
    }

    pub fn validate_price(&self, player_id: PlayerId) -> Result<()> {
        if self.predicted_price <= Decimal::ZERO {
            return Err(Error::InvalidPrediction {
                player_id,
                reason: format!("predicted price {} must be positive", self.predicted_price),
            });
        }
        Ok(())
    }

    /// Check that weights are finite, non-negative, and sum to 1.0 within `tolerance`.
    ///
    /// Weights are never renormalized here: a predictor returning a bad mapping
    /// is a bug to surface, not something to paper over.
    pub fn validate_weights(&self, player_id: PlayerId, tolerance: f64) -> Result<()> {
        if self.feature_importance.is_empty() {
            return Err(Error::InvalidFeatureWeights {
                player_id,
                reason: "no feature weights supplied".to_string(),
            });
        }

        for (feature, weight) in &self.feature_importance {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(Error::InvalidFeatureWeights {
                    player_id,
                    reason: format!("weight for '{}' is {}", feature, weight),
                });
            }
        }

        let sum: f64 = self.feature_importance.values().sum();
        if (sum - 1.0).abs() > tolerance {
            return Err(Error::InvalidFeatureWeights {
                player_id,
                reason: format!("weights sum to {:.6}, expected 1.0 +/- {}", sum, tolerance),
            });
        }

        Ok(())
    }
}

/// A player ranked by the gap between predicted and current price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub player_id: PlayerId,
    pub current_price: Decimal,
    pub predicted_price: Decimal,
    pub potential_return_pct: Decimal,
    pub feature_importance: FeatureImportance,
}

/// Direction label for the aggregate sentiment score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SentimentLabel {
    Bullish,
    Bearish,
}

impl SentimentLabel {
    /// Strictly positive scores are bullish; zero is bearish.
    pub fn from_score(score: f64) -> Self {
        if score > 0.0 {
            SentimentLabel::Bullish
        } else {
            SentimentLabel::Bearish
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Bullish => write!(f, "Bullish"),
            SentimentLabel::Bearish => write!(f, "Bearish"),
        }
    }
}

/// Aggregate market sentiment in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSentiment {
    pub score: f64,
    pub label: SentimentLabel,
    /// Mean potential return across the universe; `None` when no player had a prediction.
    pub mean_return_pct: Option<f64>,
    pub sample_size: usize,
}

/// Combined AI insight payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub top_opportunities: Vec<Opportunity>,
    pub sentiment: MarketSentiment,
}

//! Combines model predictions with live prices into ranked opportunities
//! and an aggregate sentiment score.

use market_core::config::AnalyticsConfig;
use market_core::feed::{PredictionFeed, PriceFeed};
use market_core::numeric::{pct_change, to_f64};
use market_core::types::{
    InsightReport, MarketSentiment, Opportunity, PlayerId, SentimentLabel,
};
use market_core::{Error, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Squash a mean potential return into `[-1, 1]` with `tanh(mean / scale)`.
///
/// Monotonic in the mean; `scale` is the mean return (in percent) that maps
/// to `tanh(1) ~= 0.76`. A score of exactly zero is labelled bearish.
pub fn sentiment_from_returns(returns: &[f64], scale: f64) -> MarketSentiment {
    if returns.is_empty() {
        return MarketSentiment {
            score: 0.0,
            label: SentimentLabel::Bearish,
            mean_return_pct: None,
            sample_size: 0,
        };
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let score = (mean / scale).tanh().clamp(-1.0, 1.0);

    MarketSentiment {
        score,
        label: SentimentLabel::from_score(score),
        mean_return_pct: Some(mean),
        sample_size: returns.len(),
    }
}

/// Descending by potential return, ties by player id ascending.
pub fn sort_opportunities(opportunities: &mut [Opportunity]) {
    opportunities.sort_by(|a, b| {
        b.potential_return_pct
            .cmp(&a.potential_return_pct)
            .then_with(|| a.player_id.cmp(&b.player_id))
    });
}

/// Ranks players by predicted upside.
pub struct InsightAggregator {
    prices: Arc<dyn PriceFeed>,
    predictions: Arc<dyn PredictionFeed>,
    sentiment_scale: f64,
    weight_tolerance: f64,
}

impl InsightAggregator {
    pub fn new(
        prices: Arc<dyn PriceFeed>,
        predictions: Arc<dyn PredictionFeed>,
        config: &AnalyticsConfig,
    ) -> Self {
        Self {
            prices,
            predictions,
            sentiment_scale: config.sentiment_scale,
            weight_tolerance: config.weight_tolerance,
        }
    }

    /// The `n` players with the highest potential return.
    pub async fn top_opportunities(&self, n: usize) -> Result<Vec<Opportunity>> {
        let mut ranked = self.ranked_opportunities().await?;
        ranked.truncate(n);
        Ok(ranked)
    }

    /// Mean potential return across every player with a prediction, squashed to `[-1, 1]`.
    pub async fn market_sentiment(&self) -> Result<MarketSentiment> {
        let ranked = self.ranked_opportunities().await?;
        Ok(self.sentiment_of(&ranked))
    }

    /// Top opportunities and sentiment from a single pass over the universe.
    pub async fn insights(&self, n: usize) -> Result<InsightReport> {
        let mut ranked = self.ranked_opportunities().await?;
        let sentiment = self.sentiment_of(&ranked);
        ranked.truncate(n);
        Ok(InsightReport {
            top_opportunities: ranked,
            sentiment,
        })
    }

    fn sentiment_of(&self, opportunities: &[Opportunity]) -> MarketSentiment {
        let returns: Vec<f64> = opportunities
            .iter()
            .map(|o| to_f64(o.potential_return_pct))
            .collect();
        sentiment_from_returns(&returns, self.sentiment_scale)
    }

    async fn ranked_opportunities(&self) -> Result<Vec<Opportunity>> {
        let players = self.prices.players().await?;
        let mut opportunities = Vec::with_capacity(players.len());

        for player_id in players {
            if let Some(opportunity) = self.opportunity(player_id).await? {
                opportunities.push(opportunity);
            }
        }

        sort_opportunities(&mut opportunities);
        Ok(opportunities)
    }

    /// `Ok(None)` when the player has no prediction or lost its price series.
    async fn opportunity(&self, player_id: PlayerId) -> Result<Option<Opportunity>> {
        let prediction = match self.predictions.prediction(player_id).await? {
            Some(p) => p,
            None => {
                debug!(player_id = %player_id, "No prediction, skipping");
                return Ok(None);
            }
        };

        if let Err(e) = prediction
            .validate_price(player_id)
            .and_then(|_| prediction.validate_weights(player_id, self.weight_tolerance))
        {
            warn!(player_id = %player_id, error = %e, "Rejected predictor output");
            return Err(e);
        }

        let current_price = match self.prices.current_price(player_id).await {
            Ok(price) => price,
            Err(Error::UnknownPlayer { .. }) => {
                debug!(player_id = %player_id, "Price series vanished, skipping");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let potential_return_pct = match pct_change(current_price, prediction.predicted_price) {
            Some(pct) => pct,
            None => return Ok(None),
        };

        Ok(Some(Opportunity {
            player_id,
            current_price,
            predicted_price: prediction.predicted_price,
            potential_return_pct,
            feature_importance: prediction.feature_importance,
        }))
    }
}

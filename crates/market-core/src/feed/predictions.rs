//! Prediction feed backed by a fixed set of model outputs.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;

use super::PredictionFeed;
use crate::types::{PlayerId, Prediction};
use crate::Result;

/// Holds the latest published prediction per player.
#[derive(Debug, Default)]
pub struct StaticPredictionFeed {
    predictions: DashMap<PlayerId, Prediction>,
}

impl StaticPredictionFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the prediction for a player.
    pub fn publish(&self, player_id: PlayerId, prediction: Prediction) {
        self.predictions.insert(player_id, prediction);
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }
}

impl From<HashMap<PlayerId, Prediction>> for StaticPredictionFeed {
    fn from(map: HashMap<PlayerId, Prediction>) -> Self {
        Self {
            predictions: map.into_iter().collect(),
        }
    }
}

#[async_trait]
impl PredictionFeed for StaticPredictionFeed {
    async fn prediction(&self, player_id: PlayerId) -> Result<Option<Prediction>> {
        Ok(self.predictions.get(&player_id).map(|p| p.value().clone()))
    }
}

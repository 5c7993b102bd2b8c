//! Interfaces to the external price and prediction feeds.
//!
//! The core never ingests box scores or runs models itself; it reads their
//! outputs through these traits.

pub mod predictions;
pub mod price_book;

pub use predictions::StaticPredictionFeed;
pub use price_book::PriceBook;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::types::{PlayerId, PlayerPriceObservation, Prediction, PriceSeries};
use crate::Result;

/// Source of player price history.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Latest price of a player. Fails with `UnknownPlayer` when no series exists.
    async fn current_price(&self, player_id: PlayerId) -> Result<Decimal>;

    /// Consistent snapshot of a player's full series.
    async fn series(&self, player_id: PlayerId) -> Result<Arc<PriceSeries>>;

    /// The trailing `window` observations of a series, or all of them when `None`.
    async fn observations(
        &self,
        player_id: PlayerId,
        window: Option<usize>,
    ) -> Result<Vec<PlayerPriceObservation>> {
        let series = self.series(player_id).await?;
        Ok(match window {
            Some(n) => series.trailing(n).to_vec(),
            None => series.observations().to_vec(),
        })
    }

    /// Every player with at least one observation, ascending by id.
    async fn players(&self) -> Result<Vec<PlayerId>>;
}

/// Source of model predictions. Output is untrusted and validated by the caller.
#[async_trait]
pub trait PredictionFeed: Send + Sync {
    /// `Ok(None)` when the model has no prediction for this player.
    async fn prediction(&self, player_id: PlayerId) -> Result<Option<Prediction>>;
}

//! In-memory price feed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

use super::PriceFeed;
use crate::pricing::PriceModel;
use crate::types::{PlayerId, PlayerPriceObservation, PriceSeries, RawStats};
use crate::{Error, Result};

/// Append-only store of price series, one per player.
///
/// Series are held behind `Arc` and copied on write, so a reader always gets
/// a complete snapshot even while the same player is being appended to.
#[derive(Debug, Default)]
pub struct PriceBook {
    series: DashMap<PlayerId, Arc<PriceSeries>>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a book from observations in any order.
    pub fn from_observations(mut observations: Vec<PlayerPriceObservation>) -> Result<Self> {
        observations.sort_by(|a, b| {
            a.player_id
                .cmp(&b.player_id)
                .then_with(|| a.timestamp.cmp(&b.timestamp))
        });

        let book = Self::new();
        for observation in observations {
            book.record(observation)?;
        }
        Ok(book)
    }

    /// Append an observation to its player's series, creating the series on first use.
    pub fn record(&self, observation: PlayerPriceObservation) -> Result<()> {
        let player_id = observation.player_id;
        match self.series.entry(player_id) {
            Entry::Occupied(mut entry) => {
                Arc::make_mut(entry.get_mut()).push(observation)?;
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(PriceSeries::new(observation)?));
            }
        }
        debug!(player_id = %player_id, "Recorded price observation");
        Ok(())
    }

    /// Price a box score with `model` and record it.
    pub fn record_box_score(
        &self,
        player_id: PlayerId,
        timestamp: DateTime<Utc>,
        stats: RawStats,
        model: &PriceModel,
    ) -> Result<PlayerPriceObservation> {
        let observation = model.observe(player_id, timestamp, stats);
        self.record(observation.clone())?;
        Ok(observation)
    }

    pub fn snapshot(&self, player_id: PlayerId) -> Result<Arc<PriceSeries>> {
        self.series
            .get(&player_id)
            .map(|s| Arc::clone(s.value()))
            .ok_or(Error::UnknownPlayer { player_id })
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[async_trait]
impl PriceFeed for PriceBook {
    async fn current_price(&self, player_id: PlayerId) -> Result<Decimal> {
        self.series
            .get(&player_id)
            .map(|s| s.current_price())
            .ok_or(Error::UnknownPlayer { player_id })
    }

    async fn series(&self, player_id: PlayerId) -> Result<Arc<PriceSeries>> {
        self.snapshot(player_id)
    }

    async fn players(&self) -> Result<Vec<PlayerId>> {
        let mut ids: Vec<PlayerId> = self.series.iter().map(|e| *e.key()).collect();
        ids.sort();
        Ok(ids)
    }
}

//! Player price observations and the per-player price series.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Identifier of a player in the market universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PlayerId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Box-score line the price was derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStats {
    #[serde(rename = "PTS")]
    pub pts: f64,
    #[serde(rename = "REB")]
    pub reb: f64,
    #[serde(rename = "AST")]
    pub ast: f64,
    #[serde(rename = "STL")]
    pub stl: f64,
    #[serde(rename = "BLK")]
    pub blk: f64,
    #[serde(rename = "TOV")]
    pub tov: f64,
    #[serde(default)]
    pub performance_score: f64,
}

/// A single recorded price point. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPriceObservation {
    pub player_id: PlayerId,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    #[serde(default)]
    pub raw_stats: RawStats,
}

impl PlayerPriceObservation {
    pub fn new(player_id: PlayerId, timestamp: DateTime<Utc>, price: Decimal) -> Self {
        Self {
            player_id,
            timestamp,
            price,
            raw_stats: RawStats::default(),
        }
    }

    pub fn with_stats(mut self, raw_stats: RawStats) -> Self {
        self.raw_stats = raw_stats;
        self
    }

    /// Reject non-positive prices and stats that would poison downstream arithmetic.
    pub fn validate(&self) -> Result<()> {
        if self.price <= Decimal::ZERO {
            return Err(Error::InvalidPrice {
                player_id: self.player_id,
                price: self.price,
            });
        }
        let s = &self.raw_stats;
        let all_finite = [s.pts, s.reb, s.ast, s.stl, s.blk, s.tov, s.performance_score]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(Error::InvalidPrice {
                player_id: self.player_id,
                price: self.price,
            });
        }
        Ok(())
    }
}

/// Ordered price history for one player.
///
/// Timestamps are strictly increasing and the series is never empty, so the
/// last element is always the current price.
#[derive(Debug, Clone, Serialize)]
pub struct PriceSeries {
    player_id: PlayerId,
    observations: Vec<PlayerPriceObservation>,
}

impl PriceSeries {
    /// Start a series from its first observation.
    pub fn new(first: PlayerPriceObservation) -> Result<Self> {
        first.validate()?;
        Ok(Self {
            player_id: first.player_id,
            observations: vec![first],
        })
    }

    /// Build a series from observations that must already be in ascending order.
    pub fn from_observations(
        player_id: PlayerId,
        observations: Vec<PlayerPriceObservation>,
    ) -> Result<Self> {
        let mut iter = observations.into_iter();
        let first = iter.next().ok_or(Error::UnknownPlayer { player_id })?;
        if first.player_id != player_id {
            return Err(Error::UnknownPlayer { player_id });
        }
        let mut series = Self::new(first)?;
        for obs in iter {
            series.push(obs)?;
        }
        Ok(series)
    }

    /// Append an observation after the current last one.
    pub fn push(&mut self, observation: PlayerPriceObservation) -> Result<()> {
        if observation.player_id != self.player_id {
            return Err(Error::UnknownPlayer {
                player_id: observation.player_id,
            });
        }
        observation.validate()?;

        let last = self.current().timestamp;
        if observation.timestamp <= last {
            return Err(Error::NonMonotonicTimestamp {
                player_id: self.player_id,
                last,
                attempted: observation.timestamp,
            });
        }

        self.observations.push(observation);
        Ok(())
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// Latest observation.
    pub fn current(&self) -> &PlayerPriceObservation {
        // Non-empty by construction.
        &self.observations[self.observations.len() - 1]
    }

    pub fn current_price(&self) -> Decimal {
        self.current().price
    }

    pub fn observations(&self) -> &[PlayerPriceObservation] {
        &self.observations
    }

    /// The last `n` observations, or the whole series when it is shorter.
    pub fn trailing(&self, n: usize) -> &[PlayerPriceObservation] {
        let start = self.observations.len().saturating_sub(n);
        &self.observations[start..]
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

//! Trending and volatility rankings over the player universe.

use futures_util::future::join_all;
use market_core::feed::PriceFeed;
use market_core::numeric::{pct_change, to_f64};
use market_core::types::{MarketSnapshot, PriceSeries, TrendingEntry, VolatilityEntry};
use market_core::{Error, Result};
use statrs::statistics::Statistics;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Observations needed in the window to compute a percentage change.
pub const MIN_TRENDING_OBSERVATIONS: usize = 2;

/// Observations needed in the window for a volatility figure.
pub const MIN_VOLATILITY_OBSERVATIONS: usize = 3;

/// Most recent percentage move within the trailing `window` observations.
///
/// `None` when the window holds fewer than two observations.
pub fn trending_entry(series: &PriceSeries, window: usize) -> Option<TrendingEntry> {
    let slice = series.trailing(window);
    if slice.len() < MIN_TRENDING_OBSERVATIONS {
        return None;
    }

    let previous = slice[slice.len() - 2].price;
    let current = slice[slice.len() - 1].price;
    let pct = pct_change(previous, current)?;

    Some(TrendingEntry {
        player_id: series.player_id(),
        current_price: current,
        price_change: current - previous,
        pct_change: pct,
    })
}

/// Population standard deviation of consecutive percentage moves within the
/// trailing `window` observations.
///
/// Percentage moves keep the figure comparable between cheap and expensive
/// players. `None` below three observations.
pub fn volatility_entry(series: &PriceSeries, window: usize) -> Option<VolatilityEntry> {
    let slice = series.trailing(window);
    if slice.len() < MIN_VOLATILITY_OBSERVATIONS {
        return None;
    }

    let moves: Vec<f64> = slice
        .windows(2)
        .filter_map(|pair| pct_change(pair[0].price, pair[1].price))
        .map(to_f64)
        .collect();
    if moves.len() < MIN_VOLATILITY_OBSERVATIONS - 1 {
        return None;
    }

    let stddev = moves.iter().population_std_dev();
    if !stddev.is_finite() {
        return None;
    }

    Some(VolatilityEntry {
        player_id: series.player_id(),
        stddev_pct: stddev,
        samples: moves.len(),
    })
}

/// Descending by percentage change, ties by player id ascending.
pub fn sort_trending(entries: &mut [TrendingEntry]) {
    entries.sort_by(|a, b| {
        b.pct_change
            .cmp(&a.pct_change)
            .then_with(|| a.player_id.cmp(&b.player_id))
    });
}

/// Descending by deviation, ties by player id ascending.
pub fn sort_volatile(entries: &mut [VolatilityEntry]) {
    entries.sort_by(|a, b| {
        b.stddev_pct
            .partial_cmp(&a.stddev_pct)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.player_id.cmp(&b.player_id))
    });
}

fn check_window(window: usize, minimum: usize) -> Result<()> {
    if window < minimum {
        return Err(Error::InvalidWindow { window, minimum });
    }
    Ok(())
}

/// Ranks the player universe from price history.
pub struct MarketRanker {
    prices: Arc<dyn PriceFeed>,
}

impl MarketRanker {
    pub fn new(prices: Arc<dyn PriceFeed>) -> Self {
        Self { prices }
    }

    /// Players ordered by their latest percentage move, biggest gain first.
    pub async fn trending(&self, window: usize) -> Result<Vec<TrendingEntry>> {
        check_window(window, MIN_TRENDING_OBSERVATIONS)?;
        let universe = self.universe().await?;
        Ok(Self::rank_trending(&universe, window))
    }

    /// Players ordered by volatility of their percentage moves, most volatile first.
    pub async fn volatile(&self, window: usize) -> Result<Vec<VolatilityEntry>> {
        check_window(window, MIN_VOLATILITY_OBSERVATIONS)?;
        let universe = self.universe().await?;
        Ok(Self::rank_volatile(&universe, window))
    }

    /// Both rankings computed from the same set of series snapshots.
    pub async fn snapshot(
        &self,
        trending_window: usize,
        volatility_window: usize,
    ) -> Result<MarketSnapshot> {
        check_window(trending_window, MIN_TRENDING_OBSERVATIONS)?;
        check_window(volatility_window, MIN_VOLATILITY_OBSERVATIONS)?;
        let universe = self.universe().await?;
        Ok(MarketSnapshot {
            trending: Self::rank_trending(&universe, trending_window),
            volatile: Self::rank_volatile(&universe, volatility_window),
        })
    }

    fn rank_trending(universe: &[Arc<PriceSeries>], window: usize) -> Vec<TrendingEntry> {
        let mut entries: Vec<_> = universe
            .iter()
            .filter_map(|series| {
                let entry = trending_entry(series, window);
                if entry.is_none() {
                    debug!(
                        player_id = %series.player_id(),
                        len = series.len(),
                        "Not enough history for trending"
                    );
                }
                entry
            })
            .collect();
        sort_trending(&mut entries);
        entries
    }

    fn rank_volatile(universe: &[Arc<PriceSeries>], window: usize) -> Vec<VolatilityEntry> {
        let mut entries: Vec<_> = universe
            .iter()
            .filter_map(|series| {
                let entry = volatility_entry(series, window);
                if entry.is_none() {
                    debug!(
                        player_id = %series.player_id(),
                        len = series.len(),
                        "Not enough history for volatility"
                    );
                }
                entry
            })
            .collect();
        sort_volatile(&mut entries);
        entries
    }

    /// One snapshot per player. Players whose series disappears between
    /// listing and reading are skipped.
    async fn universe(&self) -> Result<Vec<Arc<PriceSeries>>> {
        let players = self.prices.players().await?;
        let results = join_all(players.iter().map(|id| self.prices.series(*id))).await;

        let mut universe = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(series) => universe.push(series),
                Err(Error::UnknownPlayer { player_id }) => {
                    debug!(player_id = %player_id, "Series vanished while ranking");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(universe)
    }
}

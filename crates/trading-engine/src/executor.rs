//! Trade execution at the live quoted price.

use market_core::feed::PriceFeed;
use market_core::types::{PlayerId, PositionKey, Trade, TradeSide};
use market_core::{Error, Result};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::ledger::{Ledger, LedgerUpdate};

/// Counters for executed and rejected trades.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExecutionMetrics {
    pub trades_executed: u64,
    pub trades_rejected: u64,
    pub total_volume: Decimal,
    pub total_realized_pnl: Decimal,
}

/// Executes buys and sells against the ledger at the current price.
///
/// There is no order book: every trade fills completely at the price read
/// while the position is locked, or fails without writing anything.
pub struct TradeExecutor {
    prices: Arc<dyn PriceFeed>,
    ledger: Arc<Ledger>,
    metrics: Mutex<ExecutionMetrics>,
}

impl TradeExecutor {
    pub fn new(prices: Arc<dyn PriceFeed>, ledger: Arc<Ledger>) -> Self {
        Self {
            prices,
            ledger,
            metrics: Mutex::new(ExecutionMetrics::default()),
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Execute a trade for `user_id` and return its record.
    pub async fn execute(
        &self,
        user_id: &str,
        player_id: PlayerId,
        side: TradeSide,
        shares: Decimal,
    ) -> Result<Trade> {
        self.execute_detailed(user_id, player_id, side, shares)
            .await
            .map(|update| update.trade)
    }

    /// Execute a trade and also return the position it left behind.
    pub async fn execute_detailed(
        &self,
        user_id: &str,
        player_id: PlayerId,
        side: TradeSide,
        shares: Decimal,
    ) -> Result<LedgerUpdate> {
        let result = self.try_execute(user_id, player_id, side, shares).await;
        self.record(&result);

        match &result {
            Ok(update) => info!(
                trade_id = %update.trade.id,
                user_id = %user_id,
                player_id = %player_id,
                side = %side,
                shares = %shares,
                price = %update.trade.executed_price,
                realized_pnl = ?update.trade.realized_pnl,
                "Trade executed"
            ),
            Err(e) => warn!(
                user_id = %user_id,
                player_id = %player_id,
                side = %side,
                shares = %shares,
                error = %e,
                "Trade rejected"
            ),
        }

        result
    }

    async fn try_execute(
        &self,
        user_id: &str,
        player_id: PlayerId,
        side: TradeSide,
        shares: Decimal,
    ) -> Result<LedgerUpdate> {
        // Unknown players are rejected before a position lock is created for them.
        self.prices.current_price(player_id).await?;

        let guard = self
            .ledger
            .lock_position(PositionKey::new(user_id, player_id))
            .await;

        // Price is read again under the position lock so it is the price at validation time.
        let price = self.prices.current_price(player_id).await?;

        if shares <= Decimal::ZERO {
            return Err(Error::InvalidQuantity { shares });
        }

        let trade = Trade::new(user_id, player_id, side, shares, price);
        self.ledger.apply_trade(&guard, trade).await
    }

    fn record(&self, result: &Result<LedgerUpdate>) {
        let mut metrics = self.metrics.lock().unwrap_or_else(|e| e.into_inner());
        match result {
            Ok(update) => {
                metrics.trades_executed += 1;
                if let Ok(notional) = update.trade.notional() {
                    metrics.total_volume = metrics.total_volume.saturating_add(notional);
                }
                if let Some(pnl) = update.trade.realized_pnl {
                    metrics.total_realized_pnl = metrics.total_realized_pnl.saturating_add(pnl);
                }
            }
            Err(_) => metrics.trades_rejected += 1,
        }
    }

    pub fn metrics(&self) -> ExecutionMetrics {
        self.metrics.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

//! Holding/position ledger with average-cost accounting.

use chrono::Utc;
use dashmap::DashMap;
use market_core::config::TradingConfig;
use market_core::types::{Holding, PlayerId, PositionKey, Trade, TradeSide};
use market_core::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::store::{AccountSnapshot, HoldingChange, LedgerCommit, LedgerStore, MemoryLedgerStore};

/// Result of applying one trade to a position.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionChange {
    pub change: HoldingChange,
    /// `shares * (price - average_buy_price)` for sells.
    pub realized_pnl: Option<Decimal>,
}

/// Apply a trade to the current state of its position.
///
/// Buys blend the new shares into the average cost. Sells leave the average
/// untouched, realize the gain against it, and close the position when no
/// shares remain.
pub fn apply_average_cost(current: Option<&Holding>, trade: &Trade) -> Result<PositionChange> {
    if trade.shares <= Decimal::ZERO {
        return Err(Error::InvalidQuantity {
            shares: trade.shares,
        });
    }

    match trade.side {
        TradeSide::Buy => {
            let holding = match current {
                Some(h) => {
                    let new_shares = h
                        .shares
                        .checked_add(trade.shares)
                        .ok_or(Error::Overflow {
                            operation: "position size",
                        })?;
                    let new_avg = h
                        .cost_basis()?
                        .checked_add(trade.notional()?)
                        .and_then(|total| total.checked_div(new_shares))
                        .ok_or(Error::Overflow {
                            operation: "average buy price",
                        })?;
                    Holding {
                        shares: new_shares,
                        average_buy_price: new_avg,
                        last_updated: Utc::now(),
                        ..h.clone()
                    }
                }
                None => Holding::new(
                    trade.user_id.clone(),
                    trade.player_id,
                    trade.shares,
                    trade.executed_price,
                ),
            };
            Ok(PositionChange {
                change: HoldingChange::Upsert(holding),
                realized_pnl: None,
            })
        }
        TradeSide::Sell => {
            let held = current.map(|h| h.shares).unwrap_or(Decimal::ZERO);
            let holding = match current {
                Some(h) if h.shares >= trade.shares => h,
                _ => {
                    return Err(Error::InsufficientShares {
                        requested: trade.shares,
                        held,
                    })
                }
            };

            let realized = trade
                .executed_price
                .checked_sub(holding.average_buy_price)
                .and_then(|gain| gain.checked_mul(trade.shares))
                .ok_or(Error::Overflow {
                    operation: "realized pnl",
                })?;
            let remaining = holding.shares - trade.shares;

            let change = if remaining.is_zero() {
                HoldingChange::Remove(holding.key())
            } else {
                HoldingChange::Upsert(Holding {
                    shares: remaining,
                    last_updated: Utc::now(),
                    ..holding.clone()
                })
            };

            Ok(PositionChange {
                change,
                realized_pnl: Some(realized),
            })
        }
    }
}

type PositionLocks = DashMap<PositionKey, Arc<Mutex<()>>>;

/// Exclusive access to one position for the duration of a trade.
///
/// Dropping the guard releases the lock and forgets the position's mutex
/// once nobody else is waiting on it.
pub struct PositionGuard {
    key: PositionKey,
    locks: Arc<PositionLocks>,
    lock: Option<OwnedMutexGuard<()>>,
}

impl PositionGuard {
    pub fn key(&self) -> &PositionKey {
        &self.key
    }
}

impl Drop for PositionGuard {
    fn drop(&mut self) {
        // The guard owns a handle to the mutex, so release it before counting.
        self.lock.take();
        self.locks.remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

/// A trade as recorded, with the position it left behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerUpdate {
    pub trade: Trade,
    /// `None` when the trade closed the position.
    pub holding: Option<Holding>,
}

/// Ledger of every user's holdings, cash, and trade history.
///
/// Holdings only change through [`Ledger::apply_trade`], which requires the
/// position's guard, so concurrent trades on one position are serialized.
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    /// Per-position locks. An entry lives while a trade holds or waits on it,
    /// so every waiter on a key contends on the same mutex.
    locks: Arc<PositionLocks>,
    enforce_cash: bool,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>, config: &TradingConfig) -> Self {
        Self {
            store,
            locks: Arc::new(DashMap::new()),
            enforce_cash: config.enforce_cash,
        }
    }

    /// Ledger over in-memory storage.
    pub fn in_memory(config: &TradingConfig) -> Self {
        Self::new(
            Arc::new(MemoryLedgerStore::new(config.starting_balance)),
            config,
        )
    }

    pub async fn get_holding(&self, user_id: &str, player_id: PlayerId) -> Result<Option<Holding>> {
        self.store
            .holding(&PositionKey::new(user_id, player_id))
            .await
    }

    /// All holdings of a user, ascending by player.
    pub async fn holdings(&self, user_id: &str) -> Result<Vec<Holding>> {
        let mut holdings = self.store.holdings(user_id).await?;
        holdings.sort_by_key(|h| h.player_id);
        Ok(holdings)
    }

    /// Holdings (ascending by player) and cash from one consistent read.
    pub async fn account(&self, user_id: &str) -> Result<AccountSnapshot> {
        let mut account = self.store.account(user_id).await?;
        account.holdings.sort_by_key(|h| h.player_id);
        Ok(account)
    }

    pub async fn trades(&self, user_id: &str) -> Result<Vec<Trade>> {
        self.store.trades(user_id).await
    }

    pub async fn cash_balance(&self, user_id: &str) -> Result<Decimal> {
        self.store.cash_balance(user_id).await
    }

    /// Wait for exclusive access to a position.
    pub(crate) async fn lock_position(&self, key: PositionKey) -> PositionGuard {
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        // The map's shard lock is released before awaiting the position lock.
        let guard = lock.lock_owned().await;
        PositionGuard {
            key,
            locks: self.locks.clone(),
            lock: Some(guard),
        }
    }

    /// Number of positions with a live lock entry.
    pub fn tracked_positions(&self) -> usize {
        self.locks.len()
    }

    /// Validate and record a trade against the position held by `guard`.
    ///
    /// Nothing is written unless every check passes.
    pub(crate) async fn apply_trade(
        &self,
        guard: &PositionGuard,
        mut trade: Trade,
    ) -> Result<LedgerUpdate> {
        let key = trade.key();
        if &key != guard.key() {
            return Err(Error::Store(format!(
                "trade on {} applied under the lock for {}",
                key,
                guard.key()
            )));
        }

        let current = self.store.holding(&key).await?;
        let PositionChange {
            change,
            realized_pnl,
        } = apply_average_cost(current.as_ref(), &trade)?;
        trade.realized_pnl = realized_pnl;

        let holding = change.holding().cloned();
        self.store
            .commit(LedgerCommit {
                change,
                cash_delta: trade.cash_delta()?,
                trade: trade.clone(),
                enforce_cash: self.enforce_cash,
            })
            .await?;

        match &holding {
            Some(h) => debug!(
                position = %key,
                shares = %h.shares,
                average_buy_price = %h.average_buy_price,
                "Position updated"
            ),
            None => info!(
                position = %key,
                realized_pnl = ?trade.realized_pnl,
                "Position closed"
            ),
        }

        Ok(LedgerUpdate { trade, holding })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(side: TradeSide, shares: i64, price: i64) -> Trade {
        Trade::new(
            "u1",
            PlayerId(1),
            side,
            Decimal::new(shares, 0),
            Decimal::new(price, 0),
        )
    }

    fn upserted(change: PositionChange) -> Holding {
        match change.change {
            HoldingChange::Upsert(h) => h,
            HoldingChange::Remove(key) => panic!("position {} unexpectedly closed", key),
        }
    }

    #[test]
    fn test_first_buy_sets_average() {
        let change = apply_average_cost(None, &trade(TradeSide::Buy, 10, 10)).unwrap();
        let h = upserted(change);
        assert_eq!(h.shares, Decimal::new(10, 0));
        assert_eq!(h.average_buy_price, Decimal::new(10, 0));
    }

    #[test]
    fn test_buy_blends_average_cost() {
        let first = upserted(apply_average_cost(None, &trade(TradeSide::Buy, 10, 10)).unwrap());
        let second =
            upserted(apply_average_cost(Some(&first), &trade(TradeSide::Buy, 5, 16)).unwrap());
        assert_eq!(second.shares, Decimal::new(15, 0));
        assert_eq!(second.average_buy_price, Decimal::new(12, 0));
    }

    #[test]
    fn test_sell_keeps_average_and_realizes_gain() {
        let h = Holding::new("u1", PlayerId(1), Decimal::new(15, 0), Decimal::new(12, 0));
        let change = apply_average_cost(Some(&h), &trade(TradeSide::Sell, 5, 20)).unwrap();
        assert_eq!(change.realized_pnl, Some(Decimal::new(40, 0)));
        let after = upserted(change);
        assert_eq!(after.shares, Decimal::new(10, 0));
        assert_eq!(after.average_buy_price, Decimal::new(12, 0));
    }

    #[test]
    fn test_sell_to_zero_removes_holding() {
        let h = Holding::new("u1", PlayerId(1), Decimal::new(5, 0), Decimal::new(12, 0));
        let change = apply_average_cost(Some(&h), &trade(TradeSide::Sell, 5, 9)).unwrap();
        assert_eq!(change.realized_pnl, Some(Decimal::new(-15, 0)));
        assert_eq!(change.change, HoldingChange::Remove(h.key()));
    }

    #[test]
    fn test_oversell_rejected() {
        let h = Holding::new("u1", PlayerId(1), Decimal::new(5, 0), Decimal::new(12, 0));
        let err = apply_average_cost(Some(&h), &trade(TradeSide::Sell, 6, 9)).unwrap_err();
        assert!(matches!(err, Error::InsufficientShares { .. }));

        let err = apply_average_cost(None, &trade(TradeSide::Sell, 1, 9)).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientShares { held, .. } if held == Decimal::ZERO
        ));
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        assert!(matches!(
            apply_average_cost(None, &trade(TradeSide::Buy, 0, 10)),
            Err(Error::InvalidQuantity { .. })
        ));
        assert!(matches!(
            apply_average_cost(None, &trade(TradeSide::Buy, -3, 10)),
            Err(Error::InvalidQuantity { .. })
        ));
    }

    #[test]
    fn test_average_is_order_independent() {
        let buys = [(4, 10), (6, 15), (10, 12)];
        let expected = Decimal::new(4 * 10 + 6 * 15 + 10 * 12, 0) / Decimal::new(20, 0);

        let run = |order: &[(i64, i64)]| {
            let mut holding: Option<Holding> = None;
            for (shares, price) in order {
                let change =
                    apply_average_cost(holding.as_ref(), &trade(TradeSide::Buy, *shares, *price))
                        .unwrap();
                holding = Some(upserted(change));
            }
            holding.unwrap()
        };

        let forward = run(&buys);
        let mut reversed = buys;
        reversed.reverse();
        let backward = run(&reversed);

        assert_eq!(forward.average_buy_price.round_dp(12), expected.round_dp(12));
        assert_eq!(backward.average_buy_price.round_dp(12), expected.round_dp(12));
        assert_eq!(forward.shares, backward.shares);
    }

    #[tokio::test]
    async fn test_apply_trade_requires_matching_guard() {
        let ledger = Ledger::in_memory(&TradingConfig::default());
        let guard = ledger.lock_position(PositionKey::new("u2", PlayerId(1))).await;
        let result = ledger.apply_trade(&guard, trade(TradeSide::Buy, 1, 10)).await;
        assert!(matches!(result, Err(Error::Store(_))));
        assert!(ledger.trades("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_sell_leaves_holding_unchanged() {
        let ledger = Ledger::in_memory(&TradingConfig::default());
        let key = PositionKey::new("u1", PlayerId(1));

        let guard = ledger.lock_position(key.clone()).await;
        ledger
            .apply_trade(&guard, trade(TradeSide::Buy, 5, 10))
            .await
            .unwrap();
        let before = ledger.get_holding("u1", PlayerId(1)).await.unwrap();

        let err = ledger
            .apply_trade(&guard, trade(TradeSide::Sell, 6, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientShares { .. }));
        assert_eq!(ledger.get_holding("u1", PlayerId(1)).await.unwrap(), before);
        assert_eq!(ledger.trades("u1").await.unwrap().len(), 1);
    }

    #[test]
    fn test_buy_overflow_is_an_error() {
        let h = Holding::new("u1", PlayerId(1), Decimal::MAX / Decimal::TWO, Decimal::ONE);
        let buy = Trade::new(
            "u1",
            PlayerId(1),
            TradeSide::Buy,
            Decimal::MAX / Decimal::TWO,
            Decimal::new(10, 0),
        );
        assert!(matches!(
            apply_average_cost(Some(&h), &buy),
            Err(Error::Overflow { .. })
        ));
    }

    #[tokio::test]
    async fn test_position_lock_released_and_forgotten() {
        let ledger = Ledger::in_memory(&TradingConfig::default());
        let key = PositionKey::new("u1", PlayerId(1));

        let guard = ledger.lock_position(key.clone()).await;
        assert_eq!(ledger.tracked_positions(), 1);
        drop(guard);
        assert_eq!(ledger.tracked_positions(), 0);

        // Relocking after eviction still works.
        let guard = ledger.lock_position(key).await;
        ledger
            .apply_trade(&guard, trade(TradeSide::Buy, 1, 10))
            .await
            .unwrap();
        drop(guard);
        assert_eq!(ledger.tracked_positions(), 0);
    }

    #[tokio::test]
    async fn test_waiter_keeps_position_lock_alive() {
        let ledger = Arc::new(Ledger::in_memory(&TradingConfig::default()));
        let key = PositionKey::new("u1", PlayerId(1));

        let first = ledger.lock_position(key.clone()).await;
        let waiter = {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                let _guard = ledger.lock_position(key).await;
                ledger.tracked_positions()
            })
        };

        // Let the waiter block on the held mutex.
        tokio::task::yield_now().await;
        drop(first);

        assert_eq!(waiter.await.unwrap(), 1);
        assert_eq!(ledger.tracked_positions(), 0);
    }
}

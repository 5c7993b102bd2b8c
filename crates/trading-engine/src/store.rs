//! Persistence for holdings, cash balances, and the trade log.

use async_trait::async_trait;
use dashmap::DashMap;
use market_core::types::{Holding, PositionKey, Trade};
use market_core::{Error, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Change to a single position produced by a trade.
#[derive(Debug, Clone, PartialEq)]
pub enum HoldingChange {
    /// Create or replace the holding.
    Upsert(Holding),
    /// The position was sold down to zero shares.
    Remove(PositionKey),
}

impl HoldingChange {
    pub fn key(&self) -> PositionKey {
        match self {
            HoldingChange::Upsert(holding) => holding.key(),
            HoldingChange::Remove(key) => key.clone(),
        }
    }

    pub fn holding(&self) -> Option<&Holding> {
        match self {
            HoldingChange::Upsert(holding) => Some(holding),
            HoldingChange::Remove(_) => None,
        }
    }
}

/// Everything one executed trade writes.
#[derive(Debug, Clone)]
pub struct LedgerCommit {
    pub change: HoldingChange,
    pub trade: Trade,
    /// Signed cash movement for the trading user.
    pub cash_delta: Decimal,
    /// Refuse to take the balance below zero.
    pub enforce_cash: bool,
}

/// A user's holdings and cash read together.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    /// In no particular order.
    pub holdings: Vec<Holding>,
    pub cash_balance: Decimal,
}

/// Storage backend for the ledger.
///
/// Callers serialize writes per position; `commit` must apply all of its
/// parts or none of them.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn holding(&self, key: &PositionKey) -> Result<Option<Holding>>;

    /// All holdings of a user, in no particular order.
    async fn holdings(&self, user_id: &str) -> Result<Vec<Holding>>;

    /// The user's trades in execution order.
    async fn trades(&self, user_id: &str) -> Result<Vec<Trade>>;

    async fn cash_balance(&self, user_id: &str) -> Result<Decimal>;

    async fn commit(&self, commit: LedgerCommit) -> Result<()>;

    /// Holdings and cash of a user as of a single point between commits.
    async fn account(&self, user_id: &str) -> Result<AccountSnapshot>;
}

/// In-memory ledger storage.
pub struct MemoryLedgerStore {
    holdings: DashMap<PositionKey, Holding>,
    cash: DashMap<String, Decimal>,
    trades: Arc<RwLock<Vec<Trade>>>,
    starting_balance: Decimal,
}

impl MemoryLedgerStore {
    pub fn new(starting_balance: Decimal) -> Self {
        Self {
            holdings: DashMap::new(),
            cash: DashMap::new(),
            trades: Arc::new(RwLock::new(Vec::new())),
            starting_balance,
        }
    }

    /// Number of trades across all users.
    pub async fn trade_count(&self) -> usize {
        self.trades.read().await.len()
    }
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new(Decimal::new(10_000, 0))
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn holding(&self, key: &PositionKey) -> Result<Option<Holding>> {
        Ok(self.holdings.get(key).map(|h| h.value().clone()))
    }

    async fn holdings(&self, user_id: &str) -> Result<Vec<Holding>> {
        Ok(self
            .holdings
            .iter()
            .filter(|e| e.key().user_id == user_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn trades(&self, user_id: &str) -> Result<Vec<Trade>> {
        let trades = self.trades.read().await;
        Ok(trades
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn cash_balance(&self, user_id: &str) -> Result<Decimal> {
        Ok(self
            .cash
            .get(user_id)
            .map(|b| *b.value())
            .unwrap_or(self.starting_balance))
    }

    async fn commit(&self, commit: LedgerCommit) -> Result<()> {
        let LedgerCommit {
            change,
            trade,
            cash_delta,
            enforce_cash,
        } = commit;

        if change.key() != trade.key() {
            return Err(Error::Store(format!(
                "holding change for {} does not match trade on {}",
                change.key(),
                trade.key()
            )));
        }

        // Held for the whole commit so account snapshots never see half of it.
        let mut log = self.trades.write().await;

        // The cash check is the only step that can fail, so it goes first and
        // is decided under the account's entry lock.
        {
            let mut balance = self
                .cash
                .entry(trade.user_id.clone())
                .or_insert(self.starting_balance);
            let updated = balance
                .checked_add(cash_delta)
                .ok_or(Error::Overflow {
                    operation: "cash balance",
                })?;
            if enforce_cash && updated < Decimal::ZERO {
                return Err(Error::InsufficientFunds {
                    required: -cash_delta,
                    available: *balance,
                });
            }
            *balance = updated;
        }

        match change {
            HoldingChange::Upsert(holding) => {
                self.holdings.insert(holding.key(), holding);
            }
            HoldingChange::Remove(key) => {
                self.holdings.remove(&key);
            }
        }

        log.push(trade);
        Ok(())
    }

    async fn account(&self, user_id: &str) -> Result<AccountSnapshot> {
        let _log = self.trades.read().await;
        Ok(AccountSnapshot {
            holdings: self.holdings(user_id).await?,
            cash_balance: self.cash_balance(user_id).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::types::{PlayerId, TradeSide};

    fn buy(user: &str, shares: i64, price: i64) -> Trade {
        Trade::new(
            user,
            PlayerId(1),
            TradeSide::Buy,
            Decimal::new(shares, 0),
            Decimal::new(price, 0),
        )
    }

    #[tokio::test]
    async fn test_new_account_has_starting_balance() {
        let store = MemoryLedgerStore::new(Decimal::new(500, 0));
        assert_eq!(store.cash_balance("u1").await.unwrap(), Decimal::new(500, 0));
    }

    #[tokio::test]
    async fn test_commit_writes_all_parts() {
        let store = MemoryLedgerStore::new(Decimal::new(500, 0));
        let trade = buy("u1", 10, 10);
        let holding = Holding::new("u1", PlayerId(1), Decimal::new(10, 0), Decimal::new(10, 0));

        store
            .commit(LedgerCommit {
                change: HoldingChange::Upsert(holding.clone()),
                cash_delta: trade.cash_delta().unwrap(),
                trade,
                enforce_cash: true,
            })
            .await
            .unwrap();

        assert_eq!(store.holding(&holding.key()).await.unwrap(), Some(holding));
        assert_eq!(store.cash_balance("u1").await.unwrap(), Decimal::new(400, 0));
        assert_eq!(store.trades("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_account_reads_holdings_with_cash() {
        let store = MemoryLedgerStore::new(Decimal::new(500, 0));
        let trade = buy("u1", 10, 10);
        let holding = Holding::new("u1", PlayerId(1), Decimal::new(10, 0), Decimal::new(10, 0));
        store
            .commit(LedgerCommit {
                change: HoldingChange::Upsert(holding.clone()),
                cash_delta: trade.cash_delta().unwrap(),
                trade,
                enforce_cash: true,
            })
            .await
            .unwrap();

        let account = store.account("u1").await.unwrap();
        assert_eq!(account.holdings, vec![holding]);
        assert_eq!(account.cash_balance, Decimal::new(400, 0));

        let empty = store.account("u2").await.unwrap();
        assert!(empty.holdings.is_empty());
        assert_eq!(empty.cash_balance, Decimal::new(500, 0));
    }

    #[tokio::test]
    async fn test_insufficient_funds_writes_nothing() {
        let store = MemoryLedgerStore::new(Decimal::new(50, 0));
        let trade = buy("u1", 10, 10);
        let holding = Holding::new("u1", PlayerId(1), Decimal::new(10, 0), Decimal::new(10, 0));

        let err = store
            .commit(LedgerCommit {
                change: HoldingChange::Upsert(holding.clone()),
                cash_delta: trade.cash_delta().unwrap(),
                trade,
                enforce_cash: true,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert_eq!(store.holding(&holding.key()).await.unwrap(), None);
        assert_eq!(store.cash_balance("u1").await.unwrap(), Decimal::new(50, 0));
        assert_eq!(store.trade_count().await, 0);
    }

    #[tokio::test]
    async fn test_mismatched_commit_rejected() {
        let store = MemoryLedgerStore::default();
        let trade = buy("u1", 1, 10);
        let holding = Holding::new("u2", PlayerId(1), Decimal::ONE, Decimal::new(10, 0));

        let result = store
            .commit(LedgerCommit {
                change: HoldingChange::Upsert(holding),
                cash_delta: trade.cash_delta().unwrap(),
                trade,
                enforce_cash: false,
            })
            .await;
        assert!(matches!(result, Err(Error::Store(_))));
        assert_eq!(store.trade_count().await, 0);
    }
}

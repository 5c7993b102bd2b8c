//! Position state held by the ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::PlayerId;
use crate::{Error, Result};

/// Key of a single position: one per (user, player) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionKey {
    pub user_id: String,
    pub player_id: PlayerId,
}

impl PositionKey {
    pub fn new(user_id: impl Into<String>, player_id: PlayerId) -> Self {
        Self {
            user_id: user_id.into(),
            player_id,
        }
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.player_id)
    }
}

/// Shares a user holds in one player, carried at average cost.
///
/// A holding only exists while `shares > 0`; the ledger deletes it when a
/// sale brings it to zero, so `average_buy_price` is always meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub user_id: String,
    pub player_id: PlayerId,
    pub shares: Decimal,
    pub average_buy_price: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl Holding {
    pub fn new(
        user_id: impl Into<String>,
        player_id: PlayerId,
        shares: Decimal,
        average_buy_price: Decimal,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            player_id,
            shares,
            average_buy_price,
            last_updated: Utc::now(),
        }
    }

    pub fn key(&self) -> PositionKey {
        PositionKey::new(self.user_id.clone(), self.player_id)
    }

    /// Total amount paid for the shares still held.
    pub fn cost_basis(&self) -> Result<Decimal> {
        self.shares
            .checked_mul(self.average_buy_price)
            .ok_or(Error::Overflow {
                operation: "cost basis",
            })
    }

    pub fn market_value(&self, price: Decimal) -> Result<Decimal> {
        self.shares.checked_mul(price).ok_or(Error::Overflow {
            operation: "market value",
        })
    }
}

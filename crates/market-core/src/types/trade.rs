//! Trade records appended by trade execution.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{PlayerId, PositionKey};
use crate::{Error, Result};

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for TradeSide {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(TradeSide::Buy),
            "SELL" => Ok(TradeSide::Sell),
            other => Err(format!("Trade side must be BUY or SELL, got '{}'", other)),
        }
    }
}

/// Immutable audit record of an executed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub user_id: String,
    pub player_id: PlayerId,
    #[serde(rename = "type")]
    pub side: TradeSide,
    pub shares: Decimal,
    pub executed_price: Decimal,
    pub timestamp: DateTime<Utc>,
    /// Gain locked in against the average cost. Present on sells only.
    pub realized_pnl: Option<Decimal>,
}

impl Trade {
    pub fn new(
        user_id: impl Into<String>,
        player_id: PlayerId,
        side: TradeSide,
        shares: Decimal,
        executed_price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            player_id,
            side,
            shares,
            executed_price,
            timestamp: Utc::now(),
            realized_pnl: None,
        }
    }

    pub fn key(&self) -> PositionKey {
        PositionKey::new(self.user_id.clone(), self.player_id)
    }

    /// Cash value of the trade.
    pub fn notional(&self) -> Result<Decimal> {
        self.shares
            .checked_mul(self.executed_price)
            .ok_or(Error::Overflow {
                operation: "trade notional",
            })
    }

    /// Share change applied to the position: positive for buys, negative for sells.
    pub fn signed_shares(&self) -> Decimal {
        match self.side {
            TradeSide::Buy => self.shares,
            TradeSide::Sell => -self.shares,
        }
    }

    /// Cash change for the account: negative for buys, positive for sells.
    pub fn cash_delta(&self) -> Result<Decimal> {
        let notional = self.notional()?;
        Ok(match self.side {
            TradeSide::Buy => -notional,
            TradeSide::Sell => notional,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_parsing() {
        assert_eq!("buy".parse::<TradeSide>().unwrap(), TradeSide::Buy);
        assert_eq!("SELL".parse::<TradeSide>().unwrap(), TradeSide::Sell);
        assert!("HOLD".parse::<TradeSide>().is_err());
    }

    #[test]
    fn test_signed_shares_and_cash() {
        let buy = Trade::new(
            "u1",
            PlayerId(1),
            TradeSide::Buy,
            Decimal::new(3, 0),
            Decimal::new(10, 0),
        );
        assert_eq!(buy.signed_shares(), Decimal::new(3, 0));
        assert_eq!(buy.cash_delta().unwrap(), Decimal::new(-30, 0));

        let sell = Trade::new(
            "u1",
            PlayerId(1),
            TradeSide::Sell,
            Decimal::new(2, 0),
            Decimal::new(12, 0),
        );
        assert_eq!(sell.signed_shares(), Decimal::new(-2, 0));
        assert_eq!(sell.cash_delta().unwrap(), Decimal::new(24, 0));
    }

    #[test]
    fn test_side_serializes_uppercase() {
        let json = serde_json::to_string(&TradeSide::Sell).unwrap();
        assert_eq!(json, "\"SELL\"");
    }

    #[test]
    fn test_notional_overflow_is_an_error() {
        let buy = Trade::new(
            "u1",
            PlayerId(1),
            TradeSide::Buy,
            Decimal::MAX / Decimal::TWO,
            Decimal::new(10, 0),
        );
        assert!(matches!(buy.notional(), Err(Error::Overflow { .. })));
        assert!(matches!(buy.cash_delta(), Err(Error::Overflow { .. })));
    }
}

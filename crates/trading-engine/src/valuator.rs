//! Portfolio valuation against live prices.

use chrono::{DateTime, Utc};
use market_core::feed::PriceFeed;
use market_core::numeric::{percent_of, round_display};
use market_core::types::PlayerId;
use market_core::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::ledger::Ledger;
use crate::store::AccountSnapshot;

fn checked_sub(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_sub(b).ok_or(Error::Overflow {
        operation: "unrealized pnl",
    })
}

fn checked_sum(mut values: impl Iterator<Item = Decimal>) -> Result<Decimal> {
    values.try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(v).ok_or(Error::Overflow {
            operation: "portfolio total",
        })
    })
}

/// One holding marked to market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingValuation {
    pub player_id: PlayerId,
    pub shares: Decimal,
    pub average_buy_price: Decimal,
    pub current_price: Decimal,
    pub market_value: Decimal,
    pub cost_basis: Decimal,
    pub unrealized_pnl: Decimal,
    pub unrealized_pnl_pct: Option<Decimal>,
}

/// Aggregate value of a user's holdings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioValuation {
    pub user_id: String,
    pub holdings: Vec<HoldingValuation>,
    /// Holdings left out of the totals because their player has no price.
    pub unpriced: Vec<PlayerId>,
    pub total_value: Decimal,
    pub total_cost_basis: Decimal,
    pub unrealized_pnl: Decimal,
    /// `None` when the cost basis is zero: the percentage is undefined, not zero.
    pub unrealized_pnl_pct: Option<Decimal>,
    pub cash_balance: Decimal,
    pub net_worth: Decimal,
    pub valued_at: DateTime<Utc>,
}

impl PortfolioValuation {
    /// Copy with every money and percentage field rounded for display.
    pub fn rounded(&self) -> Self {
        Self {
            holdings: self
                .holdings
                .iter()
                .map(|h| HoldingValuation {
                    average_buy_price: round_display(h.average_buy_price),
                    current_price: round_display(h.current_price),
                    market_value: round_display(h.market_value),
                    cost_basis: round_display(h.cost_basis),
                    unrealized_pnl: round_display(h.unrealized_pnl),
                    unrealized_pnl_pct: h.unrealized_pnl_pct.map(round_display),
                    ..h.clone()
                })
                .collect(),
            total_value: round_display(self.total_value),
            total_cost_basis: round_display(self.total_cost_basis),
            unrealized_pnl: round_display(self.unrealized_pnl),
            unrealized_pnl_pct: self.unrealized_pnl_pct.map(round_display),
            cash_balance: round_display(self.cash_balance),
            net_worth: round_display(self.net_worth),
            ..self.clone()
        }
    }
}

/// Marks a user's holdings to the current price.
pub struct PortfolioValuator {
    prices: Arc<dyn PriceFeed>,
    ledger: Arc<Ledger>,
}

impl PortfolioValuator {
    pub fn new(prices: Arc<dyn PriceFeed>, ledger: Arc<Ledger>) -> Self {
        Self { prices, ledger }
    }

    pub async fn value_portfolio(&self, user_id: &str) -> Result<PortfolioValuation> {
        let AccountSnapshot {
            holdings,
            cash_balance,
        } = self.ledger.account(user_id).await?;

        let mut valued = Vec::with_capacity(holdings.len());
        let mut unpriced = Vec::new();

        for holding in holdings {
            let current_price = match self.prices.current_price(holding.player_id).await {
                Ok(price) => price,
                Err(Error::UnknownPlayer { player_id }) => {
                    debug!(
                        user_id = %user_id,
                        player_id = %player_id,
                        "No price for holding, excluded from totals"
                    );
                    unpriced.push(player_id);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let market_value = holding.market_value(current_price)?;
            let cost_basis = holding.cost_basis()?;
            let unrealized_pnl = checked_sub(market_value, cost_basis)?;

            valued.push(HoldingValuation {
                player_id: holding.player_id,
                shares: holding.shares,
                average_buy_price: holding.average_buy_price,
                current_price,
                market_value,
                cost_basis,
                unrealized_pnl,
                unrealized_pnl_pct: percent_of(unrealized_pnl, cost_basis),
            });
        }

        let total_value = checked_sum(valued.iter().map(|h| h.market_value))?;
        let total_cost_basis = checked_sum(valued.iter().map(|h| h.cost_basis))?;
        let unrealized_pnl = checked_sub(total_value, total_cost_basis)?;
        let net_worth = cash_balance
            .checked_add(total_value)
            .ok_or(Error::Overflow {
                operation: "net worth",
            })?;

        Ok(PortfolioValuation {
            user_id: user_id.to_string(),
            holdings: valued,
            unpriced,
            total_value,
            total_cost_basis,
            unrealized_pnl,
            unrealized_pnl_pct: percent_of(unrealized_pnl, total_cost_basis),
            cash_balance,
            net_worth,
            valued_at: Utc::now(),
        })
    }
}

//! Trading Engine
//!
//! Position ledger, trade execution, and portfolio valuation for the
//! BallStreet player market.

pub mod executor;
pub mod ledger;
pub mod store;
pub mod valuator;

pub use executor::{ExecutionMetrics, TradeExecutor};
pub use ledger::{apply_average_cost, Ledger, LedgerUpdate, PositionChange};
pub use store::{AccountSnapshot, HoldingChange, LedgerCommit, LedgerStore, MemoryLedgerStore};
pub use valuator::{HoldingValuation, PortfolioValuation, PortfolioValuator};

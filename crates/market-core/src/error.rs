//! Error types for the BallStreet market core.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::PlayerId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown player: {player_id}")]
    UnknownPlayer { player_id: PlayerId },

    #[error("Invalid quantity: {shares} (must be greater than 0)")]
    InvalidQuantity { shares: Decimal },

    #[error("Insufficient shares: requested {requested}, held {held}")]
    InsufficientShares { requested: Decimal, held: Decimal },

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("Invalid feature weights for player {player_id}: {reason}")]
    InvalidFeatureWeights { player_id: PlayerId, reason: String },

    #[error("Invalid prediction for player {player_id}: {reason}")]
    InvalidPrediction { player_id: PlayerId, reason: String },

    #[error("Invalid price for player {player_id}: {price}")]
    InvalidPrice { player_id: PlayerId, price: Decimal },

    #[error("Observation for player {player_id} at {attempted} is not after the latest one at {last}")]
    NonMonotonicTimestamp {
        player_id: PlayerId,
        last: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },

    #[error("Arithmetic overflow computing {operation}")]
    Overflow { operation: &'static str },

    #[error("Invalid window: {window} (minimum {minimum})")]
    InvalidWindow { window: usize, minimum: usize },

    #[error("Storage error: {0}")]
    Store(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl Error {
    /// Whether this error is a caller-side validation failure (bad input or a
    /// domain rule) as opposed to an infrastructure failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::UnknownPlayer { .. }
                | Error::InvalidQuantity { .. }
                | Error::InsufficientShares { .. }
                | Error::InsufficientFunds { .. }
                | Error::InvalidFeatureWeights { .. }
                | Error::InvalidPrediction { .. }
                | Error::InvalidPrice { .. }
                | Error::NonMonotonicTimestamp { .. }
                | Error::InvalidWindow { .. }
                | Error::Overflow { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

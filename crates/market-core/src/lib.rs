//! BallStreet Market Core
//!
//! Shared types, feed interfaces, configuration, and numeric helpers for the
//! player stock market.

pub mod config;
pub mod error;
pub mod feed;
pub mod numeric;
pub mod pricing;
pub mod types;

pub use error::{Error, Result};

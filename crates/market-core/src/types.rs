//! Core domain types for the BallStreet market.

pub mod holding;
pub mod insight;
pub mod market;
pub mod player;
pub mod trade;

pub use holding::*;
pub use insight::*;
pub use market::*;
pub use player::*;
pub use trade::*;

//! Decimal helpers shared by valuation and ranking.
//!
//! Internal arithmetic stays in `Decimal` at full precision. Only values
//! leaving the core for display are rounded, half-to-even at 2 places.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places used for display values.
pub const DISPLAY_DP: u32 = 2;

/// Round half-to-even to 2 decimal places.
pub fn round_display(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DISPLAY_DP, RoundingStrategy::MidpointNearestEven)
}

/// `numerator / denominator * 100`, or `None` when the denominator is zero.
pub fn percent_of(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    numerator
        .checked_div(denominator)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
}

/// Percentage change from `from` to `to`; `None` when `from` is zero or the
/// difference is out of range.
pub fn pct_change(from: Decimal, to: Decimal) -> Option<Decimal> {
    percent_of(to.checked_sub(from)?, from)
}

/// Lossy conversion for statistics that run in floating point.
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

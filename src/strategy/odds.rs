//! American / decimal odds conversion.
//!
//! Parlay pricing works in decimal odds (multiplicative across legs);
//! everything user-facing is signed American odds.

/// Whether an American price is representable. Prices strictly between
/// -100 and +100 (including 0) are not.
pub fn is_valid_american(odds: i32) -> bool {
    odds <= -100 || odds >= 100
}

/// Convert American odds to decimal odds.
///
/// `-110` → `1 + 100/110`, `+105` → `1 + 105/100`.
/// Callers are expected to have checked [`is_valid_american`].
pub fn american_to_decimal(odds: i32) -> f64 {
    let odds = odds as f64;
    if odds < 0.0 {
        1.0 + 100.0 / odds.abs()
    } else {
        1.0 + odds / 100.0
    }
}

/// Convert decimal odds back to signed American odds, rounded to the
/// nearest integer. Even money (2.0) renders as `+100`.
///
/// Returns `None` for decimal odds at or below 1.0, which have no
/// American representation, and for prices too long to fit an `i64`.
pub fn decimal_to_american(decimal: f64) -> Option<i64> {
    if !decimal.is_finite() || decimal <= 1.0 {
        return None;
    }
    let american = if decimal >= 2.0 {
        (decimal - 1.0) * 100.0
    } else {
        -100.0 / (decimal - 1.0)
    }
    .round();
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
    if !american.is_finite() || american.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(american as i64)
}

/// Break-even probability implied by an American price (vig included).
pub fn implied_probability(odds: i32) -> f64 {
    1.0 / american_to_decimal(odds)
}

/// How far a price sits from even money, as a 0–1 distance on implied
/// probability. -110 is close to 0; -400 or +400 is far.
pub fn distance_from_even(odds: i32) -> f64 {
    ((implied_probability(odds) - 0.5).abs() * 2.0).clamp(0.0, 1.0)
}

/// Combined decimal odds of independent legs (product of leg prices).
pub fn combine_decimal(legs: impl IntoIterator<Item = i32>) -> f64 {
    legs.into_iter().map(american_to_decimal).product()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

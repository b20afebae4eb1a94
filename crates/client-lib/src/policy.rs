// ============================
// gameofthree-client/src/policy.rs
// ============================
//! Arithmetic of a move.

/// Every move must leave the shared value divisible by this
pub const DIVISOR: i64 = 3;

/// Adjustment in `{-1, 0, 1}` that makes `value` divisible by [`DIVISOR`].
///
/// Uses the mathematical remainder, so negative values are handled the same
/// way as positive ones.
pub fn adjustment_for(value: i64) -> i64 {
    match value.rem_euclid(DIVISOR) {
        0 => 0,
        1 => -1,
        _ => 1,
    }
}

/// Whether `value + adjustment` is divisible by [`DIVISOR`]
pub fn is_valid_move(value: i64, adjustment: i64) -> bool {
    value
        .checked_add(adjustment)
        .is_some_and(|sum| sum.rem_euclid(DIVISOR) == 0)
}

//! # Bin Price Math
//!
//! The Q64.64 exponentiation engine and the bin-id to price mapping. The
//! price of a bin is `(1 + bin_step / 10_000)^bin_id`, computed by binary
//! exponentiation over the low bits of the exponent so the result matches
//! the on-chain program bit for bit. No transcendental functions touch the
//! integer path; the float helpers at the bottom exist for display only.

use crate::constants::{BASIS_POINT_MAX, MAX_POW_EXPONENT, ONE_Q64};
use crate::math::big_int::mul_shift_right_64;

/// `base^exp` in Q64.64, by iterated squaring over the 20 low bits of
/// `|exp|`.
///
/// Exponent magnitudes of 2^20 or more return 0: liquidity that far from
/// the active price is defined as zero by the program, so this function
/// saturates instead of erroring. A base at or above 1.0 is first inverted
/// through `u128::MAX / base` (flipping the final inversion decision),
/// which keeps every intermediate product below 1.0 and inside the
/// 128-bit domain after the shift-right-64 renormalization.
pub fn pow(base: u128, exp: i32) -> u128 {
    let mut invert = exp.is_negative();

    if exp == 0 {
        return ONE_Q64;
    }

    let magnitude = exp.unsigned_abs();
    if magnitude >= MAX_POW_EXPONENT {
        return 0;
    }

    let mut squared = base;
    let mut result = ONE_Q64;

    if squared >= ONE_Q64 {
        squared = u128::MAX / squared;
        invert = !invert;
    }

    let mut remaining = magnitude;
    while remaining > 0 {
        if remaining & 1 != 0 {
            result = mul_shift_right_64(result, squared);
        }
        squared = mul_shift_right_64(squared, squared);
        remaining >>= 1;
    }

    if result == 0 {
        return 0;
    }

    if invert {
        u128::MAX / result
    } else {
        result
    }
}

/// Q64.64 price of token X in token Y at `bin_id`
///
/// Monotonic non-decreasing in `bin_id` for a fixed `bin_step`, and exactly
/// 1.0 at bin 0.
pub fn price_at_bin(bin_id: i32, bin_step: u16) -> u128 {
    let bps = ((bin_step as u128) << 64) / BASIS_POINT_MAX as u128;
    pow(ONE_Q64 + bps, bin_id)
}

/// Q64.64 value of `1 / (1 + bin_step / 10_000)`, the per-bin step of an
/// inverse-price series
pub fn inverse_price_base(bin_step: u16) -> u128 {
    let bps = ((bin_step as u128) << 64) / BASIS_POINT_MAX as u128;
    pow(ONE_Q64 + bps, -1)
}

/// Inverse prices for a contiguous ascending run of bins, advanced by one
/// multiply per bin instead of a `pow` call per bin
pub(crate) struct InversePrices {
    next: u128,
    step: u128,
}

impl InversePrices {
    /// Series positioned at `bin_id`, yielding `price(-bin_id)` first
    pub(crate) fn starting_at(bin_id: i32, bin_step: u16) -> Self {
        Self {
            next: pow_negated(bin_id, bin_step),
            step: inverse_price_base(bin_step),
        }
    }

    /// Current inverse price, stepping the series to the next higher bin
    pub(crate) fn advance(&mut self) -> u128 {
        let current = self.next;
        self.next = mul_shift_right_64(current, self.step);
        current
    }
}

fn pow_negated(bin_id: i32, bin_step: u16) -> u128 {
    let bps = ((bin_step as u128) << 64) / BASIS_POINT_MAX as u128;
    // bin_id == i32::MIN has no negation; the magnitude is far beyond the
    // exponent cap either way
    if bin_id == i32::MIN {
        return 0;
    }
    pow(ONE_Q64 + bps, -bin_id)
}

// ============================================================================
// Presentation Helpers
// ============================================================================

/// Convert a Q64.64 price to f64 for display
pub fn price_q64_to_f64(price: u128) -> f64 {
    price as f64 / ONE_Q64 as f64
}

/// Nearest bin id for a display price. Float math; never feed the result
/// back into settlement arithmetic without re-deriving the exact price.
pub fn bin_id_from_price_f64(price: f64, bin_step: u16) -> Option<i32> {
    if price <= 0.0 || bin_step == 0 {
        return None;
    }
    let step_ratio = 1.0 + bin_step as f64 / BASIS_POINT_MAX as f64;
    Some((price.ln() / step_ratio.ln()).round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pow_zero_exponent_is_one() {
        let bps = (100u128 << 64) / 10_000;
        assert_eq!(pow(ONE_Q64 + bps, 0), ONE_Q64);
        assert_eq!(pow(ONE_Q64 / 3, 0), ONE_Q64);
    }

    #[test]
    fn test_pow_exponent_overflow_returns_zero() {
        let base = ONE_Q64 + (1u128 << 50);
        assert_eq!(pow(base, 1 << 20), 0);
        assert_eq!(pow(base, -(1 << 20)), 0);
        assert_eq!(pow(base, i32::MAX), 0);
    }

    #[test]
    fn test_price_at_bin_zero_is_one() {
        for bin_step in [1u16, 10, 100, 250] {
            assert_eq!(price_at_bin(0, bin_step), ONE_Q64);
        }
    }

    #[test]
    fn test_price_monotonic_over_small_range() {
        let bin_step = 100;
        let mut previous = price_at_bin(-300, bin_step);
        for bin_id in -299..=300 {
            let price = price_at_bin(bin_id, bin_step);
            assert!(
                price > previous,
                "price not increasing at bin {}",
                bin_id
            );
            previous = price;
        }
    }

    #[test]
    fn test_pow_inversion_identity() {
        // pow(base, n) * pow(base, -n) stays within one part in 2^40 of 1.0
        let bin_step = 25;
        let bps = ((bin_step as u128) << 64) / 10_000;
        let base = ONE_Q64 + bps;
        for exp in [1, 7, 64, 1000, 20_000] {
            let up = pow(base, exp);
            let down = pow(base, -exp);
            let product = mul_shift_right_64(up, down);
            let drift = product.abs_diff(ONE_Q64);
            assert!(drift < ONE_Q64 >> 40, "drift {} at exp {}", drift, exp);
        }
    }

    #[test]
    fn test_price_approximates_ratio() {
        // bin_step 100 is 1% per bin
        let price = price_at_bin(1, 100);
        let expected = ONE_Q64 + ONE_Q64 / 100;
        assert!(price.abs_diff(expected) < ONE_Q64 >> 40);
    }

    #[test]
    fn test_inverse_price_series_tracks_pow() {
        let bin_step = 80;
        let mut series = InversePrices::starting_at(-5, bin_step);
        for bin_id in -5..=5 {
            let expected = pow_negated(bin_id, bin_step);
            let got = series.advance();
            assert!(
                got.abs_diff(expected) <= (expected >> 50) + 2,
                "series diverged at bin {}",
                bin_id
            );
        }
    }

    #[test]
    fn test_display_round_trip() {
        let price = price_at_bin(42, 20);
        let approx = price_q64_to_f64(price);
        assert_eq!(bin_id_from_price_f64(approx, 20), Some(42));
    }
}

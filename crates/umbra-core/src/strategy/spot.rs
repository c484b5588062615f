//! # Spot Strategy
//!
//! Uniform weight across the bin range: equal token-Y per bid bin, equal
//! quote-token value per ask bin.

use crate::constants::ONE_Q64;
use crate::errors::CoreResult;
use crate::math::big_int::{mul_div_u128, Rounding};
use crate::math::safe_math::safe_cast_i128_to_i64;
use crate::strategy::amounts::{ask_side_sums, fit_base, total_ask_amount};

/// `(y0, delta_y)` spreading `amount` evenly over the delta range
pub(crate) fn solve_y(amount: u64, min_delta_id: i32, max_delta_id: i32) -> CoreResult<(i64, i64)> {
    if min_delta_id > max_delta_id {
        return Ok((0, 0));
    }
    let count = (max_delta_id as i64 - min_delta_id as i64 + 1) as u64;
    let y0 = safe_cast_i128_to_i64((amount / count) as i128)?;
    Ok((y0, 0))
}

/// `(x0, delta_x)` giving every ask bin the same quote-token value
///
/// The closed form divides by the summed inverse-price series; the nudge
/// loop then corrects the floor noise, bounded by a few passes over the
/// bin count.
pub(crate) fn solve_x(
    amount: u64,
    active_id: i32,
    min_delta_id: i32,
    max_delta_id: i32,
    bin_step: u16,
) -> CoreResult<(i64, i64)> {
    if min_delta_id > max_delta_id {
        return Ok((0, 0));
    }
    let sums = ask_side_sums(active_id, min_delta_id, max_delta_id, bin_step)?;
    if sums.inv_price_sum == 0 {
        // No weight anywhere in the range; nothing can be placed
        return Ok((0, 0));
    }

    let start = mul_div_u128(
        amount as u128,
        ONE_Q64,
        sums.inv_price_sum,
        Rounding::Down,
    )?;
    let start = safe_cast_i128_to_i64(start as i128)?;

    let max_iterations = sums.count as u32 * 4 + 64;
    let x0 = fit_base(
        |base| total_ask_amount(active_id, min_delta_id, max_delta_id, base, 0, bin_step),
        start,
        amount as u128,
        max_iterations,
    )?;
    Ok((x0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::amounts::total_bid_amount;

    #[test]
    fn test_even_split_is_exact() {
        let (y0, delta_y) = solve_y(500, -2, 2).unwrap();
        assert_eq!((y0, delta_y), (100, 0));
        assert_eq!(total_bid_amount(-2, 2, y0, delta_y).unwrap(), 500);
    }

    #[test]
    fn test_uneven_split_undershoots_within_count() {
        let (y0, _) = solve_y(502, -2, 2).unwrap();
        let total = total_bid_amount(-2, 2, y0, 0).unwrap();
        assert!(total <= 502);
        assert!(502 - total < 5);
    }

    #[test]
    fn test_x_side_fits_under_request() {
        let amount = 100_000u64;
        let (x0, delta_x) = solve_x(amount, 0, 0, 9, 100).unwrap();
        assert_eq!(delta_x, 0);
        let total = total_ask_amount(0, 0, 9, x0, 0, 100).unwrap();
        assert!(total <= amount as u128);
        assert!(amount as u128 - total < 10);
        // Maximal: one more unit of x0 overshoots
        let over = total_ask_amount(0, 0, 9, x0 + 1, 0, 100).unwrap();
        assert!(over > amount as u128);
    }
}

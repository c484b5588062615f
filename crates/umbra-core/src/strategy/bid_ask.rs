//! # BidAsk Strategy
//!
//! The inverse of Curve: weight increases linearly away from the active
//! bin, building a U-shaped book that backstops large moves. The totals are
//! linear in the base and slope terms, so the correction is a single exact
//! remainder fold instead of a nudge loop.

use crate::constants::ONE_Q64;
use crate::errors::CoreResult;
use crate::math::big_int::{mul_div_u128, Rounding};
use crate::math::safe_math::safe_cast_i128_to_i64;
use crate::strategy::amounts::{ask_side_sums, fit_base, total_ask_amount};
use crate::strategy::spot;

/// `(y0, delta_y)` with the bid-side weight increasing away from the
/// active bin
pub(crate) fn solve_y(amount: u64, min_delta_id: i32, max_delta_id: i32) -> CoreResult<(i64, i64)> {
    if min_delta_id > max_delta_id {
        return Ok((0, 0));
    }
    let count = (max_delta_id as i128) - (min_delta_id as i128) + 1;
    let near_distance = -(max_delta_id as i128);
    let far_distance = -(min_delta_id as i128);
    let distance_sum = (near_distance + far_distance) * count / 2;
    if distance_sum <= 0 {
        // All weight would sit on the active bin; distribute evenly instead
        return spot::solve_y(amount, min_delta_id, max_delta_id);
    }

    let delta_y = (amount as i128) / distance_sum;
    let remainder = (amount as i128) - delta_y * distance_sum;
    let y0 = remainder / count;
    Ok((safe_cast_i128_to_i64(y0)?, safe_cast_i128_to_i64(delta_y)?))
}

/// `(x0, delta_x)` with the ask-side quote-token value increasing away
/// from the active bin
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
        return Ok((0, 0));
    }
    if sums.weighted_inv_price_sum <= 0 {
        // No usable slope weight; park everything in the base term
        return spot::solve_x(amount, active_id, min_delta_id, max_delta_id, bin_step);
    }

    let delta_x = mul_div_u128(
        amount as u128,
        ONE_Q64,
        sums.weighted_inv_price_sum as u128,
        Rounding::Down,
    )?;
    let delta_x = safe_cast_i128_to_i64(delta_x as i128)?;

    // The slope alone cannot overshoot; fold the exact remainder into the
    // base term through the inverse-price sum
    let slope_total = total_ask_amount(active_id, min_delta_id, max_delta_id, 0, delta_x, bin_step)?;
    let remainder = (amount as u128).saturating_sub(slope_total);
    let x0 = mul_div_u128(remainder, ONE_Q64, sums.inv_price_sum, Rounding::Down)?;
    let x0 = safe_cast_i128_to_i64(x0 as i128)?;

    // Floor noise can still land a unit off either way
    let x0 = fit_base(
        |x0| total_ask_amount(active_id, min_delta_id, max_delta_id, x0, delta_x, bin_step),
        x0,
        amount as u128,
        sums.count as u32 * 2 + 16,
    )?;
    Ok((x0, delta_x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::amounts::{to_amount_bid_side, total_bid_amount};

    #[test]
    fn test_bid_side_exact_remainder_fold() {
        // Deltas -3..=-1, distances 1, 2, 3: slope weight 6
        let (y0, delta_y) = solve_y(6_000, -3, -1).unwrap();
        assert_eq!((y0, delta_y), (0, 1_000));
        assert_eq!(total_bid_amount(-3, -1, y0, delta_y).unwrap(), 6_000);

        // Remainder of 5 over 3 bins lands in the base term
        let (y0, delta_y) = solve_y(6_005, -3, -1).unwrap();
        assert_eq!((y0, delta_y), (1, 1_000));
        let total = total_bid_amount(-3, -1, y0, delta_y).unwrap();
        assert_eq!(total, 6_003);
        assert!(6_005 - total < 3);
    }

    #[test]
    fn test_bid_weight_increases_away_from_active() {
        let (y0, delta_y) = solve_y(10_000, -4, 0).unwrap();
        assert!(delta_y > 0);
        let amounts = to_amount_bid_side(0, -4, 0, y0, delta_y).unwrap();
        for pair in amounts.windows(2) {
            assert!(pair[0].amount_y >= pair[1].amount_y);
        }
        assert!(amounts[0].amount_y > amounts[4].amount_y);
    }

    #[test]
    fn test_single_active_bin_falls_back_to_uniform() {
        let (y0, delta_y) = solve_y(777, 0, 0).unwrap();
        assert_eq!((y0, delta_y), (777, 0));
    }

    #[test]
    fn test_ask_side_never_overshoots() {
        for amount in [100u64, 12_345, 1_000_000] {
            let (x0, delta_x) = solve_x(amount, 0, 0, 7, 100).unwrap();
            assert!(delta_x > 0);
            let total = total_ask_amount(0, 0, 7, x0, delta_x, 100).unwrap();
            assert!(total <= amount as u128, "overshoot at {}", amount);
            assert!(amount as u128 - total <= 8, "shortfall at {}", amount);
        }
    }
}

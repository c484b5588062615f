//! # Curve Strategy
//!
//! Weight decreases linearly away from the active bin and reaches zero one
//! past the far edge of the range, concentrating liquidity around the
//! current price. The closed forms fall out of triangular-number algebra;
//! a decrement-and-resimulate pass keeps the placed total at or under the
//! request.

use crate::constants::ONE_Q64;
use crate::errors::{CoreError, CoreResult};
use crate::math::big_int::{mul_div_u128, Rounding};
use crate::math::safe_math::safe_cast_i128_to_i64;
use crate::strategy::amounts::{ask_side_sums, fit_base, total_ask_amount, total_bid_amount};
use crate::strategy::spot;

/// `(y0, delta_y)` with the bid-side weight decreasing away from the
/// active bin
pub(crate) fn solve_y(amount: u64, min_delta_id: i32, max_delta_id: i32) -> CoreResult<(i64, i64)> {
    if min_delta_id > max_delta_id {
        return Ok((0, 0));
    }
    let count = (max_delta_id as i128) - (min_delta_id as i128) + 1;
    let far_distance = -(min_delta_id as i128);
    if far_distance <= 0 {
        // Range never leaves the active bin; a slope has nothing to act on
        return spot::solve_y(amount, min_delta_id, max_delta_id);
    }
    let near_distance = -(max_delta_id as i128);
    let distance_sum = (near_distance + far_distance) * count / 2;

    let far_plus_one = far_distance + 1;
    let denominator = count * far_plus_one - distance_sum;
    let numerator = (amount as i128) * far_plus_one;
    let start = safe_cast_i128_to_i64((numerator + denominator - 1) / denominator)?;

    let slope_for = |y0: i64| -(y0 / far_plus_one as i64);
    let max_iterations = count as u32 * 4 + 64;
    let y0 = fit_base(
        |y0| total_bid_amount(min_delta_id, max_delta_id, y0, slope_for(y0)),
        start,
        amount as u128,
        max_iterations,
    )?;
    Ok((y0, slope_for(y0)))
}

/// `(x0, delta_x)` mirroring the bid shape on the ask side, weighted by the
/// geometric inverse-price series
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
    let far_distance = max_delta_id as i128;
    if far_distance <= 0 {
        return spot::solve_x(amount, active_id, min_delta_id, max_delta_id, bin_step);
    }
    let sums = ask_side_sums(active_id, min_delta_id, max_delta_id, bin_step)?;
    if sums.inv_price_sum == 0 {
        return Ok((0, 0));
    }

    let far_plus_one = far_distance + 1;
    let denominator = i128::try_from(sums.inv_price_sum)
        .ok()
        .and_then(|sum| sum.checked_mul(far_plus_one))
        .and_then(|scaled| scaled.checked_sub(sums.weighted_inv_price_sum))
        .ok_or(CoreError::MathOverflow)?;
    if denominator <= 0 {
        return spot::solve_x(amount, active_id, min_delta_id, max_delta_id, bin_step);
    }

    let numerator = (amount as u128)
        .checked_mul(far_plus_one as u128)
        .ok_or(CoreError::MathOverflow)?;
    let start = mul_div_u128(numerator, ONE_Q64, denominator as u128, Rounding::Up)?;
    let start = safe_cast_i128_to_i64(start as i128)?;

    let slope_for = |x0: i64| -(x0 / far_plus_one as i64);
    let max_iterations = sums.count as u32 * 4 + 64;
    let x0 = fit_base(
        |x0| {
            total_ask_amount(
                active_id,
                min_delta_id,
                max_delta_id,
                x0,
                slope_for(x0),
                bin_step,
            )
        },
        start,
        amount as u128,
        max_iterations,
    )?;
    Ok((x0, slope_for(x0)))
}

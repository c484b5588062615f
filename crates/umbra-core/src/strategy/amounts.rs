//! # Per-Bin Amount Evaluation
//!
//! The shared primitive every strategy solver and the rebalance deposit
//! phase evaluate through. Bid-side bins take the arithmetic token-Y
//! formula; ask-side bins take a linear quote-token value converted to
//! token X through the inverse price, advanced by one multiply per bin.

use serde::{Deserialize, Serialize};

use crate::constants::ONE_Q64;
use crate::errors::{CoreError, CoreResult};
use crate::math::big_int::{mul_div_u128, Rounding};
use crate::math::bin_price::InversePrices;
use crate::math::safe_math::safe_cast_u128_to_u64;

/// Target amounts for one bin of a deposit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinAmount {
    pub bin_id: i32,
    pub amount_x: u64,
    pub amount_y: u64,
}

/// Bid-side end delta and ask-side start delta for the given active-bin
/// ownership
pub(crate) fn split_deltas(favor_x_in_active_bin: bool) -> (i32, i32) {
    if favor_x_in_active_bin {
        (-1, 0)
    } else {
        (0, 1)
    }
}

/// Token-Y amount for a bin at `distance = active_id - bin_id`, saturating
/// negatives to zero
pub(crate) fn y_amount_at(y0: i64, delta_y: i64, distance: i64) -> CoreResult<u64> {
    let value = (y0 as i128) + (delta_y as i128) * (distance as i128);
    if value <= 0 {
        return Ok(0);
    }
    u64::try_from(value).map_err(|_| CoreError::ConversionError)
}

/// Quote-token value coefficient for an ask bin at `distance = bin_id -
/// active_id`, saturating negatives to zero
pub(crate) fn x_value_at(x0: i64, delta_x: i64, distance: i64) -> CoreResult<u128> {
    let value = (x0 as i128) + (delta_x as i128) * (distance as i128);
    if value <= 0 {
        return Ok(0);
    }
    u128::try_from(value).map_err(|_| CoreError::ConversionError)
}

/// Token-Y amounts over `[min_delta_id, max_delta_id]` around the active
/// bin
pub fn to_amount_bid_side(
    active_id: i32,
    min_delta_id: i32,
    max_delta_id: i32,
    y0: i64,
    delta_y: i64,
) -> CoreResult<Vec<BinAmount>> {
    let mut amounts = Vec::new();
    for delta in min_delta_id..=max_delta_id {
        let bin_id = active_id.checked_add(delta).ok_or(CoreError::MathOverflow)?;
        let amount_y = y_amount_at(y0, delta_y, -(delta as i64))?;
        amounts.push(BinAmount {
            bin_id,
            amount_x: 0,
            amount_y,
        });
    }
    Ok(amounts)
}

/// Token-X amounts over `[min_delta_id, max_delta_id]` around the active
/// bin, converting the linear quote-token value through the inverse price
pub fn to_amount_ask_side(
    active_id: i32,
    min_delta_id: i32,
    max_delta_id: i32,
    x0: i64,
    delta_x: i64,
    bin_step: u16,
) -> CoreResult<Vec<BinAmount>> {
    if min_delta_id > max_delta_id {
        return Ok(Vec::new());
    }
    let start_bin = active_id
        .checked_add(min_delta_id)
        .ok_or(CoreError::MathOverflow)?;
    let mut series = InversePrices::starting_at(start_bin, bin_step);
    let mut amounts = Vec::new();
    for delta in min_delta_id..=max_delta_id {
        let bin_id = active_id.checked_add(delta).ok_or(CoreError::MathOverflow)?;
        let inverse_price = series.advance();
        let value = x_value_at(x0, delta_x, delta as i64)?;
        let amount_x = mul_div_u128(value, inverse_price, ONE_Q64, Rounding::Down)?;
        amounts.push(BinAmount {
            bin_id,
            amount_x: safe_cast_u128_to_u64(amount_x)?,
            amount_y: 0,
        });
    }
    Ok(amounts)
}

/// Per-bin amounts for a full deposit descriptor, splitting bid and ask at
/// the active bin with `favor_x_in_active_bin` fixing the boundary owner
#[allow(clippy::too_many_arguments)]
pub fn to_amount_into_bins(
    active_id: i32,
    min_delta_id: i32,
    max_delta_id: i32,
    delta_x: i64,
    delta_y: i64,
    x0: i64,
    y0: i64,
    bin_step: u16,
    favor_x_in_active_bin: bool,
) -> CoreResult<Vec<BinAmount>> {
    if min_delta_id > max_delta_id {
        return Ok(Vec::new());
    }
    let (bid_end, ask_start) = split_deltas(favor_x_in_active_bin);

    let mut amounts = Vec::new();
    if min_delta_id <= bid_end.min(max_delta_id) {
        amounts.extend(to_amount_bid_side(
            active_id,
            min_delta_id,
            bid_end.min(max_delta_id),
            y0,
            delta_y,
        )?);
    }
    if ask_start.max(min_delta_id) <= max_delta_id {
        amounts.extend(to_amount_ask_side(
            active_id,
            ask_start.max(min_delta_id),
            max_delta_id,
            x0,
            delta_x,
            bin_step,
        )?);
    }
    Ok(amounts)
}

// ============================================================================
// Solver Support
// ============================================================================

/// Total token-Y amount a `(y0, delta_y)` pair places over a delta range
pub(crate) fn total_bid_amount(
    min_delta_id: i32,
    max_delta_id: i32,
    y0: i64,
    delta_y: i64,
) -> CoreResult<u128> {
    let mut total = 0u128;
    for delta in min_delta_id..=max_delta_id {
        total = total
            .checked_add(y_amount_at(y0, delta_y, -(delta as i64))? as u128)
            .ok_or(CoreError::MathOverflow)?;
    }
    Ok(total)
}

/// Total token-X amount an `(x0, delta_x)` pair places over a delta range
pub(crate) fn total_ask_amount(
    active_id: i32,
    min_delta_id: i32,
    max_delta_id: i32,
    x0: i64,
    delta_x: i64,
    bin_step: u16,
) -> CoreResult<u128> {
    if min_delta_id > max_delta_id {
        return Ok(0);
    }
    let start_bin = active_id
        .checked_add(min_delta_id)
        .ok_or(CoreError::MathOverflow)?;
    let mut series = InversePrices::starting_at(start_bin, bin_step);
    let mut total = 0u128;
    for delta in min_delta_id..=max_delta_id {
        let inverse_price = series.advance();
        let value = x_value_at(x0, delta_x, delta as i64)?;
        let amount = mul_div_u128(value, inverse_price, ONE_Q64, Rounding::Down)?;
        total = total.checked_add(amount).ok_or(CoreError::MathOverflow)?;
    }
    Ok(total)
}

/// Inverse-price sums backing the ask-side closed forms
pub(crate) struct AskSideSums {
    /// Number of bins in the range
    pub count: u128,
    /// Sum of Q64.64 inverse prices
    pub inv_price_sum: u128,
    /// Sum of `delta * inverse_price`, signed because deltas can be
    pub weighted_inv_price_sum: i128,
}

pub(crate) fn ask_side_sums(
    active_id: i32,
    min_delta_id: i32,
    max_delta_id: i32,
    bin_step: u16,
) -> CoreResult<AskSideSums> {
    let start_bin = active_id
        .checked_add(min_delta_id)
        .ok_or(CoreError::MathOverflow)?;
    let mut series = InversePrices::starting_at(start_bin, bin_step);
    let mut inv_price_sum = 0u128;
    let mut weighted_inv_price_sum = 0i128;
    for delta in min_delta_id..=max_delta_id {
        let inverse_price = series.advance();
        inv_price_sum = inv_price_sum
            .checked_add(inverse_price)
            .ok_or(CoreError::MathOverflow)?;
        let weighted = i128::try_from(inverse_price)
            .ok()
            .and_then(|inv| inv.checked_mul(delta as i128))
            .ok_or(CoreError::MathOverflow)?;
        weighted_inv_price_sum = weighted_inv_price_sum
            .checked_add(weighted)
            .ok_or(CoreError::MathOverflow)?;
    }
    Ok(AskSideSums {
        count: (max_delta_id - min_delta_id + 1) as u128,
        inv_price_sum,
        weighted_inv_price_sum,
    })
}

/// Nudge a base parameter until the simulated total no longer undershoots
/// the requested amount, without ever ending above it. Each probe re-derives
/// the actual bin amounts; iterations are bounded by `max_iterations`.
pub(crate) fn fit_base<F>(total_of: F, start: i64, amount: u128, max_iterations: u32) -> CoreResult<i64>
where
    F: Fn(i64) -> CoreResult<u128>,
{
    let mut base = start.max(0);
    let mut iterations = 0u32;

    while base > 0 && total_of(base)? > amount {
        base -= 1;
        iterations += 1;
        if iterations >= max_iterations {
            break;
        }
    }

    while iterations < max_iterations {
        let next = base.checked_add(1).ok_or(CoreError::MathOverflow)?;
        if total_of(next)? <= amount {
            base = next;
            iterations += 1;
        } else {
            break;
        }
    }

    Ok(base)
}

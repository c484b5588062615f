//! # Liquidity Distribution Strategies
//!
//! Three interchangeable shapes for spreading a deposit over a bin range:
//! Spot (uniform), Curve (concentrated around the active bin), and BidAsk
//! (U-shaped, weight growing away from the active bin). Each solver turns a
//! total amount and a delta range into the `(base, slope)` parameters the
//! program applies per bin, and the shared evaluation primitive inverts
//! them back into per-bin amounts.
//!
//! Solvers never overshoot: the placed total is at or below the request,
//! and within the range's bin count of it.

mod amounts;
mod bid_ask;
mod curve;
mod parameters;
mod spot;

pub use amounts::{to_amount_ask_side, to_amount_bid_side, to_amount_into_bins, BinAmount};
pub use parameters::{
    EncodedStrategyParameters, LiquidityStrategyParameters, DELTA_X_NEGATIVE, DELTA_Y_NEGATIVE,
    X0_NEGATIVE, Y0_NEGATIVE,
};

use serde::{Deserialize, Serialize};

use crate::constants::ONE_Q64;
use crate::errors::{CoreError, CoreResult};
use crate::math::big_int::{mul_div_u128, Rounding};
use crate::math::bin_price::InversePrices;
use crate::math::safe_math::safe_cast_u128_to_u64;

/// The distribution shape a deposit follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidityStrategyKind {
    /// Uniform weight across the range
    Spot,
    /// Weight decreasing away from the active bin
    Curve,
    /// Weight increasing away from the active bin
    BidAsk,
}

fn solve_y_side(
    kind: LiquidityStrategyKind,
    amount: u64,
    min_delta_id: i32,
    max_delta_id: i32,
) -> CoreResult<(i64, i64)> {
    match kind {
        LiquidityStrategyKind::Spot => spot::solve_y(amount, min_delta_id, max_delta_id),
        LiquidityStrategyKind::Curve => curve::solve_y(amount, min_delta_id, max_delta_id),
        LiquidityStrategyKind::BidAsk => bid_ask::solve_y(amount, min_delta_id, max_delta_id),
    }
}

fn solve_x_side(
    kind: LiquidityStrategyKind,
    amount: u64,
    active_id: i32,
    min_delta_id: i32,
    max_delta_id: i32,
    bin_step: u16,
) -> CoreResult<(i64, i64)> {
    match kind {
        LiquidityStrategyKind::Spot => {
            spot::solve_x(amount, active_id, min_delta_id, max_delta_id, bin_step)
        }
        LiquidityStrategyKind::Curve => {
            curve::solve_x(amount, active_id, min_delta_id, max_delta_id, bin_step)
        }
        LiquidityStrategyKind::BidAsk => {
            bid_ask::solve_x(amount, active_id, min_delta_id, max_delta_id, bin_step)
        }
    }
}

/// Solve the per-bin distribution parameters for a deposit
///
/// One-sided deposits apply that token's formula across the whole range.
/// Two-sided deposits split at the active bin, with
/// `favor_x_in_active_bin` deciding which side owns it, and each side is
/// solved independently. An inverted range yields zero parameters.
#[allow(clippy::too_many_arguments)]
pub fn build_liquidity_strategy_parameters(
    amount_x: u64,
    amount_y: u64,
    min_delta_id: i32,
    max_delta_id: i32,
    bin_step: u16,
    favor_x_in_active_bin: bool,
    active_id: i32,
    kind: LiquidityStrategyKind,
) -> CoreResult<LiquidityStrategyParameters> {
    if min_delta_id > max_delta_id {
        return Ok(LiquidityStrategyParameters::ZERO);
    }

    if amount_x == 0 && amount_y == 0 {
        return Ok(LiquidityStrategyParameters::ZERO);
    }

    if amount_x == 0 {
        let (y0, delta_y) = solve_y_side(kind, amount_y, min_delta_id, max_delta_id)?;
        return Ok(LiquidityStrategyParameters {
            x0: 0,
            y0,
            delta_x: 0,
            delta_y,
        });
    }

    if amount_y == 0 {
        let (x0, delta_x) =
            solve_x_side(kind, amount_x, active_id, min_delta_id, max_delta_id, bin_step)?;
        return Ok(LiquidityStrategyParameters {
            x0,
            y0: 0,
            delta_x,
            delta_y: 0,
        });
    }

    let (bid_end, ask_start) = amounts::split_deltas(favor_x_in_active_bin);
    let (y0, delta_y) = if min_delta_id <= bid_end.min(max_delta_id) {
        solve_y_side(kind, amount_y, min_delta_id, bid_end.min(max_delta_id))?
    } else {
        (0, 0)
    };
    let (x0, delta_x) = if ask_start.max(min_delta_id) <= max_delta_id {
        solve_x_side(
            kind,
            amount_x,
            active_id,
            ask_start.max(min_delta_id),
            max_delta_id,
            bin_step,
        )?
    } else {
        (0, 0)
    };

    Ok(LiquidityStrategyParameters {
        x0,
        y0,
        delta_x,
        delta_y,
    })
}

/// Propose the token-X amount whose ask-side shape mirrors an already
/// sized bid side, in quote-token terms
#[allow(clippy::too_many_arguments)]
pub fn suggest_balanced_x_from_y(
    kind: LiquidityStrategyKind,
    amount_y: u64,
    active_id: i32,
    min_delta_id: i32,
    max_delta_id: i32,
    bin_step: u16,
    favor_x_in_active_bin: bool,
) -> CoreResult<u64> {
    let (bid_end, ask_start) = amounts::split_deltas(favor_x_in_active_bin);
    let bid_max = bid_end.min(max_delta_id);
    let ask_min = ask_start.max(min_delta_id);
    if min_delta_id > bid_max || ask_min > max_delta_id {
        return Ok(0);
    }

    let (y0, delta_y) = solve_y_side(kind, amount_y, min_delta_id, bid_max)?;

    let start_bin = active_id
        .checked_add(ask_min)
        .ok_or(CoreError::MathOverflow)?;
    let mut series = InversePrices::starting_at(start_bin, bin_step);
    let mut total = 0u128;
    for delta in ask_min..=max_delta_id {
        let inverse_price = series.advance();
        // Same per-distance quote-token value as the bid side
        let value = amounts::x_value_at(y0, delta_y, delta as i64)?;
        let amount = mul_div_u128(value, inverse_price, ONE_Q64, Rounding::Down)?;
        total = total.checked_add(amount).ok_or(CoreError::MathOverflow)?;
    }
    safe_cast_u128_to_u64(total)
}

/// Propose the token-Y amount whose bid-side shape mirrors an already
/// sized ask side, in quote-token terms
#[allow(clippy::too_many_arguments)]
pub fn suggest_balanced_y_from_x(
    kind: LiquidityStrategyKind,
    amount_x: u64,
    active_id: i32,
    min_delta_id: i32,
    max_delta_id: i32,
    bin_step: u16,
    favor_x_in_active_bin: bool,
) -> CoreResult<u64> {
    let (bid_end, ask_start) = amounts::split_deltas(favor_x_in_active_bin);
    let bid_max = bid_end.min(max_delta_id);
    let ask_min = ask_start.max(min_delta_id);
    if min_delta_id > bid_max || ask_min > max_delta_id {
        return Ok(0);
    }

    let (x0, delta_x) =
        solve_x_side(kind, amount_x, active_id, ask_min, max_delta_id, bin_step)?;

    let mut total = 0u128;
    for delta in min_delta_id..=bid_max {
        // The ask coefficients are already quote-token values; sum them at
        // the mirrored bid distances directly
        let value = amounts::x_value_at(x0, delta_x, -(delta as i64))?;
        total = total.checked_add(value).ok_or(CoreError::MathOverflow)?;
    }
    safe_cast_u128_to_u64(total)
}

//! # Swap Quoting
//!
//! Walks bins outward from the active bin, consuming liquidity bin by bin
//! and applying the fee model per bin, for exact-in and exact-out quotes.
//! Quoting is side-effect-free: the volatile fee parameters are cloned and
//! the caller's pool snapshot is never touched.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::bin_array::{bin_array_index, BinSource};
use crate::constants::{BASIS_POINT_MAX, MAX_EXTRA_BIN_ARRAYS, ONE_Q64};
use crate::errors::{CoreError, CoreResult};
use crate::fees::{
    fee_from_gross_amount, fee_from_net_amount, protocol_fee, total_fee_rate,
    update_references, update_volatility_accumulator, StaticFeeParams, VolatileFeeParams,
};
use crate::math::big_int::{mul_div_u128, mul_div_u64, Rounding};
use crate::math::bin_price::price_at_bin;
use crate::math::safe_math::{safe_add_u64, safe_cast_u128_to_u64, safe_sub_u64};

/// Read-only snapshot of the pool state a quote runs against
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Bin the current market price sits in
    pub active_id: i32,
    /// Immutable fee configuration
    pub parameters: StaticFeeParams,
    /// Volatility state; quotes work on a clone of this
    pub v_parameters: VolatileFeeParams,
    /// Quote timestamp, from the chain clock
    pub current_timestamp: i64,
}

/// Caller-tunable quoting knobs
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuoteOptions {
    /// Slippage tolerance applied to the quoted bound, in basis points
    pub slippage_bps: u16,
    /// Return whatever was filled instead of erroring when liquidity runs
    /// out
    pub is_partial_fill: bool,
    /// Extra liquidity-bearing bin arrays to enumerate past quote
    /// completion, at most [`MAX_EXTRA_BIN_ARRAYS`]
    pub max_extra_bin_arrays: u8,
}

impl Default for QuoteOptions {
    fn default() -> Self {
        Self {
            slippage_bps: 0,
            is_partial_fill: false,
            max_extra_bin_arrays: 0,
        }
    }
}

/// Result of an exact-in quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    /// Input actually consumed, fee-inclusive
    pub consumed_in_amount: u64,
    /// Output produced
    pub out_amount: u64,
    /// Total fee charged on the input side
    pub fee: u64,
    /// Portion of the fee owed to the protocol
    pub protocol_fee: u64,
    /// Output floor after applying the slippage tolerance
    pub min_out_amount: u64,
    /// Shortfall versus the all-at-start-price output, in basis points
    pub price_impact_bps: u64,
    /// Bin array indexes the walk visited, in walk order
    pub bin_arrays_touched: Vec<i32>,
}

/// Result of an exact-out quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuoteExactOut {
    /// Input required, fee-inclusive
    pub in_amount: u64,
    /// Input ceiling after applying the slippage tolerance
    pub max_in_amount: u64,
    /// Output filled
    pub out_amount: u64,
    /// Total fee charged on the input side
    pub fee: u64,
    /// Portion of the fee owed to the protocol
    pub protocol_fee: u64,
    /// Excess versus the all-at-start-price input, in basis points
    pub price_impact_bps: u64,
    /// Bin array indexes the walk visited, in walk order
    pub bin_arrays_touched: Vec<i32>,
}

// ============================================================================
// Per-Bin Conversions
// ============================================================================

/// Output for a net input at a bin price
pub fn amount_out_for_in(
    amount_in: u64,
    price: u128,
    swap_for_y: bool,
    rounding: Rounding,
) -> CoreResult<u64> {
    let out = if swap_for_y {
        mul_div_u128(amount_in as u128, price, ONE_Q64, rounding)?
    } else {
        if price == 0 {
            return Ok(0);
        }
        mul_div_u128(amount_in as u128, ONE_Q64, price, rounding)?
    };
    safe_cast_u128_to_u64(out)
}

/// Net input needed for an output at a bin price
pub fn amount_in_for_out(
    amount_out: u64,
    price: u128,
    swap_for_y: bool,
    rounding: Rounding,
) -> CoreResult<u64> {
    let amount_in = if swap_for_y {
        mul_div_u128(amount_out as u128, ONE_Q64, price, rounding)?
    } else {
        mul_div_u128(amount_out as u128, price, ONE_Q64, rounding)?
    };
    safe_cast_u128_to_u64(amount_in)
}

// ============================================================================
// Exact-In
// ============================================================================

/// Quote a swap of exactly `amount_in` input tokens
pub fn swap_quote_exact_in<B: BinSource>(
    pool: &PoolSnapshot,
    bins: &B,
    amount_in: u64,
    swap_for_y: bool,
    options: &QuoteOptions,
) -> CoreResult<SwapQuote> {
    validate_options(options)?;
    debug!(
        "quote exact-in: amount {} for_y {} from bin {}",
        amount_in, swap_for_y, pool.active_id
    );

    let params = &pool.parameters;
    let mut v_params = pool.v_parameters;
    update_references(params, &mut v_params, pool.active_id, pool.current_timestamp);

    let start_price = price_at_bin(pool.active_id, params.bin_step);

    let mut current = bins
        .bin(pool.active_id)
        .or_else(|| bins.next_bin(pool.active_id, swap_for_y));
    let mut amount_in_left = amount_in;
    let mut total_out = 0u64;
    let mut total_fee = 0u64;
    let mut total_protocol_fee = 0u64;
    let mut touched: Vec<i32> = Vec::new();
    let mut last_visited = pool.active_id;

    while amount_in_left > 0 {
        let Some(bin) = current else {
            if options.is_partial_fill {
                break;
            }
            return Err(CoreError::InsufficientLiquidity);
        };
        last_visited = bin.bin_id;
        update_volatility_accumulator(params, &mut v_params, bin.bin_id);

        let reserve_out = bin.reserve_out(swap_for_y);
        if reserve_out > 0 {
            push_unique(&mut touched, bin_array_index(bin.bin_id));
            let rate = total_fee_rate(params, &v_params)?;

            // Input needed to drain the whole bin, fee on top
            let max_amount_in =
                amount_in_for_out(reserve_out, bin.price, swap_for_y, Rounding::Up)?;
            let max_fee = fee_from_net_amount(max_amount_in, rate)?;
            let max_amount_in_with_fee = safe_add_u64(max_amount_in, max_fee)?;

            if amount_in_left >= max_amount_in_with_fee {
                trace!("bin {} drained for {}", bin.bin_id, reserve_out);
                amount_in_left -= max_amount_in_with_fee;
                total_out = safe_add_u64(total_out, reserve_out)?;
                total_fee = safe_add_u64(total_fee, max_fee)?;
                total_protocol_fee = safe_add_u64(
                    total_protocol_fee,
                    protocol_fee(max_fee, params.protocol_share)?,
                )?;
            } else {
                let fee = fee_from_gross_amount(amount_in_left, rate)?;
                let net = safe_sub_u64(amount_in_left, fee)?;
                let out = amount_out_for_in(net, bin.price, swap_for_y, Rounding::Down)?
                    .min(reserve_out);
                trace!("bin {} partial fill for {}", bin.bin_id, out);
                total_out = safe_add_u64(total_out, out)?;
                total_fee = safe_add_u64(total_fee, fee)?;
                total_protocol_fee = safe_add_u64(
                    total_protocol_fee,
                    protocol_fee(fee, params.protocol_share)?,
                )?;
                amount_in_left = 0;
            }
        }

        if amount_in_left > 0 {
            current = bins.next_bin(bin.bin_id, swap_for_y);
        }
    }

    enumerate_extra_arrays(
        bins,
        last_visited,
        swap_for_y,
        options.max_extra_bin_arrays,
        &mut touched,
    );

    let consumed_in_amount = amount_in - amount_in_left;
    let theoretical_out =
        amount_out_for_in(consumed_in_amount, start_price, swap_for_y, Rounding::Down)?;
    let price_impact_bps = shortfall_bps(theoretical_out, total_out)?;
    let min_out_amount = mul_div_u64(
        total_out,
        (BASIS_POINT_MAX as u16 - options.slippage_bps) as u64,
        BASIS_POINT_MAX as u64,
        Rounding::Down,
    )?;

    debug!(
        "quote exact-in done: consumed {} out {} fee {}",
        consumed_in_amount, total_out, total_fee
    );
    Ok(SwapQuote {
        consumed_in_amount,
        out_amount: total_out,
        fee: total_fee,
        protocol_fee: total_protocol_fee,
        min_out_amount,
        price_impact_bps,
        bin_arrays_touched: touched,
    })
}

// ============================================================================
// Exact-Out
// ============================================================================

/// Quote a swap producing exactly `amount_out` output tokens
pub fn swap_quote_exact_out<B: BinSource>(
    pool: &PoolSnapshot,
    bins: &B,
    amount_out: u64,
    swap_for_y: bool,
    options: &QuoteOptions,
) -> CoreResult<SwapQuoteExactOut> {
    validate_options(options)?;
    debug!(
        "quote exact-out: amount {} for_y {} from bin {}",
        amount_out, swap_for_y, pool.active_id
    );

    let params = &pool.parameters;
    let mut v_params = pool.v_parameters;
    update_references(params, &mut v_params, pool.active_id, pool.current_timestamp);

    let start_price = price_at_bin(pool.active_id, params.bin_step);

    let mut current = bins
        .bin(pool.active_id)
        .or_else(|| bins.next_bin(pool.active_id, swap_for_y));
    let mut out_amount_left = amount_out;
    let mut total_in = 0u64;
    let mut total_fee = 0u64;
    let mut total_protocol_fee = 0u64;
    let mut touched: Vec<i32> = Vec::new();
    let mut last_visited = pool.active_id;

    while out_amount_left > 0 {
        let Some(bin) = current else {
            if options.is_partial_fill {
                break;
            }
            return Err(CoreError::InsufficientLiquidity);
        };
        last_visited = bin.bin_id;
        update_volatility_accumulator(params, &mut v_params, bin.bin_id);

        let reserve_out = bin.reserve_out(swap_for_y);
        if reserve_out > 0 {
            push_unique(&mut touched, bin_array_index(bin.bin_id));
            let rate = total_fee_rate(params, &v_params)?;

            let out_from_bin = out_amount_left.min(reserve_out);
            let in_net = amount_in_for_out(out_from_bin, bin.price, swap_for_y, Rounding::Up)?;
            let fee = fee_from_net_amount(in_net, rate)?;
            trace!("bin {} supplies {} for {}", bin.bin_id, out_from_bin, in_net);

            total_in = safe_add_u64(total_in, safe_add_u64(in_net, fee)?)?;
            total_fee = safe_add_u64(total_fee, fee)?;
            total_protocol_fee = safe_add_u64(
                total_protocol_fee,
                protocol_fee(fee, params.protocol_share)?,
            )?;
            out_amount_left -= out_from_bin;
        }

        if out_amount_left > 0 {
            current = bins.next_bin(bin.bin_id, swap_for_y);
        }
    }

    enumerate_extra_arrays(
        bins,
        last_visited,
        swap_for_y,
        options.max_extra_bin_arrays,
        &mut touched,
    );

    let out_filled = amount_out - out_amount_left;
    let theoretical_in =
        amount_in_for_out(out_filled, start_price, swap_for_y, Rounding::Up)?;
    let price_impact_bps = excess_bps(total_in, theoretical_in)?;
    let max_in_amount = mul_div_u64(
        total_in,
        (BASIS_POINT_MAX as u16 + options.slippage_bps) as u64,
        BASIS_POINT_MAX as u64,
        Rounding::Up,
    )?;

    debug!(
        "quote exact-out done: in {} out {} fee {}",
        total_in, out_filled, total_fee
    );
    Ok(SwapQuoteExactOut {
        in_amount: total_in,
        max_in_amount,
        out_amount: out_filled,
        fee: total_fee,
        protocol_fee: total_protocol_fee,
        price_impact_bps,
        bin_arrays_touched: touched,
    })
}

// ============================================================================
// Helpers
// ============================================================================

fn validate_options(options: &QuoteOptions) -> CoreResult<()> {
    if options.max_extra_bin_arrays > MAX_EXTRA_BIN_ARRAYS {
        return Err(CoreError::InvalidParameter);
    }
    if options.slippage_bps > BASIS_POINT_MAX as u16 {
        return Err(CoreError::InvalidParameter);
    }
    Ok(())
}

fn push_unique(touched: &mut Vec<i32>, index: i32) {
    if !touched.contains(&index) {
        touched.push(index);
    }
}

/// Continue past quote completion, collecting up to `budget` further
/// liquidity-bearing array indexes. Informational only.
fn enumerate_extra_arrays<B: BinSource>(
    bins: &B,
    from: i32,
    swap_for_y: bool,
    budget: u8,
    touched: &mut Vec<i32>,
) {
    let mut remaining = budget;
    let mut cursor = from;
    while remaining > 0 {
        let Some(bin) = bins.next_bin(cursor, swap_for_y) else {
            break;
        };
        cursor = bin.bin_id;
        if bin.reserve_out(swap_for_y) > 0 {
            let index = bin_array_index(bin.bin_id);
            if !touched.contains(&index) {
                touched.push(index);
                remaining -= 1;
            }
        }
    }
}

/// `(reference - actual) / reference` in basis points, zero when the
/// reference is zero
fn shortfall_bps(reference: u64, actual: u64) -> CoreResult<u64> {
    if reference == 0 {
        return Ok(0);
    }
    mul_div_u64(
        reference.saturating_sub(actual),
        BASIS_POINT_MAX as u64,
        reference,
        Rounding::Down,
    )
}

/// `(actual - reference) / reference` in basis points, zero when the
/// reference is zero
fn excess_bps(actual: u64, reference: u64) -> CoreResult<u64> {
    if reference == 0 {
        return Ok(0);
    }
    mul_div_u64(
        actual.saturating_sub(reference),
        BASIS_POINT_MAX as u64,
        reference,
        Rounding::Down,
    )
}

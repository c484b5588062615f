//! # Rebalance Simulation
//!
//! Combines withdraw, resize, and redeposit against a position's per-bin
//! ledger in one conservation-checked operation. All inputs are validated
//! before any mutation; the three phases then run in order:
//!
//! 1. withdraw the requested basis points per bin, optionally claiming
//!    fees and rewards,
//! 2. resize the contiguous ledger to cover the deposit ranges and
//!    whatever still carries value, trimming bare edges,
//! 3. credit the deposits, routing the active bin through a
//!    liquidity-share simulation that charges the composition fee on the
//!    implicitly swapped side.
//!
//! Deposits and withdrawals net against each other; only the difference
//! crosses the position boundary.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::bin_array::{Bin, BinSource};
use crate::constants::{
    ACCOUNT_STORAGE_OVERHEAD, BASIS_POINT_MAX, LAMPORTS_PER_BYTE_YEAR, NUM_REWARDS, ONE_Q64,
    POSITION_BIN_SIZE, RENT_EXEMPTION_YEARS,
};
use crate::errors::{CoreError, CoreResult};
use crate::fees::{
    composition_fee, total_fee_rate, update_references, update_volatility_accumulator,
};
use crate::math::big_int::{mul_div_u128, mul_div_u64, Rounding};
use crate::math::bin_price::price_at_bin;
use crate::math::safe_math::{safe_add_u64, safe_cast_u128_to_u64};
use crate::position::PositionBinData;
use crate::quote::PoolSnapshot;
use crate::strategy::to_amount_into_bins;

/// One withdraw descriptor; `None` bounds default to the active bin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceWithdrawParam {
    pub min_bin_id: Option<i32>,
    pub max_bin_id: Option<i32>,
    /// Share of each bin to withdraw, in basis points
    pub bps: u16,
}

/// One deposit descriptor, as strategy parameters over a delta range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceDepositParam {
    pub min_delta_id: i32,
    pub max_delta_id: i32,
    pub x0: i64,
    pub y0: i64,
    pub delta_x: i64,
    pub delta_y: i64,
    pub favor_x_in_active_bin: bool,
}

/// Claim switches applied during the withdraw phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceOptions {
    pub should_claim_fee: bool,
    pub should_claim_reward: bool,
}

/// Simulation totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulateRebalanceResult {
    /// Raw token X across all deposit descriptors
    pub amount_x_deposited: u64,
    /// Raw token Y across all deposit descriptors
    pub amount_y_deposited: u64,
    /// Token X debited from bins by the withdraw phase
    pub amount_x_withdrawn: u64,
    /// Token Y debited from bins by the withdraw phase
    pub amount_y_withdrawn: u64,
    /// Fees collected by the withdraw phase
    pub claimed_fee_x: u64,
    pub claimed_fee_y: u64,
    /// Net token X the caller must transfer in
    pub actual_amount_x_deposited: u64,
    /// Net token X the caller receives back
    pub actual_amount_x_withdrawn: u64,
    /// Net token Y the caller must transfer in
    pub actual_amount_y_deposited: u64,
    /// Net token Y the caller receives back
    pub actual_amount_y_withdrawn: u64,
    /// Rewards collected by the withdraw phase
    pub reward_amounts_claimed: [u64; NUM_REWARDS],
    /// Rent the resize costs (positive) or refunds (negative)
    pub rental_cost_lamports: i64,
    /// Signed change in the ledger's bin count
    pub bin_count_delta: i64,
}

/// Simulation output: the totals and the position's new ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceOutcome {
    pub result: SimulateRebalanceResult,
    pub position_bins: Vec<PositionBinData>,
}

/// Simulate a full rebalance against the supplied position ledger
pub fn simulate_rebalance<B: BinSource>(
    pool: &PoolSnapshot,
    bins: &B,
    position_bins: Vec<PositionBinData>,
    withdraws: &[RebalanceWithdrawParam],
    deposits: &[RebalanceDepositParam],
    options: &RebalanceOptions,
) -> CoreResult<RebalanceOutcome> {
    if withdraws.is_empty() && deposits.is_empty() {
        return Err(CoreError::NoRebalanceAction);
    }
    let normalized_withdraws = validate_withdraws(withdraws, pool.active_id)?;
    validate_deposits(deposits)?;
    debug!(
        "rebalance: {} withdraws, {} deposits over {} position bins",
        withdraws.len(),
        deposits.len(),
        position_bins.len()
    );

    let mut result = SimulateRebalanceResult::default();
    let mut ledger = position_bins;

    withdraw_phase(&mut ledger, &normalized_withdraws, options, &mut result)?;
    let width_delta = resize_phase(&mut ledger, deposits, pool)?;
    deposit_phase(&mut ledger, deposits, pool, bins, &mut result)?;

    settle(&mut result, width_delta)?;
    debug!(
        "rebalance done: net deposit ({}, {}), net withdraw ({}, {})",
        result.actual_amount_x_deposited,
        result.actual_amount_y_deposited,
        result.actual_amount_x_withdrawn,
        result.actual_amount_y_withdrawn
    );
    Ok(RebalanceOutcome {
        result,
        position_bins: ledger,
    })
}

// ============================================================================
// Validation
// ============================================================================

struct NormalizedWithdraw {
    min_bin_id: i32,
    max_bin_id: i32,
    bps: u16,
}

fn validate_withdraws(
    withdraws: &[RebalanceWithdrawParam],
    active_id: i32,
) -> CoreResult<Vec<NormalizedWithdraw>> {
    let mut normalized: Vec<NormalizedWithdraw> = withdraws
        .iter()
        .map(|param| {
            if param.bps > BASIS_POINT_MAX as u16 {
                return Err(CoreError::InvalidBps);
            }
            let min_bin_id = param.min_bin_id.unwrap_or(active_id);
            let max_bin_id = param.max_bin_id.unwrap_or(active_id);
            if min_bin_id > max_bin_id {
                return Err(CoreError::InvalidBinRange);
            }
            Ok(NormalizedWithdraw {
                min_bin_id,
                max_bin_id,
                bps: param.bps,
            })
        })
        .collect::<CoreResult<_>>()?;

    normalized.sort_by_key(|param| param.min_bin_id);
    for pair in normalized.windows(2) {
        if pair[0].max_bin_id >= pair[1].min_bin_id {
            return Err(CoreError::OverlapWithdrawRange);
        }
    }
    Ok(normalized)
}

fn validate_deposits(deposits: &[RebalanceDepositParam]) -> CoreResult<()> {
    for param in deposits {
        if param.min_delta_id >= param.max_delta_id {
            return Err(CoreError::InvalidDeltaRange);
        }
    }
    let mut ranges: Vec<(i32, i32)> = deposits
        .iter()
        .map(|param| (param.min_delta_id, param.max_delta_id))
        .collect();
    ranges.sort_by_key(|range| range.0);
    for pair in ranges.windows(2) {
        if pair[0].1 >= pair[1].0 {
            return Err(CoreError::OverlapDepositRange);
        }
    }
    Ok(())
}

// ============================================================================
// Phase 1: Withdraw
// ============================================================================

fn withdraw_phase(
    ledger: &mut [PositionBinData],
    withdraws: &[NormalizedWithdraw],
    options: &RebalanceOptions,
    result: &mut SimulateRebalanceResult,
) -> CoreResult<()> {
    for param in withdraws {
        for bin in ledger
            .iter_mut()
            .filter(|bin| bin.bin_id >= param.min_bin_id && bin.bin_id <= param.max_bin_id)
        {
            let amount_x = mul_div_u64(
                bin.amount_x,
                param.bps as u64,
                BASIS_POINT_MAX as u64,
                Rounding::Down,
            )?;
            let amount_y = mul_div_u64(
                bin.amount_y,
                param.bps as u64,
                BASIS_POINT_MAX as u64,
                Rounding::Down,
            )?;
            bin.amount_x -= amount_x;
            bin.amount_y -= amount_y;
            result.amount_x_withdrawn = safe_add_u64(result.amount_x_withdrawn, amount_x)?;
            result.amount_y_withdrawn = safe_add_u64(result.amount_y_withdrawn, amount_y)?;

            if options.should_claim_fee {
                result.claimed_fee_x = safe_add_u64(result.claimed_fee_x, bin.claimable_fee_x)?;
                result.claimed_fee_y = safe_add_u64(result.claimed_fee_y, bin.claimable_fee_y)?;
                bin.claimable_fee_x = 0;
                bin.claimable_fee_y = 0;
            }
            if options.should_claim_reward {
                for slot in 0..NUM_REWARDS {
                    result.reward_amounts_claimed[slot] = safe_add_u64(
                        result.reward_amounts_claimed[slot],
                        bin.claimable_rewards[slot],
                    )?;
                    bin.claimable_rewards[slot] = 0;
                }
            }
        }
    }
    Ok(())
}

// ============================================================================
// Phase 2: Resize
// ============================================================================

/// Rebuild the ledger over the union of the deposit ranges and the bins
/// still carrying value, returning the signed width change
fn resize_phase(
    ledger: &mut Vec<PositionBinData>,
    deposits: &[RebalanceDepositParam],
    pool: &PoolSnapshot,
) -> CoreResult<i64> {
    let mut range: Option<(i32, i32)> = None;
    let mut widen = |lo: i32, hi: i32| {
        range = Some(match range {
            None => (lo, hi),
            Some((old_lo, old_hi)) => (old_lo.min(lo), old_hi.max(hi)),
        });
    };

    for bin in ledger.iter().filter(|bin| bin.has_residual_value()) {
        widen(bin.bin_id, bin.bin_id);
    }
    for param in deposits {
        let lo = pool
            .active_id
            .checked_add(param.min_delta_id)
            .ok_or(CoreError::MathOverflow)?;
        let hi = pool
            .active_id
            .checked_add(param.max_delta_id)
            .ok_or(CoreError::MathOverflow)?;
        widen(lo, hi);
    }

    let old_count = ledger.len() as i64;
    let rebuilt = match range {
        None => Vec::new(),
        Some((lo, hi)) => {
            let previous_lo = ledger.first().map(|bin| bin.bin_id);
            let take_existing = |bin_id: i32| -> Option<PositionBinData> {
                let lo = previous_lo?;
                let index = i64::from(bin_id) - i64::from(lo);
                if index < 0 {
                    return None;
                }
                ledger.get(index as usize).copied()
            };
            (lo..=hi)
                .map(|bin_id| {
                    take_existing(bin_id).unwrap_or(PositionBinData {
                        bin_id,
                        price: price_at_bin(bin_id, pool.parameters.bin_step),
                        ..Default::default()
                    })
                })
                .collect()
        }
    };

    *ledger = rebuilt;
    Ok(ledger.len() as i64 - old_count)
}

// ============================================================================
// Phase 3: Deposit
// ============================================================================

fn deposit_phase<B: BinSource>(
    ledger: &mut [PositionBinData],
    deposits: &[RebalanceDepositParam],
    pool: &PoolSnapshot,
    bins: &B,
    result: &mut SimulateRebalanceResult,
) -> CoreResult<()> {
    if deposits.is_empty() {
        return Ok(());
    }

    // Fee state for the active-bin composition fee, on a clone
    let mut v_params = pool.v_parameters;
    update_references(&pool.parameters, &mut v_params, pool.active_id, pool.current_timestamp);
    update_volatility_accumulator(&pool.parameters, &mut v_params, pool.active_id);
    let fee_rate = total_fee_rate(&pool.parameters, &v_params)?;

    let active_bin = bins.bin(pool.active_id);
    let active_price = price_at_bin(pool.active_id, pool.parameters.bin_step);
    let ledger_lo = ledger.first().map(|bin| bin.bin_id);

    for param in deposits {
        let amounts = to_amount_into_bins(
            pool.active_id,
            param.min_delta_id,
            param.max_delta_id,
            param.delta_x,
            param.delta_y,
            param.x0,
            param.y0,
            pool.parameters.bin_step,
            param.favor_x_in_active_bin,
        )?;

        for amount in amounts {
            result.amount_x_deposited = safe_add_u64(result.amount_x_deposited, amount.amount_x)?;
            result.amount_y_deposited = safe_add_u64(result.amount_y_deposited, amount.amount_y)?;

            let lo = ledger_lo.ok_or(CoreError::InvalidParameter)?;
            let index = (i64::from(amount.bin_id) - i64::from(lo)) as usize;
            let entry = ledger.get_mut(index).ok_or(CoreError::InvalidParameter)?;

            let (credited_x, credited_y) = if amount.bin_id == pool.active_id {
                simulate_active_bin_deposit(
                    amount.amount_x,
                    amount.amount_y,
                    active_bin,
                    active_price,
                    fee_rate,
                )?
            } else {
                (amount.amount_x, amount.amount_y)
            };
            entry.amount_x = safe_add_u64(entry.amount_x, credited_x)?;
            entry.amount_y = safe_add_u64(entry.amount_y, credited_y)?;
        }
    }
    Ok(())
}

/// Credit a deposit into the live active bin through a proportional
/// liquidity-share simulation. A credited amount above the raw input on one
/// side is an implicit same-bin swap; its quote-value is charged the
/// composition fee against the other side.
fn simulate_active_bin_deposit(
    amount_x: u64,
    amount_y: u64,
    active_bin: Option<Bin>,
    price: u128,
    fee_rate: u128,
) -> CoreResult<(u64, u64)> {
    let Some(bin) = active_bin else {
        return Ok((amount_x, amount_y));
    };
    if bin.liquidity_supply == 0 {
        return Ok((amount_x, amount_y));
    }

    let bin_liquidity = bin_liquidity_value(bin.amount_x, bin.amount_y, price)?;
    let in_liquidity = bin_liquidity_value(amount_x, amount_y, price)?;
    if bin_liquidity == 0 {
        return Ok((amount_x, amount_y));
    }

    let share = mul_div_u128(in_liquidity, bin.liquidity_supply, bin_liquidity, Rounding::Down)?;
    let new_supply = bin
        .liquidity_supply
        .checked_add(share)
        .ok_or(CoreError::MathOverflow)?;

    let owned_x = mul_div_u128(
        (bin.amount_x as u128) + (amount_x as u128),
        share,
        new_supply,
        Rounding::Down,
    )?;
    let owned_y = mul_div_u128(
        (bin.amount_y as u128) + (amount_y as u128),
        share,
        new_supply,
        Rounding::Down,
    )?;
    let mut owned_x = safe_cast_u128_to_u64(owned_x)?;
    let mut owned_y = safe_cast_u128_to_u64(owned_y)?;

    if owned_x > amount_x {
        let excess = owned_x - amount_x;
        let excess_value =
            safe_cast_u128_to_u64(mul_div_u128(excess as u128, price, ONE_Q64, Rounding::Up)?)?;
        let fee = composition_fee(excess_value, fee_rate)?;
        owned_y = owned_y.saturating_sub(fee);
    } else if owned_y > amount_y {
        let excess = owned_y - amount_y;
        let excess_value =
            safe_cast_u128_to_u64(mul_div_u128(excess as u128, ONE_Q64, price, Rounding::Up)?)?;
        let fee = composition_fee(excess_value, fee_rate)?;
        owned_x = owned_x.saturating_sub(fee);
    }

    Ok((owned_x, owned_y))
}

/// Quote-token value of a bin's holdings: `price * x + y`
fn bin_liquidity_value(amount_x: u64, amount_y: u64, price: u128) -> CoreResult<u128> {
    let x_value = mul_div_u128(amount_x as u128, price, ONE_Q64, Rounding::Down)?;
    x_value
        .checked_add(amount_y as u128)
        .ok_or(CoreError::MathOverflow)
}

// ============================================================================
// Settlement
// ============================================================================

fn settle(result: &mut SimulateRebalanceResult, width_delta: i64) -> CoreResult<()> {
    let outgoing_x = safe_add_u64(result.amount_x_withdrawn, result.claimed_fee_x)?;
    let outgoing_y = safe_add_u64(result.amount_y_withdrawn, result.claimed_fee_y)?;

    result.actual_amount_x_deposited = result.amount_x_deposited.saturating_sub(outgoing_x);
    result.actual_amount_x_withdrawn = outgoing_x.saturating_sub(result.amount_x_deposited);
    result.actual_amount_y_deposited = result.amount_y_deposited.saturating_sub(outgoing_y);
    result.actual_amount_y_withdrawn = outgoing_y.saturating_sub(result.amount_y_deposited);

    result.bin_count_delta = width_delta;
    result.rental_cost_lamports = rental_cost(width_delta);
    Ok(())
}

/// Signed lamports the width change costs: the difference in rent-exemption
/// minimums, paid on expansion and refunded on shrink
fn rental_cost(width_delta: i64) -> i64 {
    let bytes = width_delta.unsigned_abs() * POSITION_BIN_SIZE;
    let cost = (minimum_rent(bytes) - minimum_rent(0)) as i64;
    if width_delta < 0 {
        -cost
    } else {
        cost
    }
}

fn minimum_rent(bytes: u64) -> u64 {
    (ACCOUNT_STORAGE_OVERHEAD + bytes) * LAMPORTS_PER_BYTE_YEAR * RENT_EXEMPTION_YEARS
}

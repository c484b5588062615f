//! # Fee Model
//!
//! Base fee, variable (volatility) fee, their composition, and the
//! volatility reference/accumulator state machine. Fee amounts charged on
//! swap input always round up: the protocol never under-collects.
//!
//! Quotes never mutate the caller's pool state. The volatile half of the
//! parameters is `Copy`; the quote engine works on its own clone and the
//! state machine here takes `&mut` to whichever copy the caller owns.

use serde::{Deserialize, Serialize};

use crate::constants::{
    BASIS_POINT_MAX, FEE_PRECISION, MAX_FEE_RATE, VARIABLE_FEE_ROUNDING, VARIABLE_FEE_SCALE,
};
use crate::errors::{CoreError, CoreResult};
use crate::math::big_int::{mul_div_u128, Rounding};
use crate::math::safe_math::safe_cast_u128_to_u64;

/// Immutable per-epoch fee configuration owned by the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticFeeParams {
    /// Basis-point price increment between adjacent bins
    pub bin_step: u16,
    /// Scales the base fee component
    pub base_factor: u16,
    /// Seconds below which reference updates are filtered out
    pub filter_period: u16,
    /// Seconds past which the volatility reference decays to zero
    pub decay_period: u16,
    /// Basis points of accumulator carried into the reference on decay
    pub reduction_factor: u16,
    /// Scales the variable fee component; zero disables it
    pub variable_fee_control: u32,
    /// Upper bound for the volatility accumulator
    pub max_volatility_accumulator: u32,
    /// Basis points of collected fees routed to the protocol
    pub protocol_share: u16,
    /// Extra power-of-ten multiplier on the base fee
    pub base_fee_power_factor: u8,
}

/// Volatility tracking state, advanced once per bin crossed during a quote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolatileFeeParams {
    /// Current volatility accumulator, in bin-crossings times 10_000
    pub volatility_accumulator: u32,
    /// Decayed accumulator snapshot taken at the last reference update
    pub volatility_reference: u32,
    /// Active bin id at the last reference update
    pub index_reference: i32,
    /// Timestamp of the last reference update
    pub last_update_timestamp: i64,
}

// ============================================================================
// Fee Rates
// ============================================================================

/// Base fee rate in [`FEE_PRECISION`] units
pub fn base_fee_rate(params: &StaticFeeParams) -> CoreResult<u128> {
    let power = 10u128
        .checked_pow(params.base_fee_power_factor as u32)
        .ok_or(CoreError::MathOverflow)?;
    (params.base_factor as u128)
        .checked_mul(params.bin_step as u128)
        .and_then(|rate| rate.checked_mul(10))
        .and_then(|rate| rate.checked_mul(power))
        .ok_or(CoreError::MathOverflow)
}

/// Variable fee rate in [`FEE_PRECISION`] units, rounded up
pub fn variable_fee_rate(
    params: &StaticFeeParams,
    v_params: &VolatileFeeParams,
) -> CoreResult<u128> {
    if params.variable_fee_control == 0 {
        return Ok(0);
    }
    let vfa_bin = (v_params.volatility_accumulator as u128)
        .checked_mul(params.bin_step as u128)
        .ok_or(CoreError::MathOverflow)?;
    let scaled = vfa_bin
        .checked_mul(vfa_bin)
        .and_then(|square| square.checked_mul(params.variable_fee_control as u128))
        .ok_or(CoreError::MathOverflow)?;
    Ok((scaled + VARIABLE_FEE_ROUNDING) / VARIABLE_FEE_SCALE)
}

/// Total fee rate, capped at [`MAX_FEE_RATE`]
pub fn total_fee_rate(
    params: &StaticFeeParams,
    v_params: &VolatileFeeParams,
) -> CoreResult<u128> {
    let total = base_fee_rate(params)?
        .checked_add(variable_fee_rate(params, v_params)?)
        .ok_or(CoreError::MathOverflow)?;
    Ok(total.min(MAX_FEE_RATE as u128))
}

// ============================================================================
// Fee Amounts
// ============================================================================

/// Fee to add on top of a net (fee-exclusive) input amount, rounded up
pub fn fee_from_net_amount(amount: u64, total_fee_rate: u128) -> CoreResult<u64> {
    let denominator = (FEE_PRECISION as u128)
        .checked_sub(total_fee_rate)
        .ok_or(CoreError::MathUnderflow)?;
    let fee = mul_div_u128(amount as u128, total_fee_rate, denominator, Rounding::Up)?;
    safe_cast_u128_to_u64(fee)
}

/// Fee contained in a gross (fee-inclusive) input amount, rounded up
pub fn fee_from_gross_amount(amount: u64, total_fee_rate: u128) -> CoreResult<u64> {
    let fee = mul_div_u128(
        amount as u128,
        total_fee_rate,
        FEE_PRECISION as u128,
        Rounding::Up,
    )?;
    safe_cast_u128_to_u64(fee)
}

/// Protocol's share of a collected fee, rounded down
pub fn protocol_fee(fee: u64, protocol_share: u16) -> CoreResult<u64> {
    let share = mul_div_u128(
        fee as u128,
        protocol_share as u128,
        BASIS_POINT_MAX as u128,
        Rounding::Down,
    )?;
    safe_cast_u128_to_u64(share)
}

/// Fee charged on the implicitly swapped side of an unbalanced active-bin
/// deposit: `amount * rate * (FEE_PRECISION + rate) / FEE_PRECISION^2`
pub fn composition_fee(amount: u64, total_fee_rate: u128) -> CoreResult<u64> {
    let fee_precision = FEE_PRECISION as u128;
    let numerator = (amount as u128)
        .checked_mul(total_fee_rate)
        .and_then(|value| value.checked_mul(fee_precision + total_fee_rate))
        .ok_or(CoreError::MathOverflow)?;
    let fee = numerator / (fee_precision * fee_precision);
    safe_cast_u128_to_u64(fee)
}

// ============================================================================
// Volatility State Machine
// ============================================================================

/// Refresh the index and volatility references, once per quote, before any
/// bin is visited
pub fn update_references(
    params: &StaticFeeParams,
    v_params: &mut VolatileFeeParams,
    active_id: i32,
    current_timestamp: i64,
) {
    let elapsed = current_timestamp.saturating_sub(v_params.last_update_timestamp);
    if elapsed >= params.filter_period as i64 {
        v_params.index_reference = active_id;
        if elapsed < params.decay_period as i64 {
            let reduced = (v_params.volatility_accumulator as u64
                * params.reduction_factor as u64)
                / BASIS_POINT_MAX as u64;
            v_params.volatility_reference = reduced as u32;
        } else {
            v_params.volatility_reference = 0;
        }
    }
}

/// Advance the accumulator for a bin visit, before that bin's fee is
/// computed
pub fn update_volatility_accumulator(
    params: &StaticFeeParams,
    v_params: &mut VolatileFeeParams,
    active_id: i32,
) {
    let delta_id = (v_params.index_reference as i64 - active_id as i64).unsigned_abs();
    let accumulator =
        v_params.volatility_reference as u64 + delta_id * BASIS_POINT_MAX as u64;
    v_params.volatility_accumulator =
        accumulator.min(params.max_volatility_accumulator as u64) as u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> StaticFeeParams {
        StaticFeeParams {
            bin_step: 100,
            base_factor: 10_000,
            filter_period: 30,
            decay_period: 600,
            reduction_factor: 5_000,
            variable_fee_control: 0,
            max_volatility_accumulator: 350_000,
            protocol_share: 2_000,
            base_fee_power_factor: 0,
        }
    }

    #[test]
    fn test_base_fee_worked_example() {
        // 10_000 * 100 * 10 = 1e7 in FEE_PRECISION units, one percent
        assert_eq!(base_fee_rate(&params()).unwrap(), 10_000_000);
    }

    #[test]
    fn test_gross_fee_worked_example() {
        let rate = total_fee_rate(&params(), &VolatileFeeParams::default()).unwrap();
        assert_eq!(rate, 10_000_000);
        assert_eq!(fee_from_gross_amount(1_000_000, rate).unwrap(), 10_000);
    }

    #[test]
    fn test_fee_rounds_up() {
        // 3 * 1e7 / 1e9 = 0.03, charged as 1
        assert_eq!(fee_from_gross_amount(3, 10_000_000).unwrap(), 1);
        assert_eq!(fee_from_net_amount(3, 10_000_000).unwrap(), 1);
        assert_eq!(fee_from_gross_amount(0, 10_000_000).unwrap(), 0);
    }

    #[test]
    fn test_net_and_gross_fees_are_inverses() {
        let rate = 25_000_000u128; // 2.5%
        for amount in [1_000u64, 999_999, 123_456_789] {
            let fee = fee_from_net_amount(amount, rate).unwrap();
            let gross = amount + fee;
            let recovered = fee_from_gross_amount(gross, rate).unwrap();
            // Inverses up to the opposing rounding directions
            assert!(recovered.abs_diff(fee) <= 1, "amount {}", amount);
        }
    }

    #[test]
    fn test_total_fee_capped() {
        let mut p = params();
        p.base_factor = u16::MAX;
        p.bin_step = u16::MAX;
        p.base_fee_power_factor = 2;
        assert_eq!(
            total_fee_rate(&p, &VolatileFeeParams::default()).unwrap(),
            MAX_FEE_RATE as u128
        );
    }

    #[test]
    fn test_variable_fee_rounds_up() {
        let mut p = params();
        p.variable_fee_control = 10_000;
        let v = VolatileFeeParams {
            volatility_accumulator: 10_000,
            ..Default::default()
        };
        // (10_000 * 100)^2 * 10_000 / 1e11 = 1e16 / 1e11 = 1e5, exact
        assert_eq!(variable_fee_rate(&p, &v).unwrap(), 100_000);
        // One unit of accumulator forces the ceiling up
        let v = VolatileFeeParams {
            volatility_accumulator: 10_001,
            ..Default::default()
        };
        let exact_floor = {
            let vfa = 10_001u128 * 100;
            vfa * vfa * 10_000 / VARIABLE_FEE_SCALE
        };
        assert_eq!(variable_fee_rate(&p, &v).unwrap(), exact_floor + 1);
    }

    #[test]
    fn test_protocol_fee_rounds_down() {
        assert_eq!(protocol_fee(999, 2_000).unwrap(), 199);
        assert_eq!(protocol_fee(0, 2_000).unwrap(), 0);
    }

    #[test]
    fn test_reference_update_filter_and_decay() {
        let p = params();
        let mut v = VolatileFeeParams {
            volatility_accumulator: 100_000,
            volatility_reference: 0,
            index_reference: 5,
            last_update_timestamp: 1_000,
        };

        // Inside the filter period nothing moves
        update_references(&p, &mut v, 40, 1_010);
        assert_eq!(v.index_reference, 5);
        assert_eq!(v.volatility_reference, 0);

        // Past the filter, inside the decay window: reference decays
        update_references(&p, &mut v, 40, 1_100);
        assert_eq!(v.index_reference, 40);
        assert_eq!(v.volatility_reference, 50_000);

        // Past the decay window: reference resets
        v.volatility_accumulator = 100_000;
        update_references(&p, &mut v, 41, 2_000);
        assert_eq!(v.index_reference, 41);
        assert_eq!(v.volatility_reference, 0);
    }

    #[test]
    fn test_accumulator_caps_at_maximum() {
        let p = params();
        let mut v = VolatileFeeParams {
            volatility_reference: 10_000,
            index_reference: 0,
            ..Default::default()
        };
        update_volatility_accumulator(&p, &mut v, 3);
        assert_eq!(v.volatility_accumulator, 40_000);

        update_volatility_accumulator(&p, &mut v, 500);
        assert_eq!(v.volatility_accumulator, p.max_volatility_accumulator);
    }
}

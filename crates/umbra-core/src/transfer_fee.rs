//! # Transfer-Fee Adjustment
//!
//! Tokens with an on-transfer fee deliver less than was sent. The quote
//! engine works in pool-side amounts; these helpers convert between the
//! wallet-side and pool-side views before and after the core math. The fee
//! schedule itself comes from the token program's config account, supplied
//! by the caller.

use serde::{Deserialize, Serialize};

use crate::bin_array::BinSource;
use crate::constants::BASIS_POINT_MAX;
use crate::errors::{CoreError, CoreResult};
use crate::math::big_int::{mul_div_u64, Rounding};
use crate::math::safe_math::{safe_add_u64, safe_sub_u64};
use crate::quote::{swap_quote_exact_in, PoolSnapshot, QuoteOptions, SwapQuote};

/// One token's transfer-fee schedule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFeeParams {
    /// Fee charged on every transfer, in basis points
    pub transfer_fee_bps: u16,
    /// Absolute cap on the fee per transfer
    pub maximum_fee: u64,
}

impl TransferFeeParams {
    /// Fee withheld from a transfer of `amount`
    pub fn fee(&self, amount: u64) -> CoreResult<u64> {
        if self.transfer_fee_bps == 0 {
            return Ok(0);
        }
        let fee = mul_div_u64(
            amount,
            self.transfer_fee_bps as u64,
            BASIS_POINT_MAX as u64,
            Rounding::Up,
        )?;
        Ok(fee.min(self.maximum_fee))
    }
}

/// Amount actually delivered when `amount` is sent
pub fn fee_excluded_amount(params: Option<&TransferFeeParams>, amount: u64) -> CoreResult<u64> {
    match params {
        None => Ok(amount),
        Some(params) => safe_sub_u64(amount, params.fee(amount)?),
    }
}

/// Amount to send so that `amount` is delivered
pub fn fee_included_amount(params: Option<&TransferFeeParams>, amount: u64) -> CoreResult<u64> {
    let Some(params) = params else {
        return Ok(amount);
    };
    if params.transfer_fee_bps == 0 {
        return Ok(amount);
    }
    if params.transfer_fee_bps as u32 >= BASIS_POINT_MAX {
        return Err(CoreError::InvalidParameter);
    }

    let gross = mul_div_u64(
        amount,
        BASIS_POINT_MAX as u64,
        (BASIS_POINT_MAX as u16 - params.transfer_fee_bps) as u64,
        Rounding::Up,
    )?;
    // Once the per-transfer cap binds, the fee is a flat add-on
    if params.fee(gross)? >= params.maximum_fee {
        safe_add_u64(amount, params.maximum_fee)
    } else {
        Ok(gross)
    }
}

/// Transfer-fee schedules for both pool tokens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairTransferFee {
    pub x: Option<TransferFeeParams>,
    pub y: Option<TransferFeeParams>,
}

impl PairTransferFee {
    fn input_side(&self, swap_for_y: bool) -> Option<&TransferFeeParams> {
        if swap_for_y {
            self.x.as_ref()
        } else {
            self.y.as_ref()
        }
    }

    fn output_side(&self, swap_for_y: bool) -> Option<&TransferFeeParams> {
        if swap_for_y {
            self.y.as_ref()
        } else {
            self.x.as_ref()
        }
    }
}

/// Exact-in quote in wallet-side amounts: the input is reduced by its
/// transfer fee before the pool math, and the output side reports what the
/// wallet will actually receive
pub fn swap_quote_exact_in_net_of_transfer_fee<B: BinSource>(
    pool: &PoolSnapshot,
    bins: &B,
    amount_in: u64,
    swap_for_y: bool,
    options: &QuoteOptions,
    transfer_fee: &PairTransferFee,
) -> CoreResult<SwapQuote> {
    let pool_side_in = fee_excluded_amount(transfer_fee.input_side(swap_for_y), amount_in)?;
    let mut quote = swap_quote_exact_in(pool, bins, pool_side_in, swap_for_y, options)?;

    let out_side = transfer_fee.output_side(swap_for_y);
    quote.out_amount = fee_excluded_amount(out_side, quote.out_amount)?;
    quote.min_out_amount = fee_excluded_amount(out_side, quote.min_out_amount)?;
    quote.consumed_in_amount =
        fee_included_amount(transfer_fee.input_side(swap_for_y), quote.consumed_in_amount)?;
    Ok(quote)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_rounds_up_and_caps() {
        let params = TransferFeeParams {
            transfer_fee_bps: 250,
            maximum_fee: 20,
        };
        // 2.5% of 999 is 24.975, capped at 20
        assert_eq!(params.fee(999).unwrap(), 20);
        let params = TransferFeeParams {
            transfer_fee_bps: 250,
            maximum_fee: u64::MAX,
        };
        assert_eq!(params.fee(999).unwrap(), 25);
    }

    #[test]
    fn test_included_inverts_excluded() {
        let params = TransferFeeParams {
            transfer_fee_bps: 300,
            maximum_fee: u64::MAX,
        };
        for net in [1u64, 97, 10_000, 123_456_789] {
            let gross = fee_included_amount(Some(&params), net).unwrap();
            let delivered = fee_excluded_amount(Some(&params), gross).unwrap();
            assert!(delivered >= net, "undershoot for net {}", net);
            assert!(delivered - net <= 1, "overshoot for net {}", net);
        }
    }

    #[test]
    fn test_no_schedule_is_identity() {
        assert_eq!(fee_excluded_amount(None, 500).unwrap(), 500);
        assert_eq!(fee_included_amount(None, 500).unwrap(), 500);
    }

    #[test]
    fn test_quote_adjusts_both_legs() {
        use crate::bin_array::{Bin, BinMap};
        use crate::fees::{StaticFeeParams, VolatileFeeParams};

        let pool = PoolSnapshot {
            active_id: 0,
            parameters: StaticFeeParams {
                bin_step: 100,
                base_factor: 0,
                filter_period: 30,
                decay_period: 600,
                reduction_factor: 5_000,
                variable_fee_control: 0,
                max_volatility_accumulator: 350_000,
                protocol_share: 0,
                base_fee_power_factor: 0,
            },
            v_parameters: VolatileFeeParams::default(),
            current_timestamp: 1_700_000_000,
        };
        let bins = BinMap::from_bins([Bin::new(0, 100, 0, 100_000)]);

        // 1% transfer fee on the input token only
        let transfer_fee = PairTransferFee {
            x: Some(TransferFeeParams {
                transfer_fee_bps: 100,
                maximum_fee: u64::MAX,
            }),
            y: None,
        };
        let quote = swap_quote_exact_in_net_of_transfer_fee(
            &pool,
            &bins,
            10_000,
            true,
            &QuoteOptions::default(),
            &transfer_fee,
        )
        .unwrap();

        // 100 withheld on transfer, the pool sees 9_900
        assert_eq!(quote.out_amount, 9_900);
        assert_eq!(quote.consumed_in_amount, 10_000);
    }
}

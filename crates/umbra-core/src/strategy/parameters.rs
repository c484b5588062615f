//! # Strategy Parameters
//!
//! Base amount and per-bin increment for each token side, defined relative
//! to the active bin. Values are signed in memory; the wire form encodes
//! magnitudes plus a sign bit-flag because redeposits can legitimately
//! produce negative increments.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult};

/// Sign flag bit for a negative `x0`
pub const X0_NEGATIVE: u8 = 1 << 0;
/// Sign flag bit for a negative `y0`
pub const Y0_NEGATIVE: u8 = 1 << 1;
/// Sign flag bit for a negative `delta_x`
pub const DELTA_X_NEGATIVE: u8 = 1 << 2;
/// Sign flag bit for a negative `delta_y`
pub const DELTA_Y_NEGATIVE: u8 = 1 << 3;

/// Per-bin liquidity distribution parameters
///
/// Bins on the bid side hold `y0 + delta_y * (active_id - bin_id)` of token
/// Y; bins on the ask side hold `(x0 + delta_x * (bin_id - active_id))`
/// of quote-token value, converted to token X through the inverse price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityStrategyParameters {
    pub x0: i64,
    pub y0: i64,
    pub delta_x: i64,
    pub delta_y: i64,
}

impl LiquidityStrategyParameters {
    pub const ZERO: Self = Self {
        x0: 0,
        y0: 0,
        delta_x: 0,
        delta_y: 0,
    };
}

/// Wire form of [`LiquidityStrategyParameters`] for on-chain transmission
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct EncodedStrategyParameters {
    pub x0: u64,
    pub y0: u64,
    pub delta_x: u64,
    pub delta_y: u64,
    /// Bit 0 = x0 negative, bit 1 = y0 negative, bit 2 = delta_x negative,
    /// bit 3 = delta_y negative
    pub sign_flags: u8,
}

impl From<LiquidityStrategyParameters> for EncodedStrategyParameters {
    fn from(params: LiquidityStrategyParameters) -> Self {
        let mut sign_flags = 0u8;
        if params.x0 < 0 {
            sign_flags |= X0_NEGATIVE;
        }
        if params.y0 < 0 {
            sign_flags |= Y0_NEGATIVE;
        }
        if params.delta_x < 0 {
            sign_flags |= DELTA_X_NEGATIVE;
        }
        if params.delta_y < 0 {
            sign_flags |= DELTA_Y_NEGATIVE;
        }
        Self {
            x0: params.x0.unsigned_abs(),
            y0: params.y0.unsigned_abs(),
            delta_x: params.delta_x.unsigned_abs(),
            delta_y: params.delta_y.unsigned_abs(),
            sign_flags,
        }
    }
}

impl TryFrom<EncodedStrategyParameters> for LiquidityStrategyParameters {
    type Error = CoreError;

    fn try_from(encoded: EncodedStrategyParameters) -> CoreResult<Self> {
        Ok(Self {
            x0: decode_magnitude(encoded.x0, encoded.sign_flags & X0_NEGATIVE != 0)?,
            y0: decode_magnitude(encoded.y0, encoded.sign_flags & Y0_NEGATIVE != 0)?,
            delta_x: decode_magnitude(encoded.delta_x, encoded.sign_flags & DELTA_X_NEGATIVE != 0)?,
            delta_y: decode_magnitude(encoded.delta_y, encoded.sign_flags & DELTA_Y_NEGATIVE != 0)?,
        })
    }
}

fn decode_magnitude(magnitude: u64, negative: bool) -> CoreResult<i64> {
    if negative {
        if magnitude > i64::MIN.unsigned_abs() {
            return Err(CoreError::ConversionError);
        }
        Ok((magnitude as i64).wrapping_neg())
    } else {
        i64::try_from(magnitude).map_err(|_| CoreError::ConversionError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_flag_round_trip() {
        let params = LiquidityStrategyParameters {
            x0: 120,
            y0: -45,
            delta_x: -3,
            delta_y: 7,
        };
        let encoded = EncodedStrategyParameters::from(params);
        assert_eq!(encoded.sign_flags, Y0_NEGATIVE | DELTA_X_NEGATIVE);
        assert_eq!(encoded.y0, 45);

        let decoded = LiquidityStrategyParameters::try_from(encoded).unwrap();
        assert_eq!(decoded, params);
    }

    #[test]
    fn test_decode_rejects_oversized_magnitude() {
        let encoded = EncodedStrategyParameters {
            x0: u64::MAX,
            ..Default::default()
        };
        assert_eq!(
            LiquidityStrategyParameters::try_from(encoded),
            Err(CoreError::ConversionError)
        );
    }

    #[test]
    fn test_borsh_round_trip() {
        let encoded = EncodedStrategyParameters {
            x0: 1,
            y0: 2,
            delta_x: 3,
            delta_y: 4,
            sign_flags: DELTA_Y_NEGATIVE,
        };
        let bytes = encoded.try_to_vec().unwrap();
        let back = EncodedStrategyParameters::try_from_slice(&bytes).unwrap();
        assert_eq!(back, encoded);
    }
}

//! # Position Ledger
//!
//! Per-bin accounting for a held position. The ledger is ordered by bin id
//! and contiguous over its range; the rebalance simulator's resize phase
//! maintains that invariant.

use serde::{Deserialize, Serialize};

use crate::constants::NUM_REWARDS;
use crate::errors::CoreResult;
use crate::math::safe_math::safe_add_u64;

/// One bin of a position's holdings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionBinData {
    pub bin_id: i32,
    /// Q64.64 price at this bin
    pub price: u128,
    pub amount_x: u64,
    pub amount_y: u64,
    pub claimable_fee_x: u64,
    pub claimable_fee_y: u64,
    pub claimable_rewards: [u64; NUM_REWARDS],
}

impl PositionBinData {
    /// Whether any balance, fee, or reward remains in this bin
    pub fn has_residual_value(&self) -> bool {
        self.amount_x != 0
            || self.amount_y != 0
            || self.claimable_fee_x != 0
            || self.claimable_fee_y != 0
            || self.claimable_rewards.iter().any(|reward| *reward != 0)
    }
}

/// Total token amounts held across the ledger
pub fn position_total_amounts(bins: &[PositionBinData]) -> CoreResult<(u64, u64)> {
    let mut total_x = 0u64;
    let mut total_y = 0u64;
    for bin in bins {
        total_x = safe_add_u64(total_x, bin.amount_x)?;
        total_y = safe_add_u64(total_y, bin.amount_y)?;
    }
    Ok((total_x, total_y))
}

/// Total claimable fees across the ledger
pub fn position_claimable_fees(bins: &[PositionBinData]) -> CoreResult<(u64, u64)> {
    let mut fee_x = 0u64;
    let mut fee_y = 0u64;
    for bin in bins {
        fee_x = safe_add_u64(fee_x, bin.claimable_fee_x)?;
        fee_y = safe_add_u64(fee_y, bin.claimable_fee_y)?;
    }
    Ok((fee_x, fee_y))
}

/// Check the ordered-contiguous invariant
pub fn is_contiguous(bins: &[PositionBinData]) -> bool {
    bins.windows(2)
        .all(|pair| pair[1].bin_id == pair[0].bin_id + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_residual_value_detection() {
        let mut bin = PositionBinData::default();
        assert!(!bin.has_residual_value());
        bin.claimable_rewards[1] = 1;
        assert!(bin.has_residual_value());
    }

    #[test]
    fn test_ledger_sums() {
        let bins = vec![
            PositionBinData {
                bin_id: 0,
                amount_x: 10,
                claimable_fee_y: 3,
                ..Default::default()
            },
            PositionBinData {
                bin_id: 1,
                amount_x: 5,
                amount_y: 7,
                ..Default::default()
            },
        ];
        assert_eq!(position_total_amounts(&bins).unwrap(), (15, 7));
        assert_eq!(position_claimable_fees(&bins).unwrap(), (0, 3));
        assert!(is_contiguous(&bins));
    }
}

//! # Strategy Conservation Properties
//!
//! Property tests for the price engine and the distribution solvers: the
//! placed totals never overshoot the request and land within the range's
//! bin count of it, and bin prices stay strictly monotonic.

use proptest::prelude::*;

use umbra_core::constants::ONE_Q64;
use umbra_core::math::{mul_shift_right_64, pow, price_at_bin};
use umbra_core::strategy::{
    build_liquidity_strategy_parameters, to_amount_ask_side, to_amount_bid_side,
    LiquidityStrategyKind,
};

fn strategies() -> impl Strategy<Value = LiquidityStrategyKind> {
    prop_oneof![
        Just(LiquidityStrategyKind::Spot),
        Just(LiquidityStrategyKind::Curve),
        Just(LiquidityStrategyKind::BidAsk),
    ]
}

proptest! {
    #[test]
    fn price_is_strictly_monotonic(
        bin_step in 1u16..=100,
        bin_id in -3_000i32..3_000,
    ) {
        let here = price_at_bin(bin_id, bin_step);
        let above = price_at_bin(bin_id + 1, bin_step);
        prop_assert!(here < above);
    }

    #[test]
    fn pow_inverse_identity_holds(
        bin_step in 1u16..=100,
        exponent in 1i32..2_000,
    ) {
        let base = ONE_Q64 + ((bin_step as u128) << 64) / 10_000;
        let up = pow(base, exponent);
        let down = pow(base, -exponent);
        let product = mul_shift_right_64(up, down);
        // Within rounding drift of 1.0
        prop_assert!(product.abs_diff(ONE_Q64) < ONE_Q64 >> 24);
    }

    #[test]
    fn bid_side_total_never_overshoots(
        kind in strategies(),
        amount in 0u64..2_000_000_000,
        min_delta in -48i32..=0,
    ) {
        let params = build_liquidity_strategy_parameters(
            0, amount, min_delta, 0, 100, false, 0, kind,
        ).unwrap();
        let amounts = to_amount_bid_side(0, min_delta, 0, params.y0, params.delta_y).unwrap();
        let total: u128 = amounts.iter().map(|a| a.amount_y as u128).sum();
        let bin_count = (-min_delta + 1) as u128;

        prop_assert!(total <= amount as u128);
        prop_assert!(amount as u128 - total <= bin_count);
    }

    #[test]
    fn ask_side_total_never_overshoots(
        kind in strategies(),
        amount in 0u64..2_000_000_000,
        max_delta in 0i32..=48,
    ) {
        let params = build_liquidity_strategy_parameters(
            amount, 0, 0, max_delta, 100, false, 0, kind,
        ).unwrap();
        let amounts = to_amount_ask_side(0, 0, max_delta, params.x0, params.delta_x, 100).unwrap();
        let total: u128 = amounts.iter().map(|a| a.amount_x as u128).sum();
        let bin_count = (max_delta + 1) as u128;

        prop_assert!(total <= amount as u128);
        prop_assert!(amount as u128 - total <= bin_count);
    }

    #[test]
    fn two_sided_split_conserves_both_tokens(
        kind in strategies(),
        amount_x in 1u64..1_000_000_000,
        amount_y in 1u64..1_000_000_000,
        min_delta in -24i32..=-1,
        max_delta in 1i32..=24,
        favor_x in any::<bool>(),
    ) {
        let params = build_liquidity_strategy_parameters(
            amount_x, amount_y, min_delta, max_delta, 100, favor_x, 0, kind,
        ).unwrap();

        let (bid_end, ask_start) = if favor_x { (-1, 0) } else { (0, 1) };
        let bid = to_amount_bid_side(0, min_delta, bid_end, params.y0, params.delta_y).unwrap();
        let ask = to_amount_ask_side(0, ask_start, max_delta, params.x0, params.delta_x, 100).unwrap();

        let total_y: u128 = bid.iter().map(|a| a.amount_y as u128).sum();
        let total_x: u128 = ask.iter().map(|a| a.amount_x as u128).sum();
        let bid_count = (bid_end - min_delta + 1) as u128;
        let ask_count = (max_delta - ask_start + 1) as u128;

        prop_assert!(total_y <= amount_y as u128);
        prop_assert!(amount_y as u128 - total_y <= bid_count);
        prop_assert!(total_x <= amount_x as u128);
        prop_assert!(amount_x as u128 - total_x <= ask_count);
    }
}

#[test]
fn correction_loops_stay_within_bin_count_iterations() {
    // The nudge loops probe the totals at most a small multiple of the bin
    // count before settling; a pathological amount must still terminate
    // and respect the conservation bound.
    for amount in [1u64, 2, u32::MAX as u64, u32::MAX as u64 + 17] {
        for kind in [
            LiquidityStrategyKind::Spot,
            LiquidityStrategyKind::Curve,
            LiquidityStrategyKind::BidAsk,
        ] {
            let params =
                build_liquidity_strategy_parameters(amount, 0, 0, 60, 25, false, 0, kind)
                    .unwrap();
            let amounts =
                to_amount_ask_side(0, 0, 60, params.x0, params.delta_x, 25).unwrap();
            let total: u128 = amounts.iter().map(|a| a.amount_x as u128).sum();
            assert!(total <= amount as u128);
            assert!(amount as u128 - total <= 61);
        }
    }
}

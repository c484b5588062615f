//! # Umbra Core
//!
//! Off-chain computation core for the Umbra bin-liquidity exchange. The
//! crate reproduces, bit for bit where it matters, the arithmetic the
//! on-chain program enforces, so clients can quote swaps, size deposits,
//! and simulate rebalances without submitting a transaction:
//!
//! - Q64.64 bin pricing and exponentiation ([`math::bin_price`])
//! - the dynamic fee and volatility state machine ([`fees`])
//! - exact-in / exact-out swap quoting with partial fill ([`quote`])
//! - Spot / Curve / BidAsk liquidity distribution solvers ([`strategy`])
//! - the withdraw-resize-deposit rebalance simulator ([`rebalance`])
//!
//! Everything is a pure function of supplied account snapshots. Network
//! access, address derivation, and transaction assembly live in the client
//! layers above this crate.

pub mod bin_array;
pub mod constants;
pub mod errors;
pub mod fees;
pub mod math;
pub mod position;
pub mod quote;
pub mod rebalance;
pub mod strategy;
pub mod transfer_fee;

pub use bin_array::{Bin, BinMap, BinSource};
pub use errors::{CoreError, CoreResult};
pub use fees::{StaticFeeParams, VolatileFeeParams};
pub use position::PositionBinData;
pub use quote::{
    swap_quote_exact_in, swap_quote_exact_out, PoolSnapshot, QuoteOptions, SwapQuote,
    SwapQuoteExactOut,
};
pub use rebalance::{simulate_rebalance, RebalanceDepositParam, RebalanceWithdrawParam};
pub use strategy::{
    build_liquidity_strategy_parameters, LiquidityStrategyKind, LiquidityStrategyParameters,
};

//! # Core Error Types
//!
//! All failures in this crate are synchronous `Result` values. Arithmetic
//! edge cases that correspond to real on-chain states (exponent overflow in
//! `pow`, zero total weight) resolve to defined zero values instead of
//! erroring; everything else surfaces here.

use thiserror::Error;

/// Errors produced by the computation core
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    // ========================================================================
    // Math Errors
    // ========================================================================
    #[error("Math overflow")]
    MathOverflow,

    #[error("Math underflow")]
    MathUnderflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Mul div overflow")]
    MulDivOverflow,

    #[error("Conversion error")]
    ConversionError,

    // ========================================================================
    // Validation Errors
    // ========================================================================
    #[error("Invalid parameter")]
    InvalidParameter,

    #[error("Invalid bps")]
    InvalidBps,

    #[error("Invalid minBinId or maxBinId")]
    InvalidBinRange,

    #[error("Overlap withdraw bin range")]
    OverlapWithdrawRange,

    #[error("Invalid minDeltaId or maxDeltaId")]
    InvalidDeltaRange,

    #[error("Overlap deposit bin range")]
    OverlapDepositRange,

    #[error("No rebalance action")]
    NoRebalanceAction,

    // ========================================================================
    // Liquidity Errors
    // ========================================================================
    #[error("Insufficient liquidity")]
    InsufficientLiquidity,
}

/// Result type using core errors
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            format!("{}", CoreError::InvalidBinRange),
            "Invalid minBinId or maxBinId"
        );
        assert_eq!(
            format!("{}", CoreError::OverlapDepositRange),
            "Overlap deposit bin range"
        );
        assert_eq!(
            format!("{}", CoreError::NoRebalanceAction),
            "No rebalance action"
        );
    }
}

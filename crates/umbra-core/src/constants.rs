//! # Protocol Constants
//!
//! Numeric contract shared with the on-chain exchange program. These values
//! must match the program exactly; changing any of them desynchronizes the
//! off-chain math from the ledger's bookkeeping.

// ============================================================================
// Fixed-Point Scale
// ============================================================================

/// Q64.64 fixed-point scale factor: 2^64
pub const ONE_Q64: u128 = 1u128 << 64;

/// Exponent magnitude at which `pow` saturates to zero
pub const MAX_POW_EXPONENT: u32 = 1 << 20;

// ============================================================================
// Fees
// ============================================================================

/// Basis points denominator (10,000 = 100%)
pub const BASIS_POINT_MAX: u32 = 10_000;

/// Fee rate precision (1e9 = 100%)
pub const FEE_PRECISION: u64 = 1_000_000_000;

/// Pool-wide fee ceiling, 10% in [`FEE_PRECISION`] units
pub const MAX_FEE_RATE: u64 = 100_000_000;

/// Divisor bringing the squared volatility term back to fee precision
pub const VARIABLE_FEE_SCALE: u128 = 100_000_000_000;

/// Round-up bias applied before dividing by [`VARIABLE_FEE_SCALE`]
pub const VARIABLE_FEE_ROUNDING: u128 = 99_999_999_999;

// ============================================================================
// Bin Arrays
// ============================================================================

/// Bins per on-chain bin array account
pub const BIN_ARRAY_SIZE: i32 = 70;

/// Array indexes inside `[-512, 511]` are covered by the pool's default
/// bitmap; anything beyond needs the bitmap extension account.
pub const BIN_ARRAY_BITMAP_SIZE: i32 = 512;

/// Cap on the informational extra bin arrays a quote may enumerate
pub const MAX_EXTRA_BIN_ARRAYS: u8 = 3;

// ============================================================================
// Positions and Rent
// ============================================================================

/// Reward slots tracked per position bin
pub const NUM_REWARDS: usize = 2;

/// Serialized size of one position bin ledger entry
pub const POSITION_BIN_SIZE: u64 = 112;

/// Ledger rent schedule: lamports charged per byte-year
pub const LAMPORTS_PER_BYTE_YEAR: u64 = 3_480;

/// Years of rent an account must hold to be exemption-eligible
pub const RENT_EXEMPTION_YEARS: u64 = 2;

/// Byte overhead the ledger adds to every account's stored size
pub const ACCOUNT_STORAGE_OVERHEAD: u64 = 128;

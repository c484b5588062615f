//! # Math
//!
//! Fixed-point and wide-integer arithmetic. Everything in the core stays in
//! integers; the only floating point lives in the presentation helpers of
//! [`bin_price`].

pub mod big_int;
pub mod bin_price;
pub mod safe_math;

pub use big_int::{mul_div_u128, mul_div_u64, mul_shift_right_64, Rounding, U256};
pub use bin_price::{inverse_price_base, pow, price_at_bin};

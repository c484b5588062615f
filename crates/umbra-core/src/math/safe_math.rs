//! # Safe Math Operations
//!
//! Overflow-checked arithmetic used throughout the core.

use crate::errors::{CoreError, CoreResult};

/// Macro to generate safe arithmetic functions
macro_rules! safe_arith {
    // Binary operations with checked methods
    ($fn_name:ident, $type:ty, $checked_method:ident, $error:expr) => {
        /// Checked arithmetic, erroring on overflow or underflow
        pub fn $fn_name(a: $type, b: $type) -> CoreResult<$type> {
            a.$checked_method(b).ok_or($error)
        }
    };

    // Division operations with zero check
    (div, $fn_name:ident, $type:ty) => {
        /// Safe division with zero check
        pub fn $fn_name(a: $type, b: $type) -> CoreResult<$type> {
            if b == 0 {
                return Err(CoreError::DivisionByZero);
            }
            Ok(a / b)
        }
    };

    // Narrowing casts with a max check
    (cast_max, $fn_name:ident, $from_type:ty, $to_type:ty, $max_val:expr) => {
        /// Safe narrowing cast
        pub fn $fn_name(value: $from_type) -> CoreResult<$to_type> {
            if value > $max_val {
                return Err(CoreError::ConversionError);
            }
            Ok(value as $to_type)
        }
    };

    // Narrowing casts with both bounds checked
    (cast, $fn_name:ident, $from_type:ty, $to_type:ty, $max_val:expr, $min_val:expr) => {
        /// Safe narrowing cast
        pub fn $fn_name(value: $from_type) -> CoreResult<$to_type> {
            if value > $max_val || value < $min_val {
                return Err(CoreError::ConversionError);
            }
            Ok(value as $to_type)
        }
    };
}

safe_arith!(safe_add_u64, u64, checked_add, CoreError::MathOverflow);
safe_arith!(safe_sub_u64, u64, checked_sub, CoreError::MathUnderflow);
safe_arith!(safe_mul_u64, u64, checked_mul, CoreError::MathOverflow);
safe_arith!(div, safe_div_u64, u64);

safe_arith!(safe_add_u128, u128, checked_add, CoreError::MathOverflow);
safe_arith!(safe_sub_u128, u128, checked_sub, CoreError::MathUnderflow);
safe_arith!(safe_mul_u128, u128, checked_mul, CoreError::MathOverflow);
safe_arith!(div, safe_div_u128, u128);

safe_arith!(safe_add_i64, i64, checked_add, CoreError::MathOverflow);
safe_arith!(safe_sub_i64, i64, checked_sub, CoreError::MathUnderflow);
safe_arith!(safe_mul_i64, i64, checked_mul, CoreError::MathOverflow);

safe_arith!(safe_add_i32, i32, checked_add, CoreError::MathOverflow);
safe_arith!(safe_sub_i32, i32, checked_sub, CoreError::MathUnderflow);

safe_arith!(cast_max, safe_cast_u128_to_u64, u128, u64, u64::MAX as u128);
safe_arith!(cast, safe_cast_i128_to_u64, i128, u64, u64::MAX as i128, 0);
safe_arith!(cast, safe_cast_i128_to_i64, i128, i64, i64::MAX as i128, i64::MIN as i128);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_ops() {
        assert_eq!(safe_add_u64(1, 2).unwrap(), 3);
        assert_eq!(safe_sub_u64(1, 2), Err(CoreError::MathUnderflow));
        assert_eq!(safe_mul_u128(u128::MAX, 2), Err(CoreError::MathOverflow));
        assert_eq!(safe_div_u64(10, 0), Err(CoreError::DivisionByZero));
    }

    #[test]
    fn test_narrowing_casts() {
        assert_eq!(safe_cast_u128_to_u64(42).unwrap(), 42);
        assert_eq!(
            safe_cast_u128_to_u64(u64::MAX as u128 + 1),
            Err(CoreError::ConversionError)
        );
        assert_eq!(
            safe_cast_i128_to_u64(-1),
            Err(CoreError::ConversionError)
        );
    }
}

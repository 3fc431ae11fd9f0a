//! # Checked Arithmetic
//!
//! Every amount in Reservoir is a `u64` in the asset's smallest unit, and
//! every operation on those amounts goes through this module. Each helper
//! has exactly one way to fail, named by [`MathError`].
//!
//! Multiplications that feed a division are performed in `u128` so that
//! `a * b / c` only fails when the *result* does not fit, not when the
//! intermediate product does.

use thiserror::Error;

/// Failure conditions of the checked arithmetic helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    /// The result does not fit in the target integer width.
    #[error("arithmetic overflow")]
    Overflow,

    /// A subtraction would go below zero.
    #[error("arithmetic underflow")]
    Underflow,

    /// A division (or mul-div) by zero.
    #[error("division by zero")]
    DivisionByZero,
}

/// `a + b`, failing on overflow.
pub fn add(a: u64, b: u64) -> Result<u64, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

/// `a - b`, failing when `b > a`.
pub fn sub(a: u64, b: u64) -> Result<u64, MathError> {
    a.checked_sub(b).ok_or(MathError::Underflow)
}

/// `a * b`, failing on overflow.
pub fn mul(a: u64, b: u64) -> Result<u64, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

/// `a / b` (floor), failing when `b == 0`.
pub fn div(a: u64, b: u64) -> Result<u64, MathError> {
    a.checked_div(b).ok_or(MathError::DivisionByZero)
}

/// `floor(value * numerator / denominator)` with a `u128` intermediate.
pub fn mul_div(value: u64, numerator: u64, denominator: u64) -> Result<u64, MathError> {
    let wide = mul_div_wide(value as u128, numerator as u128, denominator as u128)?;
    u64::try_from(wide).map_err(|_| MathError::Overflow)
}

/// `floor(value * numerator / denominator)` entirely in `u128`.
///
/// Used by the risk engine, whose USD figures and health factors are
/// carried at `u128` width.
pub fn mul_div_wide(value: u128, numerator: u128, denominator: u128) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = value.checked_mul(numerator).ok_or(MathError::Overflow)?;
    Ok(product / denominator)
}

/// `base ^ exp`, failing on overflow.
pub fn pow(base: u64, exp: u32) -> Result<u64, MathError> {
    base.checked_pow(exp).ok_or(MathError::Overflow)
}

/// Integer square root, rounded down. Never fails.
pub fn sqrt(value: u64) -> u64 {
    if value < 2 {
        return value;
    }
    // Newton iteration from an upper bound; converges monotonically downward.
    let mut x = value;
    let mut y = x / 2 + x % 2;
    while y < x {
        x = y;
        y = (x + value / x) / 2;
    }
    x
}

/// `floor(amount * bps / 10_000)`.
pub fn bps_of(amount: u64, bps: u64) -> Result<u64, MathError> {
    mul_div(amount, bps, crate::config::BPS_DENOMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_sub_report_their_own_failures() {
        assert_eq!(add(2, 3), Ok(5));
        assert_eq!(add(u64::MAX, 1), Err(MathError::Overflow));
        assert_eq!(sub(5, 3), Ok(2));
        assert_eq!(sub(3, 5), Err(MathError::Underflow));
    }

    #[test]
    fn mul_and_div() {
        assert_eq!(mul(7, 6), Ok(42));
        assert_eq!(mul(u64::MAX, 2), Err(MathError::Overflow));
        assert_eq!(div(7, 2), Ok(3));
        assert_eq!(div(7, 0), Err(MathError::DivisionByZero));
    }

    #[test]
    fn mul_div_floors() {
        assert_eq!(mul_div(100, 1, 3), Ok(33));
        assert_eq!(mul_div(100, 3, 2), Ok(150));
        assert_eq!(mul_div(1, 1, 0), Err(MathError::DivisionByZero));
    }

    #[test]
    fn mul_div_survives_wide_intermediate() {
        // u64::MAX * u64::MAX overflows u64 but the quotient fits.
        assert_eq!(mul_div(u64::MAX, u64::MAX, u64::MAX), Ok(u64::MAX));
        assert_eq!(mul_div(u64::MAX, 2, 1), Err(MathError::Overflow));
    }

    #[test]
    fn pow_and_sqrt() {
        assert_eq!(pow(10, 9), Ok(1_000_000_000));
        assert_eq!(pow(10, 20), Err(MathError::Overflow));
        assert_eq!(sqrt(0), 0);
        assert_eq!(sqrt(1), 1);
        assert_eq!(sqrt(15), 3);
        assert_eq!(sqrt(16), 4);
        assert_eq!(sqrt(u64::MAX), 4_294_967_295);
    }

    #[test]
    fn bps_of_amount() {
        assert_eq!(bps_of(10_000, 30), Ok(30));
        assert_eq!(bps_of(999, 30), Ok(2)); // 2.997 floored
        assert_eq!(bps_of(1_000, 0), Ok(0));
    }
}

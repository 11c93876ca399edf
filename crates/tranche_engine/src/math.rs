//! Fixed-point and overflow-aware arithmetic helpers
//!
//! Saturating helpers never panic and are used in read-only paths.
//! `checked_*` helpers return [`EngineError::Overflow`] and are used
//! wherever ledger state is mutated.

use crate::error::{EngineError, Result};

/// 1.0 in parts-per-million (severity and recovery-per-token scale)
pub const SCALE: u128 = 1_000_000;

/// Add u128 with saturation at MAX
pub fn add_u128(a: u128, b: u128) -> u128 {
    a.saturating_add(b)
}

/// Subtract u128 with saturation at 0
pub fn sub_u128(a: u128, b: u128) -> u128 {
    a.saturating_sub(b)
}

/// Multiply u128 with saturation
pub fn mul_u128(a: u128, b: u128) -> u128 {
    a.saturating_mul(b)
}

/// Minimum of two u128
pub fn min_u128(a: u128, b: u128) -> u128 {
    if a < b { a } else { b }
}

pub fn checked_add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(EngineError::Overflow)
}

pub fn checked_sub(a: u128, b: u128) -> Result<u128> {
    a.checked_sub(b).ok_or(EngineError::Overflow)
}

/// floor(a * b / d) without forming `a * b` when `a` is large
///
/// Returns `None` on division by zero or when the result does not fit.
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    let q = a / d;
    let r = a % d;
    q.checked_mul(b)?.checked_add(r.checked_mul(b)? / d)
}

/// ceil(a * b / d), same overflow rules as [`mul_div_floor`]
pub fn mul_div_ceil(a: u128, b: u128, d: u128) -> Option<u128> {
    let floor = mul_div_floor(a, b, d)?;
    // (a / d) * b is exact, so only the remainder term can round
    if (a % d).checked_mul(b)? % d == 0 {
        Some(floor)
    } else {
        floor.checked_add(1)
    }
}

/// Apply a parts-per-million ratio to an amount, rounding down
pub fn apply_ppm(amount: u128, ppm: u128) -> Result<u128> {
    mul_div_floor(amount, ppm, SCALE).ok_or(EngineError::Overflow)
}

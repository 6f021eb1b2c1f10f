//! Wide fixed-point helpers.
//!
//! Every pro-rata product in the engine (`value * part / whole`) goes through
//! [`mul_div`], which carries the intermediate product in 256 bits and
//! floors the quotient. Rounding down on every payout keeps the pool solvent.

use primitive_types::U256;

use crate::{EngineError, Result};

/// `floor(value * numerator / denominator)` without intermediate overflow.
///
/// # Errors
///
/// - [`EngineError::DivisionByZero`] if `denominator` is zero
/// - [`EngineError::Overflow`] if the quotient does not fit in `u128`
pub fn mul_div(value: u128, numerator: u128, denominator: u128) -> Result<u128> {
    if denominator == 0 {
        return Err(EngineError::DivisionByZero);
    }
    let product = U256::from(value) * U256::from(numerator);
    let quotient = product / U256::from(denominator);
    if quotient > U256::from(u128::MAX) {
        return Err(EngineError::Overflow);
    }
    Ok(quotient.as_u128())
}

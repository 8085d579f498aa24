//! Conversions between whole-unit decimal amounts and atomic units

use alloy_primitives::{
    utils::{format_units, parse_units},
    U256,
};
use thiserror::Error;

/// An error converting an amount
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    /// The amount is empty or not a non-negative decimal number
    #[error("invalid amount: {0}")]
    Invalid(String),
    /// The amount does not fit in 256 bits
    #[error("amount overflows: {0}")]
    Overflow(String),
}

/// Convert a whole-unit decimal string into atomic units
///
/// Fraction digits beyond the token's precision are truncated
pub fn to_atomic_units(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let amount = amount.trim();
    let well_formed = !amount.is_empty()
        && amount.chars().all(|c| c.is_ascii_digit() || c == '.')
        && amount.matches('.').count() <= 1
        && amount.chars().any(|c| c.is_ascii_digit());
    if !well_formed {
        return Err(AmountError::Invalid(amount.to_string()));
    }

    let truncated = match amount.split_once('.') {
        Some((int, frac)) => {
            let int = if int.is_empty() { "0" } else { int };
            let frac = &frac[..frac.len().min(decimals as usize)];
            if frac.is_empty() {
                int.to_string()
            } else {
                format!("{int}.{frac}")
            }
        },
        None => amount.to_string(),
    };

    parse_units(&truncated, decimals)
        .map(|units| units.get_absolute())
        .map_err(|_| AmountError::Overflow(amount.to_string()))
}

/// Convert an atomic amount into a whole-unit decimal string with trailing
/// zeros removed
pub fn from_atomic_units(amount: U256, decimals: u8) -> String {
    let Ok(formatted) = format_units(amount, decimals) else {
        return amount.to_string();
    };

    if !formatted.contains('.') {
        return formatted;
    }

    formatted.trim_end_matches('0').trim_end_matches('.').to_string()
}

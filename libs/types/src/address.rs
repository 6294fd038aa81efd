//! Address parsing helpers.
//!
//! The public API accepts Ethereum-style hex strings in any casing, with or
//! without a `0x` prefix. Everything internal works on the fixed 20-byte
//! `alloy_primitives::Address`.

use alloy_primitives::Address;
use thiserror::Error;

/// Errors produced while parsing a caller-supplied address string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid hex in address '{0}'")]
    InvalidHex(String),

    #[error("address '{0}' is {1} bytes, expected 20")]
    WrongLength(String, usize),
}

/// Parse a case-insensitive hex address with an optional `0x` prefix.
pub fn parse_address(input: &str) -> Result<Address, AddressError> {
    let trimmed = input.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let bytes = hex::decode(body).map_err(|_| AddressError::InvalidHex(input.to_string()))?;
    if bytes.len() != 20 {
        return Err(AddressError::WrongLength(input.to_string(), bytes.len()));
    }

    Ok(Address::from_slice(&bytes))
}

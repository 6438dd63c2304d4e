//! Wallet address validation.
//!
//! Accepts 20-byte hex addresses with or without the `0x` prefix. All-lowercase
//! and all-uppercase input is taken as-is; mixed-case input has to carry a
//! valid EIP-55 checksum, otherwise it is most likely a typo.

use alloy::primitives::Address;
use std::str::FromStr;

use crate::errors::AnalysisError;

/// Parse and validate a user supplied wallet address.
pub fn parse_wallet_address(input: &str) -> Result<Address, AnalysisError> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AnalysisError::InvalidAddress(input.to_string()));
    }

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());

    let parsed = if has_lower && has_upper {
        Address::parse_checksummed(format!("0x{digits}"), None).ok()
    } else {
        Address::from_str(digits).ok()
    };

    parsed.ok_or_else(|| AnalysisError::InvalidAddress(input.to_string()))
}

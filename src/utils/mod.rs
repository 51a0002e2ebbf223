// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Address and amount parsing shared by the permission builder, the envelope
//! validator and the transaction builders.

use crate::error::{AgentWalletError, Result};
use ethers::types::{Address, U256};
use ethers::utils::{format_units, parse_units, to_checksum};

/// Parse a `0x`-prefixed 20-byte hex address
pub fn parse_address(field: &str, value: &str) -> Result<Address> {
    let value = value.trim();
    let hex_str = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"));
    let hex_str = match hex_str {
        Some(h) if h.len() == 40 => h,
        _ => {
            return Err(AgentWalletError::usage(format!(
                "{} must be a 0x-prefixed 40 hex character address, got '{}'",
                field, value
            )))
        }
    };
    let bytes = hex::decode(hex_str).map_err(|_| {
        AgentWalletError::usage(format!("{} contains invalid hex: '{}'", field, value))
    })?;
    Ok(Address::from_slice(&bytes))
}

/// EIP-55 checksum form
pub fn checksum(address: &Address) -> String {
    to_checksum(address, None)
}

/// Positive decimal number such as `25`, `0.5` or `1000.000001`
pub fn is_decimal_amount(value: &str) -> bool {
    let mut parts = value.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let frac = parts.next();

    let digits_ok = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !digits_ok(whole) || !frac.map(digits_ok).unwrap_or(true) {
        return false;
    }
    if whole.is_empty() && frac.map(str::is_empty).unwrap_or(true) {
        return false;
    }
    value.chars().any(|c| matches!(c, '1'..='9'))
}

/// Number of digits after the decimal point
pub fn fraction_digits(value: &str) -> usize {
    value.split_once('.').map(|(_, frac)| frac.len()).unwrap_or(0)
}

/// Reject amounts more precise than a token with `decimals` can represent
pub fn check_precision(field: &str, amount: &str, decimals: u8) -> Result<()> {
    let digits = fraction_digits(amount.trim());
    if digits > decimals as usize {
        return Err(AgentWalletError::usage(format!(
            "{} '{}' has {} fractional digits but the token only has {} decimals",
            field,
            amount.trim(),
            digits,
            decimals
        )));
    }
    Ok(())
}

/// Convert a human amount to base units for a token with `decimals`
///
/// Never rounds: extra precision and amounts that come out as zero are errors.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    if !is_decimal_amount(amount) {
        return Err(AgentWalletError::usage(format!(
            "amount must be a positive decimal number, got '{}'",
            amount
        )));
    }
    check_precision("amount", amount, decimals)?;
    let units: U256 = parse_units(amount, decimals as u32)
        .map_err(|e| {
            AgentWalletError::usage(format!(
                "amount '{}' does not fit {} decimals: {}",
                amount, decimals, e
            ))
        })?
        .into();
    if units.is_zero() {
        return Err(AgentWalletError::usage(format!(
            "amount '{}' is zero in base units",
            amount
        )));
    }
    Ok(units)
}

pub fn format_base_units(value: U256, decimals: u8) -> String {
    format_units(value, decimals as u32).unwrap_or_else(|_| value.to_string())
}

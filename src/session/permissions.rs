// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Permission Builder
//!
//! Turns CLI spending-limit flags into the query parameters the approval page
//! reads to assemble the explicit session's permission rules. The output is a
//! set: the same flags always yield the same parameters, whatever order they
//! were given in.
//!
//! The builder only ever adds grants. The trust/reputation registries are always
//! whitelisted and the USDC ceiling defaults to a small non-zero value, so a
//! wallet funded only in USDC can still pay relayer fees.

use crate::error::{AgentWalletError, Result};
use crate::utils::{check_precision, checksum, is_decimal_amount, parse_address};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

/// USDC amounts are expressed in 6-decimal base units
pub const USDC_DECIMALS: u8 = 6;

/// Default USDC ceiling when `--usdc-limit` is not given
pub const DEFAULT_USDC_LIMIT: &str = "50";

/// Identity and reputation registries every session may call
pub const TRUST_REGISTRY_CONTRACTS: [&str; 2] = [
    "0x8004A169FB4a3325136EB29fA0ceB6D2e539a432",
    "0x8004BAa17C55a88189AE136b182e5fdA19dE9b63",
];

pub const PARAM_NATIVE_LIMIT: &str = "nativeLimit";
pub const PARAM_USDC_LIMIT: &str = "usdcLimit";
pub const PARAM_TOKEN_LIMIT: &str = "tokenLimit";
pub const PARAM_USDC_TO: &str = "usdcTo";
pub const PARAM_USDC_AMOUNT: &str = "usdcAmount";
pub const PARAM_CONTRACT: &str = "contract";

/// A constraint on what an explicit session may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRule {
    /// Contract the rule applies to
    pub target: String,
    /// Parameter constraints, interpreted by the wallet runtime
    #[serde(default)]
    pub rules: Vec<serde_json::Value>,
}

/// Spending-limit flags as given on the command line
#[derive(Debug, Clone, Default)]
pub struct PermissionFlags {
    pub native_limit: Option<String>,
    pub usdc_limit: Option<String>,
    /// `SYMBOL:amount` pairs
    pub token_limits: Vec<String>,
    pub usdc_to: Option<String>,
    pub usdc_amount: Option<String>,
    pub contracts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionParams {
    params: BTreeSet<(String, String)>,
}

impl PermissionParams {
    fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.params.insert((key.to_string(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// All values recorded under `key`
    pub fn values(&self, key: &str) -> Vec<&str> {
        self.iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn append_to(&self, url: &mut Url) {
        let mut query = url.query_pairs_mut();
        for (key, value) in self.iter() {
            query.append_pair(key, value);
        }
    }
}

fn checked_amount(flag: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if !is_decimal_amount(value) {
        return Err(AgentWalletError::usage(format!(
            "{} must be a positive decimal amount, got '{}'",
            flag, value
        )));
    }
    Ok(value.to_string())
}

fn checked_usdc_amount(flag: &str, value: &str) -> Result<String> {
    let value = checked_amount(flag, value)?;
    check_precision(flag, &value, USDC_DECIMALS)?;
    Ok(value)
}

/// Build the permission query parameters for a link request
///
/// # Errors
///
/// UsageError when exactly one of `--usdc-to` / `--usdc-amount` is given, when an
/// amount or address is malformed, or when one token symbol is given two
/// different ceilings.
pub fn build_permission_params(flags: &PermissionFlags) -> Result<PermissionParams> {
    let mut params = PermissionParams::default();

    match (&flags.usdc_to, &flags.usdc_amount) {
        (Some(to), Some(amount)) => {
            let to = parse_address("--usdc-to", to)?;
            params.insert(PARAM_USDC_TO, checksum(&to));
            params.insert(PARAM_USDC_AMOUNT, checked_usdc_amount("--usdc-amount", amount)?);
        }
        (Some(_), None) => {
            return Err(AgentWalletError::usage(
                "--usdc-to requires --usdc-amount (a one-off grant needs both recipient and amount)",
            ))
        }
        (None, Some(_)) => {
            return Err(AgentWalletError::usage(
                "--usdc-amount requires --usdc-to (a one-off grant needs both recipient and amount)",
            ))
        }
        (None, None) => {}
    }

    if let Some(native) = &flags.native_limit {
        params.insert(PARAM_NATIVE_LIMIT, checked_amount("--native-limit", native)?);
    }

    let usdc_limit = match &flags.usdc_limit {
        Some(limit) => checked_usdc_amount("--usdc-limit", limit)?,
        None => DEFAULT_USDC_LIMIT.to_string(),
    };
    params.insert(PARAM_USDC_LIMIT, usdc_limit);

    let mut token_limits: BTreeMap<String, String> = BTreeMap::new();
    for pair in &flags.token_limits {
        let (symbol, amount) = pair.split_once(':').ok_or_else(|| {
            AgentWalletError::usage(format!(
                "--token-limit expects SYMBOL:amount, got '{}'",
                pair
            ))
        })?;
        let symbol = symbol.trim().to_ascii_uppercase();
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AgentWalletError::usage(format!(
                "--token-limit symbol must be alphanumeric, got '{}'",
                pair
            )));
        }
        let amount = checked_amount("--token-limit", amount)?;
        if let Some(existing) = token_limits.get(&symbol) {
            if *existing != amount {
                return Err(AgentWalletError::usage(format!(
                    "--token-limit given twice for {} with different amounts ({} and {})",
                    symbol, existing, amount
                )));
            }
        }
        token_limits.insert(symbol, amount);
    }
    for (symbol, amount) in token_limits {
        params.insert(PARAM_TOKEN_LIMIT, format!("{}:{}", symbol, amount));
    }

    for registry in TRUST_REGISTRY_CONTRACTS {
        let address = parse_address("trust registry", registry)?;
        params.insert(PARAM_CONTRACT, checksum(&address));
    }
    for contract in &flags.contracts {
        let address = parse_address("--contract", contract)?;
        params.insert(PARAM_CONTRACT, checksum(&address));
    }

    Ok(params)
}

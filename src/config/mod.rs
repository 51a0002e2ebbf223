// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process configuration
//!
//! Resolved exactly once at startup from the environment (after `.env` is loaded)
//! and then passed explicitly into each component. Nothing else in the crate reads
//! environment variables.

pub mod chains;

pub use chains::{ChainConfig, ChainRegistry, TokenInfo, TokenResolver, STABLE_SYMBOL};

use crate::error::{AgentWalletError, Result};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_APPROVAL_URL: &str = "http://localhost:5173/link";
pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 300;
const RPC_OVERRIDE_PREFIX: &str = "AGENT_WALLET_RPC_";

#[derive(Clone, Debug)]
pub struct Config {
    /// Root of the encrypted credential store
    pub home: PathBuf,
    /// Base URL of the browser approval page
    pub approval_url: Url,
    /// Default project access key for new link requests
    pub access_key: Option<String>,
    /// Wallet-runtime JSON-RPC endpoint, required only for broadcasting
    pub runtime_url: Option<Url>,
    pub callback_timeout: Duration,
    /// Operator-supplied passphrase replacing the generated store key
    pub encryption_passphrase: Option<String>,
    pub debug_http: bool,
    pub rpc_overrides: HashMap<u64, String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&unicode_vars(std::env::vars_os()))
    }

    /// Build from an explicit variable map. Required values are validated here so a
    /// bad setting fails before any command runs.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let home = match get("AGENT_WALLET_HOME") {
            Some(dir) => PathBuf::from(dir),
            None => {
                let user_home = get("HOME").ok_or_else(|| {
                    AgentWalletError::usage("neither AGENT_WALLET_HOME nor HOME is set")
                })?;
                PathBuf::from(user_home).join(".agent-wallet")
            }
        };

        let approval_raw =
            get("AGENT_WALLET_APPROVAL_URL").unwrap_or_else(|| DEFAULT_APPROVAL_URL.to_string());
        let approval_url = Url::parse(&approval_raw).map_err(|e| {
            AgentWalletError::usage(format!("AGENT_WALLET_APPROVAL_URL is not a URL: {}", e))
        })?;

        let runtime_url = get("AGENT_WALLET_RUNTIME_URL")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| {
                    AgentWalletError::usage(format!("AGENT_WALLET_RUNTIME_URL is not a URL: {}", e))
                })
            })
            .transpose()?;

        let callback_timeout = match get("AGENT_WALLET_CALLBACK_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|_| {
                    AgentWalletError::usage(format!(
                        "AGENT_WALLET_CALLBACK_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                        raw
                    ))
                })?;
                if secs == 0 {
                    return Err(AgentWalletError::usage(
                        "AGENT_WALLET_CALLBACK_TIMEOUT_SECS must be greater than zero",
                    ));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_CALLBACK_TIMEOUT_SECS),
        };

        let debug_http = get("AGENT_WALLET_DEBUG_HTTP")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let mut rpc_overrides = HashMap::new();
        for (key, value) in vars {
            if let Some(suffix) = key.strip_prefix(RPC_OVERRIDE_PREFIX) {
                let chain_id = suffix.parse::<u64>().map_err(|_| {
                    AgentWalletError::usage(format!(
                        "{} must end in a numeric chain id",
                        key
                    ))
                })?;
                rpc_overrides.insert(chain_id, value.trim().to_string());
            }
        }

        Ok(Config {
            home,
            approval_url,
            access_key: get("AGENT_WALLET_ACCESS_KEY"),
            runtime_url,
            callback_timeout,
            encryption_passphrase: get("AGENT_WALLET_ENCRYPTION_KEY"),
            debug_http,
            rpc_overrides,
        })
    }

    pub fn chain_registry(&self) -> ChainRegistry {
        ChainRegistry::with_rpc_overrides(&self.rpc_overrides)
    }
}

/// Keep only variables whose name and value are valid Unicode
///
/// Unrelated non-UTF-8 entries in the environment are skipped rather than aborting startup.
fn unicode_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> HashMap<String, String> {
    vars.into_iter()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (Ok(key), Err(_)) => {
                tracing::debug!("Skipping non-UTF-8 value for {}", key);
                None
            }
            (Err(_), _) => None,
        })
        .collect()
}

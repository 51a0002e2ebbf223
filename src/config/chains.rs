// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Supported networks and their well-known tokens
//!
//! A request declares its chain by name ("polygon") or numeric id ("137"); both
//! resolve through [`ChainRegistry`]. The token table doubles as the static
//! symbol → {address, decimals} resolver used by `send` and the fee tiers.

use crate::error::{AgentWalletError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Symbol of the primary stable asset every chain is expected to carry
pub const STABLE_SYMBOL: &str = "USDC";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Canonical lower-case network name used in approval URLs
    pub name: String,
    pub display_name: String,
    pub rpc_url: String,
    pub native_token: TokenInfo,
    pub tokens: Vec<TokenInfo>,
    pub explorer_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenInfo {
    pub symbol: String,
    /// `None` for the chain's native currency
    pub address: Option<String>,
    pub decimals: u8,
    /// Hand-tuned fee estimate used when the relayer cannot simulate
    pub fallback_fee: String,
}

impl TokenInfo {
    fn native(symbol: &str, fallback_fee: &str) -> Self {
        TokenInfo {
            symbol: symbol.to_string(),
            address: None,
            decimals: 18,
            fallback_fee: fallback_fee.to_string(),
        }
    }

    fn erc20(symbol: &str, address: &str, decimals: u8, fallback_fee: &str) -> Self {
        TokenInfo {
            symbol: symbol.to_string(),
            address: Some(address.to_string()),
            decimals,
            fallback_fee: fallback_fee.to_string(),
        }
    }

    pub fn is_native(&self) -> bool {
        self.address.is_none()
    }
}

impl ChainConfig {
    pub fn polygon() -> Self {
        ChainConfig {
            chain_id: 137,
            name: "polygon".to_string(),
            display_name: "Polygon".to_string(),
            rpc_url: "https://polygon-rpc.com".to_string(),
            native_token: TokenInfo::native("POL", "0.05"),
            tokens: vec![
                TokenInfo::erc20(
                    "USDC",
                    "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359",
                    6,
                    "0.02",
                ),
                TokenInfo::erc20(
                    "USDT",
                    "0xc2132D05D31c914a87C6611C10748AEb04B58e8F",
                    6,
                    "0.02",
                ),
            ],
            explorer_url: "https://polygonscan.com".to_string(),
        }
    }

    pub fn amoy() -> Self {
        ChainConfig {
            chain_id: 80002,
            name: "amoy".to_string(),
            display_name: "Polygon Amoy".to_string(),
            rpc_url: "https://rpc-amoy.polygon.technology".to_string(),
            native_token: TokenInfo::native("POL", "0.05"),
            tokens: vec![TokenInfo::erc20(
                "USDC",
                "0x41E94Eb019C0762f9Bfcf9Fb1E58725BfB0e7582",
                6,
                "0.02",
            )],
            explorer_url: "https://amoy.polygonscan.com".to_string(),
        }
    }

    pub fn base() -> Self {
        ChainConfig {
            chain_id: 8453,
            name: "base".to_string(),
            display_name: "Base".to_string(),
            rpc_url: "https://mainnet.base.org".to_string(),
            native_token: TokenInfo::native("ETH", "0.00002"),
            tokens: vec![TokenInfo::erc20(
                "USDC",
                "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
                6,
                "0.05",
            )],
            explorer_url: "https://basescan.org".to_string(),
        }
    }

    pub fn base_sepolia() -> Self {
        ChainConfig {
            chain_id: 84532,
            name: "base-sepolia".to_string(),
            display_name: "Base Sepolia".to_string(),
            rpc_url: "https://sepolia.base.org".to_string(),
            native_token: TokenInfo::native("ETH", "0.00002"),
            tokens: vec![TokenInfo::erc20(
                "USDC",
                "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
                6,
                "0.05",
            )],
            explorer_url: "https://sepolia.basescan.org".to_string(),
        }
    }

    pub fn arbitrum() -> Self {
        ChainConfig {
            chain_id: 42161,
            name: "arbitrum".to_string(),
            display_name: "Arbitrum One".to_string(),
            rpc_url: "https://arb1.arbitrum.io/rpc".to_string(),
            native_token: TokenInfo::native("ETH", "0.00002"),
            tokens: vec![TokenInfo::erc20(
                "USDC",
                "0xaf88d065e77c8cC2239327C5EDb3A432268e5831",
                6,
                "0.05",
            )],
            explorer_url: "https://arbiscan.io".to_string(),
        }
    }

    pub fn optimism() -> Self {
        ChainConfig {
            chain_id: 10,
            name: "optimism".to_string(),
            display_name: "OP Mainnet".to_string(),
            rpc_url: "https://mainnet.optimism.io".to_string(),
            native_token: TokenInfo::native("ETH", "0.00002"),
            tokens: vec![TokenInfo::erc20(
                "USDC",
                "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85",
                6,
                "0.05",
            )],
            explorer_url: "https://optimistic.etherscan.io".to_string(),
        }
    }

    pub fn mainnet() -> Self {
        ChainConfig {
            chain_id: 1,
            name: "mainnet".to_string(),
            display_name: "Ethereum".to_string(),
            rpc_url: "https://eth.llamarpc.com".to_string(),
            native_token: TokenInfo::native("ETH", "0.001"),
            tokens: vec![TokenInfo::erc20(
                "USDC",
                "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
                6,
                "2.5",
            )],
            explorer_url: "https://etherscan.io".to_string(),
        }
    }

    /// Look up a token by symbol, native currency included
    pub fn token(&self, symbol: &str) -> Option<&TokenInfo> {
        if self.native_token.symbol.eq_ignore_ascii_case(symbol) {
            return Some(&self.native_token);
        }
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn stable_token(&self) -> Option<&TokenInfo> {
        self.token(STABLE_SYMBOL)
    }

    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url, tx_hash)
    }
}

/// Symbol → address/decimals lookup, backed by the chain table by default
pub trait TokenResolver: Send + Sync {
    fn resolve_token(&self, chain_id: u64, symbol: &str) -> Result<TokenInfo>;
}

pub struct ChainRegistry {
    chains: HashMap<u64, ChainConfig>,
    default_chain: u64,
}

impl ChainRegistry {
    pub fn new() -> Self {
        let mut chains = HashMap::new();
        for chain in [
            ChainConfig::polygon(),
            ChainConfig::amoy(),
            ChainConfig::base(),
            ChainConfig::base_sepolia(),
            ChainConfig::arbitrum(),
            ChainConfig::optimism(),
            ChainConfig::mainnet(),
        ] {
            chains.insert(chain.chain_id, chain);
        }

        ChainRegistry {
            chains,
            default_chain: 137,
        }
    }

    /// Registry with per-chain RPC endpoints replaced
    pub fn with_rpc_overrides(overrides: &HashMap<u64, String>) -> Self {
        let mut registry = Self::new();
        for (chain_id, url) in overrides {
            if let Some(chain) = registry.chains.get_mut(chain_id) {
                chain.rpc_url = url.clone();
            }
        }
        registry
    }

    pub fn get_chain(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.get(&chain_id)
    }

    /// Resolve a user-supplied identifier: a network name or a numeric chain id
    pub fn resolve(&self, identifier: &str) -> Result<&ChainConfig> {
        let ident = identifier.trim();
        let found = match ident.parse::<u64>() {
            Ok(id) => self.chains.get(&id),
            Err(_) => self
                .chains
                .values()
                .find(|c| c.name.eq_ignore_ascii_case(ident)),
        };
        found.ok_or_else(|| {
            AgentWalletError::usage(format!(
                "unsupported chain '{}'; supported: {}",
                identifier,
                self.supported_names().join(", ")
            ))
        })
    }

    pub fn default_chain(&self) -> u64 {
        self.default_chain
    }

    pub fn list_supported_chains(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.chains.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    pub fn supported_names(&self) -> Vec<String> {
        self.list_supported_chains()
            .into_iter()
            .filter_map(|id| self.chains.get(&id).map(|c| c.name.clone()))
            .collect()
    }

    pub fn is_chain_supported(&self, chain_id: u64) -> bool {
        self.chains.contains_key(&chain_id)
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenResolver for ChainRegistry {
    fn resolve_token(&self, chain_id: u64, symbol: &str) -> Result<TokenInfo> {
        let chain = self
            .get_chain(chain_id)
            .ok_or_else(|| AgentWalletError::usage(format!("unsupported chain id {}", chain_id)))?;
        chain.token(symbol).cloned().ok_or_else(|| {
            AgentWalletError::usage(format!(
                "unknown token '{}' on {}",
                symbol, chain.display_name
            ))
        })
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Wallet-client interface
//!
//! The smart-wallet runtime (session signing, relaying, fee quoting) sits behind
//! [`WalletClient`]. The dispatcher only ever talks to this trait; the shipped
//! implementation is [`HttpWalletClient`], a JSON-RPC client for a runtime
//! endpoint.

pub mod balances;
pub mod http;

pub use balances::{fetch_balances, BalanceProvider, RpcBalanceProvider, TokenBalance};
pub use http::HttpWalletClient;

use crate::error::Result;
use crate::session::{ExplicitSessionMaterial, ImplicitSessionMaterial, WalletSession};
use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// One call in a (possibly batched) wallet transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub to: Address,
    pub value: U256,
    #[serde(default)]
    pub data: Bytes,
}

/// How the relayer gets paid for one transaction attempt. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeOption {
    pub symbol: String,
    /// `None` for the native currency
    #[serde(default)]
    pub token_address: Option<Address>,
    pub decimals: u8,
    pub recipient: Address,
    pub amount: U256,
    #[serde(default)]
    pub gas_limit: u64,
}

impl FeeOption {
    pub fn is_native(&self) -> bool {
        self.token_address.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeToken {
    pub symbol: String,
    #[serde(default)]
    pub address: Option<Address>,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeTokenList {
    #[serde(default = "fee_required_default")]
    pub fee_required: bool,
    #[serde(default)]
    pub payment_address: Option<Address>,
    #[serde(default)]
    pub tokens: Vec<FeeToken>,
}

fn fee_required_default() -> bool {
    true
}

/// Credentials handed to the runtime on connect
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub wallet_address: String,
    pub explicit_session: ExplicitSessionMaterial,
    pub implicit_session: ImplicitSessionMaterial,
}

impl From<&WalletSession> for SessionConfig {
    fn from(session: &WalletSession) -> Self {
        Self {
            wallet_address: session.wallet_address.clone(),
            explicit_session: session.explicit_session_material.clone(),
            implicit_session: session.implicit_session_material.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletClient: Send + Sync {
    async fn initialize(&self) -> Result<()>;

    async fn connect(
        &self,
        chain_id: u64,
        session: &SessionConfig,
        options: &ConnectOptions,
    ) -> Result<()>;

    async fn get_wallet_address(&self) -> Result<Address>;

    /// Simulation-based fee quotes for `transactions`
    async fn get_fee_options(
        &self,
        chain_id: u64,
        transactions: &[Transaction],
    ) -> Result<Vec<FeeOption>>;

    async fn get_fee_tokens(&self, chain_id: u64) -> Result<FeeTokenList>;

    /// Sign and relay; returns the transaction hash
    async fn send_transaction(
        &self,
        chain_id: u64,
        transactions: &[Transaction],
        fee_option: Option<FeeOption>,
    ) -> Result<String>;
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Balance queries over plain JSON-RPC (`eth_getBalance`, ERC-20 `balanceOf`)

use crate::config::{ChainConfig, TokenInfo};
use crate::error::{AgentWalletError, Result};
use crate::observer::HttpObserver;
use crate::utils::{format_base_units, parse_address};
use async_trait::async_trait;
use ethers::abi::{encode, Token};
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, Bytes, TransactionRequest, U256};
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// `balanceOf(address)`
const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

#[async_trait]
pub trait BalanceProvider: Send + Sync {
    async fn native_balance(&self, chain: &ChainConfig, owner: Address) -> Result<U256>;

    async fn token_balance(&self, chain: &ChainConfig, token: Address, owner: Address)
        -> Result<U256>;
}

/// Queries each chain's configured RPC endpoint
#[derive(Default, Clone)]
pub struct RpcBalanceProvider {
    observer: Option<Arc<dyn HttpObserver>>,
}

impl RpcBalanceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(mut self, observer: Arc<dyn HttpObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run one RPC call, reporting it to the observer when one is attached
    async fn observed<T, F>(
        &self,
        chain: &ChainConfig,
        method: &str,
        params: Value,
        request: F,
    ) -> std::result::Result<T, String>
    where
        T: Serialize,
        F: Future<Output = std::result::Result<T, String>>,
    {
        let url = chain.rpc_url.as_str();
        if let Some(observer) = &self.observer {
            observer.on_request(method, url, &params);
        }
        let started = Instant::now();
        let outcome = request.await;
        if let Some(observer) = &self.observer {
            match &outcome {
                Ok(result) => {
                    let body = serde_json::to_value(result).unwrap_or(Value::Null);
                    observer.on_response(method, url, 200, started.elapsed(), &body);
                }
                Err(e) => observer.on_error(method, url, e),
            }
        }
        outcome
    }

    fn provider(chain: &ChainConfig) -> Result<Provider<Http>> {
        Provider::<Http>::try_from(chain.rpc_url.as_str()).map_err(|e| {
            AgentWalletError::usage(format!(
                "invalid RPC URL for {}: {} ({})",
                chain.name, chain.rpc_url, e
            ))
        })
    }
}

pub fn balance_of_calldata(owner: Address) -> Bytes {
    let mut data = BALANCE_OF_SELECTOR.to_vec();
    data.extend(encode(&[Token::Address(owner)]));
    data.into()
}

#[async_trait]
impl BalanceProvider for RpcBalanceProvider {
    async fn native_balance(&self, chain: &ChainConfig, owner: Address) -> Result<U256> {
        let provider = Self::provider(chain)?;
        let request = async { provider.get_balance(owner, None).await.map_err(|e| e.to_string()) };
        self.observed(chain, "eth_getBalance", json!([owner, "latest"]), request)
            .await
            .map_err(|e| {
                AgentWalletError::Transport(format!("eth_getBalance on {} failed: {}", chain.name, e))
            })
    }

    async fn token_balance(
        &self,
        chain: &ChainConfig,
        token: Address,
        owner: Address,
    ) -> Result<U256> {
        let provider = Self::provider(chain)?;
        let data = balance_of_calldata(owner);
        let params = json!([{"to": token, "data": data}, "latest"]);
        let tx = TransactionRequest::new().to(token).data(data);
        let request = async { provider.call(&tx.into(), None).await.map_err(|e| e.to_string()) };
        let output = self
            .observed(chain, "eth_call", params, request)
            .await
            .map_err(|e| {
                AgentWalletError::Transport(format!("balanceOf on {} failed: {}", chain.name, e))
            })?;
        if output.len() < 32 {
            return Err(AgentWalletError::Transport(format!(
                "balanceOf on {} returned {} bytes",
                chain.name,
                output.len()
            )));
        }
        Ok(U256::from_big_endian(&output[..32]))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub symbol: String,
    pub address: Option<String>,
    pub decimals: u8,
    /// Base units, decimal string
    pub raw: String,
    pub formatted: String,
}

async fn balance_for(
    provider: &dyn BalanceProvider,
    chain: &ChainConfig,
    token: &TokenInfo,
    owner: Address,
) -> Result<TokenBalance> {
    let raw = match &token.address {
        None => provider.native_balance(chain, owner).await?,
        Some(address) => {
            let address = parse_address(&token.symbol, address)?;
            provider.token_balance(chain, address, owner).await?
        }
    };
    debug!("💰 {} balance on {}: {}", token.symbol, chain.name, raw);
    Ok(TokenBalance {
        symbol: token.symbol.clone(),
        address: token.address.clone(),
        decimals: token.decimals,
        raw: raw.to_string(),
        formatted: format_base_units(raw, token.decimals),
    })
}

/// Native and every known token balance, queried concurrently
pub async fn fetch_balances(
    provider: &dyn BalanceProvider,
    chain: &ChainConfig,
    owner: Address,
) -> Result<Vec<TokenBalance>> {
    let tokens = std::iter::once(&chain.native_token).chain(chain.tokens.iter());
    try_join_all(tokens.map(|token| balance_for(provider, chain, token, owner))).await
}

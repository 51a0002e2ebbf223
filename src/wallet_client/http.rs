// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! JSON-RPC 2.0 wallet client
//!
//! Talks to a wallet-runtime endpoint that holds the session signer. `connect`
//! may return a `connectionId`; when it does, every later call carries it.

use super::{
    ConnectOptions, FeeOption, FeeTokenList, SessionConfig, Transaction, WalletClient,
};
use crate::error::{AgentWalletError, Result};
use crate::observer::HttpObserver;
use crate::utils::parse_address;
use async_trait::async_trait;
use ethers::types::Address;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

pub struct HttpWalletClient {
    client: Client,
    endpoint: Url,
    next_id: AtomicU64,
    connection_id: RwLock<Option<String>>,
    observer: Option<Arc<dyn HttpObserver>>,
}

impl HttpWalletClient {
    pub fn new(endpoint: Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AgentWalletError::Transport(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint,
            next_id: AtomicU64::new(1),
            connection_id: RwLock::new(None),
            observer: None,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn HttpObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Map<String, Value>) -> Result<T> {
        let mut params = params;
        if let Some(connection_id) = self.connection_id.read().await.clone() {
            params.insert("connectionId".to_string(), Value::String(connection_id));
        }

        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": Value::Object(params),
        });
        let url = self.endpoint.as_str();
        if let Some(observer) = &self.observer {
            observer.on_request(method, url, &body);
        }

        let started = Instant::now();
        let response = match self.client.post(self.endpoint.clone()).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                if let Some(observer) = &self.observer {
                    observer.on_error(method, url, &e.to_string());
                }
                return Err(AgentWalletError::Transport(format!(
                    "{} could not reach wallet runtime: {}",
                    method, e
                )));
            }
        };

        let status = response.status();
        let text = response.text().await?;
        let payload: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        if let Some(observer) = &self.observer {
            observer.on_response(method, url, status.as_u16(), started.elapsed(), &payload);
        }

        if !status.is_success() {
            return Err(AgentWalletError::Transport(format!(
                "{} returned HTTP {}",
                method, status
            )));
        }

        let rpc: RpcResponse = serde_json::from_value(payload).map_err(|e| {
            AgentWalletError::Transport(format!("{} returned a malformed response: {}", method, e))
        })?;
        if let Some(error) = rpc.error {
            return Err(AgentWalletError::Transport(format!(
                "{} failed: {} (code {})",
                method, error.message, error.code
            )));
        }

        let result = rpc.result.unwrap_or(Value::Null);
        serde_json::from_value(result).map_err(|e| {
            AgentWalletError::Transport(format!("{} returned an unexpected result: {}", method, e))
        })
    }
}

fn params(pairs: Vec<(&str, Value)>) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| AgentWalletError::Transport(format!("cannot encode request: {}", e)))
}

#[async_trait]
impl WalletClient for HttpWalletClient {
    async fn initialize(&self) -> Result<()> {
        let _: Value = self.call("wallet_initialize", Map::new()).await?;
        Ok(())
    }

    async fn connect(
        &self,
        chain_id: u64,
        session: &SessionConfig,
        options: &ConnectOptions,
    ) -> Result<()> {
        let result: Value = self
            .call(
                "wallet_connect",
                params(vec![
                    ("chainId", json!(chain_id)),
                    ("session", to_value(session)?),
                    ("options", to_value(options)?),
                ]),
            )
            .await?;

        if let Some(id) = result.get("connectionId").and_then(Value::as_str) {
            debug!("🔗 Wallet runtime connection {}", id);
            *self.connection_id.write().await = Some(id.to_string());
        }
        Ok(())
    }

    async fn get_wallet_address(&self) -> Result<Address> {
        let result: Value = self.call("wallet_getAddress", Map::new()).await?;
        let address = result
            .as_str()
            .or_else(|| result.get("address").and_then(Value::as_str))
            .ok_or_else(|| {
                AgentWalletError::Transport("wallet_getAddress returned no address".to_string())
            })?;
        parse_address("walletAddress", address)
            .map_err(|e| AgentWalletError::Transport(e.to_string()))
    }

    async fn get_fee_options(
        &self,
        chain_id: u64,
        transactions: &[Transaction],
    ) -> Result<Vec<FeeOption>> {
        self.call(
            "wallet_getFeeOptions",
            params(vec![
                ("chainId", json!(chain_id)),
                ("transactions", to_value(&transactions)?),
            ]),
        )
        .await
    }

    async fn get_fee_tokens(&self, chain_id: u64) -> Result<FeeTokenList> {
        self.call("wallet_getFeeTokens", params(vec![("chainId", json!(chain_id))]))
            .await
    }

    async fn send_transaction(
        &self,
        chain_id: u64,
        transactions: &[Transaction],
        fee_option: Option<FeeOption>,
    ) -> Result<String> {
        let result: Value = self
            .call(
                "wallet_sendTransaction",
                params(vec![
                    ("chainId", json!(chain_id)),
                    ("transactions", to_value(&transactions)?),
                    ("feeOption", to_value(&fee_option)?),
                ]),
            )
            .await?;

        result
            .as_str()
            .or_else(|| result.get("txHash").and_then(Value::as_str))
            .map(str::to_string)
            .ok_or_else(|| {
                AgentWalletError::Transport(
                    "wallet_sendTransaction returned no transaction hash".to_string(),
                )
            })
    }
}

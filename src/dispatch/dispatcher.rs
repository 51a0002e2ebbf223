// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Transaction Dispatcher
//!
//! Consumes a stored wallet session for one operation:
//! 1. load the session (absent ⇒ not found)
//! 2. re-check the explicit session deadline (expired ⇒ re-link, never refreshed)
//! 3. dry run ⇒ stop here, no wallet-client calls
//! 4. connect, resolve a fee option, send
//!
//! The transaction hash is returned exactly as the runtime reported it.

use super::fee::{FeePreference, FeeResolver};
use crate::config::{ChainRegistry, TokenResolver};
use crate::error::{AgentWalletError, Result};
use crate::session::WalletSessionStore;
use crate::utils::parse_address;
use crate::wallet_client::{
    BalanceProvider, ConnectOptions, FeeOption, SessionConfig, Transaction, WalletClient,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub wallet_name: String,
    /// Must match the session's chain when given
    pub chain_id: Option<u64>,
    pub transactions: Vec<Transaction>,
    pub broadcast: bool,
    pub fee_preference: FeePreference,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    pub wallet_name: String,
    pub wallet_address: String,
    pub chain_id: u64,
    pub dry_run: bool,
    pub transactions: Vec<Transaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_option: Option<FeeOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

pub struct TransactionDispatcher {
    wallets: WalletSessionStore,
    chains: Arc<ChainRegistry>,
    client: Option<Arc<dyn WalletClient>>,
    balances: Option<Arc<dyn BalanceProvider>>,
    tokens: Arc<dyn TokenResolver>,
}

impl TransactionDispatcher {
    /// `client` may be `None` when no runtime is configured; only dry runs work then
    pub fn new(
        wallets: WalletSessionStore,
        chains: Arc<ChainRegistry>,
        client: Option<Arc<dyn WalletClient>>,
    ) -> Self {
        let tokens: Arc<dyn TokenResolver> = chains.clone();
        Self {
            wallets,
            chains,
            client,
            balances: None,
            tokens,
        }
    }

    pub fn with_balance_provider(mut self, balances: Arc<dyn BalanceProvider>) -> Self {
        self.balances = Some(balances);
        self
    }

    pub fn with_token_resolver(mut self, tokens: Arc<dyn TokenResolver>) -> Self {
        self.tokens = tokens;
        self
    }

    pub async fn execute(&self, request: DispatchRequest) -> Result<DispatchOutcome> {
        self.execute_at(Utc::now(), request).await
    }

    pub async fn execute_at(
        &self,
        now: DateTime<Utc>,
        request: DispatchRequest,
    ) -> Result<DispatchOutcome> {
        let session = self.wallets.require(&request.wallet_name)?;

        if session.is_expired(now) {
            warn!(
                "⏰ Session for wallet '{}' expired (deadline {})",
                session.wallet_name,
                session.deadline()
            );
            return Err(AgentWalletError::ExpiredSession {
                wallet_name: session.wallet_name.clone(),
                deadline: session.deadline(),
            });
        }

        if let Some(chain_id) = request.chain_id {
            if chain_id != session.chain_id {
                return Err(AgentWalletError::usage(format!(
                    "wallet '{}' is linked on chain {} but chain {} was requested",
                    session.wallet_name, session.chain_id, chain_id
                )));
            }
        }
        if request.transactions.is_empty() {
            return Err(AgentWalletError::usage("nothing to send"));
        }
        let chain = self.chains.get_chain(session.chain_id).ok_or_else(|| {
            AgentWalletError::Storage(format!(
                "wallet '{}' references unsupported chain {}",
                session.wallet_name, session.chain_id
            ))
        })?;

        let mut outcome = DispatchOutcome {
            wallet_name: session.wallet_name.clone(),
            wallet_address: session.wallet_address.clone(),
            chain_id: session.chain_id,
            dry_run: !request.broadcast,
            transactions: request.transactions.clone(),
            fee_option: None,
            tx_hash: None,
            explorer_url: None,
        };

        if !request.broadcast {
            info!(
                "🧪 Dry run for wallet '{}': {} call(s) on {}",
                session.wallet_name,
                request.transactions.len(),
                chain.display_name
            );
            return Ok(outcome);
        }

        let client = self.client.as_deref().ok_or_else(|| {
            AgentWalletError::usage("broadcasting needs AGENT_WALLET_RUNTIME_URL to be set")
        })?;

        client.initialize().await?;
        client
            .connect(
                session.chain_id,
                &SessionConfig::from(&session),
                &ConnectOptions {
                    access_key: session.access_key.clone(),
                },
            )
            .await?;

        let wallet = parse_address("walletAddress", &session.wallet_address)
            .map_err(|e| AgentWalletError::Storage(e.to_string()))?;
        let resolver = FeeResolver {
            client,
            balances: self.balances.as_deref(),
            tokens: self.tokens.as_ref(),
            chain,
            wallet,
        };
        let fee_option = resolver
            .resolve(&request.transactions, &request.fee_preference)
            .await?;

        let tx_hash = client
            .send_transaction(session.chain_id, &request.transactions, fee_option.clone())
            .await?;
        info!(
            "🚀 Sent from wallet '{}' on {}: {}",
            session.wallet_name, chain.display_name, tx_hash
        );

        outcome.explorer_url = Some(chain.tx_url(&tx_hash));
        outcome.fee_option = fee_option;
        outcome.tx_hash = Some(tx_hash);
        Ok(outcome)
    }
}

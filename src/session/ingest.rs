// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ingestion: turn a delivered ciphertext into a stored wallet session
//!
//! resolve request → reject consumed → reject expired → decrypt → validate →
//! write session → mark request consumed
//!
//! Nothing is written unless every step before it succeeded.

use super::envelope::{decrypt_envelope, validate_envelope};
use super::request::{RequestRegistry, SessionRequest};
use super::wallet::{WalletSession, WalletSessionStore};
use crate::config::ChainRegistry;
use crate::error::{AgentWalletError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct SessionLinker {
    requests: RequestRegistry,
    wallets: WalletSessionStore,
    chains: Arc<ChainRegistry>,
}

impl SessionLinker {
    pub fn new(
        requests: RequestRegistry,
        wallets: WalletSessionStore,
        chains: Arc<ChainRegistry>,
    ) -> Self {
        Self {
            requests,
            wallets,
            chains,
        }
    }

    pub fn requests(&self) -> &RequestRegistry {
        &self.requests
    }

    pub fn wallets(&self) -> &WalletSessionStore {
        &self.wallets
    }

    pub fn ingest(
        &self,
        request_id: Option<&str>,
        wallet_name: Option<&str>,
        ciphertext: &str,
    ) -> Result<WalletSession> {
        self.ingest_at(Utc::now(), request_id, wallet_name, ciphertext)
    }

    /// Find the request a ciphertext answers
    ///
    /// An explicit id wins; otherwise the single pending request for
    /// `wallet_name` is used.
    pub fn resolve_request(
        &self,
        request_id: Option<&str>,
        wallet_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SessionRequest> {
        let request_id = match (request_id, wallet_name) {
            (Some(id), _) => id.to_string(),
            (None, Some(name)) => self
                .requests
                .find_request_by_wallet_name(name, now)?
                .ok_or_else(|| {
                    AgentWalletError::request_not_found(format!(
                        "no pending request for wallet '{}'",
                        name
                    ))
                })?,
            (None, None) => {
                return Err(AgentWalletError::usage(
                    "pass --request-id or --name to select the link request",
                ))
            }
        };

        let request = self
            .requests
            .load_request(&request_id)?
            .ok_or_else(|| AgentWalletError::request_not_found(&request_id))?;

        if let Some(name) = wallet_name {
            if name != request.wallet_name {
                return Err(AgentWalletError::usage(format!(
                    "request {} was created for wallet '{}', not '{}'",
                    request.request_id, request.wallet_name, name
                )));
            }
        }
        Ok(request)
    }

    pub fn ingest_at(
        &self,
        now: DateTime<Utc>,
        request_id: Option<&str>,
        wallet_name: Option<&str>,
        ciphertext: &str,
    ) -> Result<WalletSession> {
        let mut request = self.resolve_request(request_id, wallet_name, now)?;

        if request.is_consumed() {
            warn!(
                "⚠️ Request {} already linked wallet '{}'",
                request.request_id, request.wallet_name
            );
            return Err(AgentWalletError::AlreadyConsumed(request.request_id));
        }
        if request.is_expired(now) {
            return Err(AgentWalletError::ExpiredRequest {
                request_id: request.request_id.clone(),
                expired_at: request.expires_at.to_rfc3339(),
            });
        }

        let keypair = request.keypair()?;
        let envelope = decrypt_envelope(&keypair, ciphertext)?;
        let validated = validate_envelope(envelope, &request, &self.chains, now)?;

        let session = WalletSession {
            wallet_name: request.wallet_name.clone(),
            wallet_address: validated.wallet_address,
            chain_id: validated.chain_id,
            chain_name: validated.chain_name,
            explicit_session_material: validated.explicit,
            implicit_session_material: validated.implicit,
            access_key: request.access_key.clone(),
            request_id: request.request_id.clone(),
            created_at: now,
        };

        if self.wallets.load(&session.wallet_name)?.is_some() {
            info!("🔁 Re-linking wallet '{}'", session.wallet_name);
        }
        self.wallets.save(&session)?;
        self.requests.mark_consumed(&mut request, now)?;

        info!(
            "✅ Wallet '{}' linked: {} on {}",
            session.wallet_name, session.wallet_address, session.chain_name
        );
        Ok(session)
    }
}

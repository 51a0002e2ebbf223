// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session Request Registry
//!
//! A link request is the CLI's half of the handshake: a fresh keypair, an expiry
//! and the wallet name it will be stored under. It is persisted (encrypted) until
//! a sealed envelope for it is ingested, after which it is marked consumed and
//! kept for audit.

use super::permissions::PermissionParams;
use crate::config::ChainRegistry;
use crate::crypto::RequestKeypair;
use crate::error::{AgentWalletError, Result};
use crate::storage::{validate_record_name, CredentialStore, RecordKind};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

/// Lifetime of a pending link request
pub const REQUEST_TTL_HOURS: i64 = 2;

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub request_id: String,
    pub wallet_name: String,
    /// Chain identifier exactly as the caller supplied it
    pub chain_identifier: String,
    /// Resolved network for `chain_identifier`
    pub chain_id: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub public_key: String,
    secret_key: String,
    pub access_key: Option<String>,
    #[serde(default)]
    pub consumed_at: Option<DateTime<Utc>>,
}

impl SessionRequest {
    pub fn keypair(&self) -> Result<RequestKeypair> {
        RequestKeypair::from_secret_hex(&self.secret_key).map_err(|e| {
            AgentWalletError::Storage(format!(
                "request {} has unreadable key material: {}",
                self.request_id, e
            ))
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    /// Still eligible for ingestion
    pub fn is_pending(&self, now: DateTime<Utc>) -> bool {
        !self.is_consumed() && !self.is_expired(now)
    }
}

impl fmt::Debug for SessionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRequest")
            .field("request_id", &self.request_id)
            .field("wallet_name", &self.wallet_name)
            .field("chain_id", &self.chain_id)
            .field("expires_at", &self.expires_at)
            .field("public_key", &self.public_key)
            .field("consumed_at", &self.consumed_at)
            .finish_non_exhaustive()
    }
}

/// Extra data carried by the approval URL
#[derive(Debug, Clone, Default)]
pub struct LinkOptions {
    pub permissions: PermissionParams,
    /// `http://localhost:<port>/callback` when a callback server is listening
    pub callback_url: Option<String>,
}

/// A freshly created request and the URL the user must open
#[derive(Debug, Clone)]
pub struct PendingLink {
    pub request: SessionRequest,
    pub approval_url: Url,
}

#[derive(Clone)]
pub struct RequestRegistry {
    store: CredentialStore,
    chains: Arc<ChainRegistry>,
    approval_base: Url,
}

impl RequestRegistry {
    pub fn new(store: CredentialStore, chains: Arc<ChainRegistry>, approval_base: Url) -> Self {
        Self {
            store,
            chains,
            approval_base,
        }
    }

    pub fn create_request(
        &self,
        wallet_name: &str,
        chain_identifier: &str,
        access_key: Option<String>,
        options: &LinkOptions,
    ) -> Result<PendingLink> {
        self.create_request_at(Utc::now(), wallet_name, chain_identifier, access_key, options)
    }

    pub fn create_request_at(
        &self,
        now: DateTime<Utc>,
        wallet_name: &str,
        chain_identifier: &str,
        access_key: Option<String>,
        options: &LinkOptions,
    ) -> Result<PendingLink> {
        validate_record_name(wallet_name)?;
        let chain = self.chains.resolve(chain_identifier)?;

        let keypair = RequestKeypair::generate();
        let request = SessionRequest {
            request_id: Uuid::new_v4().simple().to_string(),
            wallet_name: wallet_name.to_string(),
            chain_identifier: chain_identifier.trim().to_string(),
            chain_id: chain.chain_id,
            created_at: now,
            expires_at: now + Duration::hours(REQUEST_TTL_HOURS),
            public_key: keypair.public_key_hex(),
            secret_key: keypair.secret_hex(),
            access_key,
            consumed_at: None,
        };

        self.store
            .save(RecordKind::Requests, &request.request_id, &request)?;
        info!(
            "📝 Link request {} created for wallet '{}' on {}",
            request.request_id, wallet_name, chain.display_name
        );

        let approval_url = self.approval_url(&request, options);
        Ok(PendingLink {
            request,
            approval_url,
        })
    }

    /// Approval URL for `request`. Only the public key is embedded.
    pub fn approval_url(&self, request: &SessionRequest, options: &LinkOptions) -> Url {
        let mut url = self.approval_base.clone();
        let chain_name = self
            .chains
            .get_chain(request.chain_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| request.chain_identifier.clone());
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("requestId", &request.request_id)
                .append_pair("walletName", &request.wallet_name)
                .append_pair("publicKey", &request.public_key)
                .append_pair("chain", &chain_name)
                .append_pair("chainId", &request.chain_id.to_string());
            if let Some(callback) = &options.callback_url {
                query.append_pair("callbackUrl", callback);
            }
            if let Some(access_key) = &request.access_key {
                query.append_pair("accessKey", access_key);
            }
        }
        options.permissions.append_to(&mut url);
        url
    }

    pub fn load_request(&self, request_id: &str) -> Result<Option<SessionRequest>> {
        self.store.load(RecordKind::Requests, request_id)
    }

    /// Find the single pending request for `wallet_name`
    ///
    /// Consumed and expired requests are ignored. More than one pending request
    /// is ambiguous and reported as a usage error rather than guessed at.
    pub fn find_request_by_wallet_name(
        &self,
        wallet_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let mut candidates = Vec::new();
        for id in self.store.list(RecordKind::Requests)? {
            match self.load_request(&id)? {
                Some(request) if request.wallet_name == wallet_name && request.is_pending(now) => {
                    candidates.push(request.request_id)
                }
                _ => {}
            }
        }
        debug!(
            "🔍 {} pending request(s) for wallet '{}'",
            candidates.len(),
            wallet_name
        );

        match candidates.len() {
            0 => Ok(None),
            1 => Ok(candidates.pop()),
            _ => Err(AgentWalletError::usage(format!(
                "wallet '{}' has {} pending link requests ({}); pass --request-id",
                wallet_name,
                candidates.len(),
                candidates.join(", ")
            ))),
        }
    }

    pub fn mark_consumed(&self, request: &mut SessionRequest, now: DateTime<Utc>) -> Result<()> {
        request.consumed_at = Some(now);
        self.store
            .save(RecordKind::Requests, &request.request_id, request)
    }

    /// Persist an edited request (used by tooling and tests)
    pub fn save_request(&self, request: &SessionRequest) -> Result<()> {
        self.store
            .save(RecordKind::Requests, &request.request_id, request)
    }
}

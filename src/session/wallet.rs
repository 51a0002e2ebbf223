// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Wallet Session Store
//!
//! One record per named wallet, written by ingestion and read by the dispatcher.
//! Re-linking a name overwrites the previous record wholesale.

use super::envelope::{ExplicitSessionMaterial, ImplicitSessionMaterial};
use crate::error::{AgentWalletError, Result};
use crate::storage::{CredentialStore, RecordKind};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSession {
    pub wallet_name: String,
    pub wallet_address: String,
    pub chain_id: u64,
    pub chain_name: String,
    pub explicit_session_material: ExplicitSessionMaterial,
    pub implicit_session_material: ImplicitSessionMaterial,
    pub access_key: Option<String>,
    /// Request that produced this session
    pub request_id: String,
    pub created_at: DateTime<Utc>,
}

/// Secret-free view printed by `wallet list` and `wallet show`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub wallet_name: String,
    pub wallet_address: String,
    pub chain_id: u64,
    pub chain_name: String,
    pub session_address: String,
    pub deadline: Option<String>,
    pub expired: bool,
    pub value_limit: String,
    pub permission_targets: Vec<String>,
    pub has_access_key: bool,
    pub created_at: DateTime<Utc>,
}

impl WalletSession {
    /// Explicit session deadline in unix seconds
    pub fn deadline(&self) -> i64 {
        self.explicit_session_material.permission_config.deadline
    }

    /// A session without a deadline is treated as expired
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let deadline = self.deadline();
        deadline <= 0 || now.timestamp() >= deadline
    }

    pub fn summary(&self, now: DateTime<Utc>) -> WalletSummary {
        let config = &self.explicit_session_material.permission_config;
        let deadline = Utc
            .timestamp_opt(config.deadline, 0)
            .single()
            .filter(|_| config.deadline > 0)
            .map(|d| d.to_rfc3339());
        WalletSummary {
            wallet_name: self.wallet_name.clone(),
            wallet_address: self.wallet_address.clone(),
            chain_id: self.chain_id,
            chain_name: self.chain_name.clone(),
            session_address: self.explicit_session_material.derived_session_address.clone(),
            deadline,
            expired: self.is_expired(now),
            value_limit: config.value_limit.clone(),
            permission_targets: config.permissions.iter().map(|p| p.target.clone()).collect(),
            has_access_key: self.access_key.is_some(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WalletSessionStore {
    store: CredentialStore,
}

impl WalletSessionStore {
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }

    pub fn save(&self, session: &WalletSession) -> Result<()> {
        self.store
            .save(RecordKind::Wallets, &session.wallet_name, session)?;
        info!(
            "💾 Wallet '{}' stored ({} on chain {})",
            session.wallet_name, session.wallet_address, session.chain_id
        );
        Ok(())
    }

    pub fn load(&self, wallet_name: &str) -> Result<Option<WalletSession>> {
        self.store.load(RecordKind::Wallets, wallet_name)
    }

    /// Like [`load`](Self::load) but absence is an error
    pub fn require(&self, wallet_name: &str) -> Result<WalletSession> {
        self.load(wallet_name)?
            .ok_or_else(|| AgentWalletError::wallet_not_found(wallet_name))
    }

    pub fn list(&self) -> Result<Vec<WalletSession>> {
        let mut sessions = Vec::new();
        for name in self.store.list(RecordKind::Wallets)? {
            if let Some(session) = self.load(&name)? {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    pub fn remove(&self, wallet_name: &str) -> Result<bool> {
        let removed = self.store.delete(RecordKind::Wallets, wallet_name)?;
        if removed {
            info!("🗑️ Wallet '{}' removed", wallet_name);
        }
        Ok(removed)
    }
}

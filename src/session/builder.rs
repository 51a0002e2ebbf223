// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Builder identity: the project access key attached to new link requests

use crate::error::{AgentWalletError, Result};
use crate::storage::{CredentialStore, RecordKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

const IDENTITY_RECORD: &str = "default";

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderIdentity {
    pub access_key: String,
    pub updated_at: DateTime<Utc>,
}

impl BuilderIdentity {
    /// First and last four characters only
    pub fn masked_key(&self) -> String {
        let chars: Vec<char> = self.access_key.chars().collect();
        if chars.len() <= 8 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}…{}", head, tail)
    }
}

impl std::fmt::Debug for BuilderIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuilderIdentity")
            .field("access_key", &self.masked_key())
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct BuilderStore {
    store: CredentialStore,
}

impl BuilderStore {
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }

    pub fn set_access_key(&self, access_key: &str) -> Result<BuilderIdentity> {
        let access_key = access_key.trim();
        if access_key.is_empty() || !access_key.is_ascii() || access_key.contains(char::is_whitespace) {
            return Err(AgentWalletError::usage(
                "access key must be a non-empty ASCII token without whitespace",
            ));
        }
        let identity = BuilderIdentity {
            access_key: access_key.to_string(),
            updated_at: Utc::now(),
        };
        self.store
            .save(RecordKind::Builder, IDENTITY_RECORD, &identity)?;
        info!("🔑 Builder access key updated ({})", identity.masked_key());
        Ok(identity)
    }

    pub fn load(&self) -> Result<Option<BuilderIdentity>> {
        self.store.load(RecordKind::Builder, IDENTITY_RECORD)
    }
}

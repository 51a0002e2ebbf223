// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session Envelope Codec
//!
//! The approval page answers a link request with a sealed box holding a JSON
//! envelope. This module opens it with the request's keypair and checks it
//! against the request before anything is persisted.
//!
//! ## Validation order
//!
//! Checks run in a fixed order and stop at the first failure, each with its own
//! error:
//! 1. request not expired
//! 2. `walletAddress` present and a 20-byte hex address
//! 3. `chainId` present and numeric
//! 4. `chainId` is the network the request was created for
//! 5. explicit session material with a signing key
//! 6. implicit session material with signing key, attestation and identity signature
//! 7. `requestId`, when present, names this request

use super::permissions::PermissionRule;
use super::request::SessionRequest;
use crate::config::ChainRegistry;
use crate::crypto::{parse_public_key_hex, seal, RequestKeypair};
use crate::error::{AgentWalletError, Result};
use crate::utils::{checksum, parse_address};
use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Decrypted payload produced by the approval page
///
/// Every field is optional on the wire so that a missing field is reported by
/// [`validate_envelope`] with a precise reason instead of a generic parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    /// Number or numeric string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<Value>,
    #[serde(
        default,
        alias = "explicitSession",
        skip_serializing_if = "Option::is_none"
    )]
    pub explicit_session_material: Option<ExplicitSessionMaterial>,
    #[serde(
        default,
        alias = "implicitSession",
        skip_serializing_if = "Option::is_none"
    )]
    pub implicit_session_material: Option<ImplicitSessionMaterial>,
}

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplicitSessionMaterial {
    #[serde(default)]
    pub signing_key: String,
    #[serde(default)]
    pub derived_session_address: String,
    #[serde(default)]
    pub permission_config: PermissionConfig,
}

impl fmt::Debug for ExplicitSessionMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplicitSessionMaterial")
            .field("signing_key", &"<redacted>")
            .field("derived_session_address", &self.derived_session_address)
            .field("permission_config", &self.permission_config)
            .finish()
    }
}

/// Limits the explicit session was granted with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionConfig {
    /// Unix seconds; 0 when the approval page omitted it
    #[serde(default, deserialize_with = "flexible_i64")]
    pub deadline: i64,
    #[serde(default, deserialize_with = "flexible_string")]
    pub value_limit: String,
    #[serde(default)]
    pub permissions: Vec<PermissionRule>,
}

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplicitSessionMaterial {
    #[serde(default)]
    pub signing_key: String,
    #[serde(default)]
    pub attestation: Value,
    #[serde(default)]
    pub identity_signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_metadata: Option<Value>,
}

impl fmt::Debug for ImplicitSessionMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImplicitSessionMaterial")
            .field("signing_key", &"<redacted>")
            .field("attestation", &self.attestation)
            .field("identity_signature", &"<redacted>")
            .field("login_metadata", &self.login_metadata)
            .finish()
    }
}

fn flexible_i64<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| de::Error::custom("deadline out of range")),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| de::Error::custom(format!("deadline '{}': {}", s, e))),
        other => Err(de::Error::custom(format!(
            "deadline must be a number, got {}",
            other
        ))),
    }
}

fn flexible_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// An envelope that passed every check, with its fields in typed form
#[derive(Debug, Clone)]
pub struct ValidatedEnvelope {
    /// EIP-55 checksummed
    pub wallet_address: String,
    pub chain_id: u64,
    pub chain_name: String,
    pub explicit: ExplicitSessionMaterial,
    pub implicit: ImplicitSessionMaterial,
}

/// Open a sealed envelope addressed to `keypair`
///
/// Any cryptographic failure collapses into [`AgentWalletError::Decryption`]; the
/// detail is only logged at debug level.
pub fn decrypt_envelope(keypair: &RequestKeypair, ciphertext: &str) -> Result<SessionEnvelope> {
    let plaintext = keypair.open(ciphertext).map_err(|e| {
        debug!("Sealed box rejected: {}", e);
        AgentWalletError::Decryption
    })?;

    serde_json::from_slice(&plaintext).map_err(|e| {
        AgentWalletError::validation("envelope", format!("not a valid JSON document: {}", e))
    })
}

/// Seal an envelope for the holder of `public_key_hex` (approval page side)
pub fn seal_envelope(public_key_hex: &str, envelope: &SessionEnvelope) -> Result<String> {
    let recipient = parse_public_key_hex(public_key_hex)
        .map_err(|e| AgentWalletError::validation("publicKey", e.to_string()))?;
    let json = serde_json::to_vec(envelope)
        .map_err(|e| AgentWalletError::validation("envelope", e.to_string()))?;
    seal(&recipient, &json).map_err(|e| AgentWalletError::validation("publicKey", e.to_string()))
}

fn numeric_chain_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn attestation_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !is_blank(s),
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Check `envelope` against the request it answers
pub fn validate_envelope(
    envelope: SessionEnvelope,
    request: &SessionRequest,
    chains: &ChainRegistry,
    now: DateTime<Utc>,
) -> Result<ValidatedEnvelope> {
    if request.is_expired(now) {
        return Err(AgentWalletError::ExpiredRequest {
            request_id: request.request_id.clone(),
            expired_at: request.expires_at.to_rfc3339(),
        });
    }

    let wallet_address = match envelope.wallet_address.as_deref() {
        Some(addr) if !is_blank(addr) => parse_address("walletAddress", addr)
            .map_err(|_| AgentWalletError::validation("walletAddress", "not a 20-byte hex address"))?,
        _ => return Err(AgentWalletError::validation("walletAddress", "missing")),
    };

    let chain_id = envelope
        .chain_id
        .as_ref()
        .and_then(numeric_chain_id)
        .ok_or_else(|| AgentWalletError::validation("chainId", "missing or not numeric"))?;

    if chain_id != request.chain_id {
        return Err(AgentWalletError::validation(
            "chainId",
            format!(
                "session was approved on chain {} but the request was for chain {}",
                chain_id, request.chain_id
            ),
        ));
    }
    let chain_name = chains
        .get_chain(chain_id)
        .map(|c| c.name.clone())
        .ok_or_else(|| {
            AgentWalletError::validation("chainId", format!("unsupported chain {}", chain_id))
        })?;

    let explicit = match envelope.explicit_session_material {
        Some(material) if !is_blank(&material.signing_key) => material,
        Some(_) => {
            return Err(AgentWalletError::validation(
                "explicitSession.signingKey",
                "missing",
            ))
        }
        None => return Err(AgentWalletError::validation("explicitSession", "missing")),
    };

    let implicit = match envelope.implicit_session_material {
        None => return Err(AgentWalletError::validation("implicitSession", "missing")),
        Some(material) => {
            if is_blank(&material.signing_key) {
                return Err(AgentWalletError::validation(
                    "implicitSession.signingKey",
                    "missing",
                ));
            }
            if !attestation_present(&material.attestation) {
                return Err(AgentWalletError::validation(
                    "implicitSession.attestation",
                    "missing",
                ));
            }
            if is_blank(&material.identity_signature) {
                return Err(AgentWalletError::validation(
                    "implicitSession.identitySignature",
                    "missing",
                ));
            }
            material
        }
    };

    if let Some(request_id) = envelope.request_id.as_deref() {
        if request_id != request.request_id {
            return Err(AgentWalletError::validation(
                "requestId",
                format!(
                    "envelope answers request {} not {}",
                    request_id, request.request_id
                ),
            ));
        }
    }

    Ok(ValidatedEnvelope {
        wallet_address: checksum(&wallet_address),
        chain_id,
        chain_name,
        explicit,
        implicit,
    })
}

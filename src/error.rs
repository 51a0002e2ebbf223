// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Domain error taxonomy
//!
//! Every failure that reaches the command handler is one of these variants. Each
//! variant maps to a short machine-parsable label and one actionable next step,
//! which the binary renders as structured output on stderr.
//!
//! ## Retry policy
//!
//! - **Transport**: retryable by re-running the command
//! - **ExpiredRequest / ExpiredSession**: never retried, the wallet must be re-linked
//! - everything else: fatal for the current invocation

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentWalletError {
    /// Missing or conflicting flags; reported before any network call
    #[error("usage error: {0}")]
    Usage(String),

    #[error("session request {request_id} expired at {expired_at}")]
    ExpiredRequest {
        request_id: String,
        expired_at: String,
    },

    #[error("session for wallet '{wallet_name}' expired at {deadline}")]
    ExpiredSession { wallet_name: String, deadline: i64 },

    /// Ciphertext/key mismatch. Deliberately carries no detail about which step failed.
    #[error("failed to decrypt: ciphertext does not match this request")]
    Decryption,

    #[error("invalid session envelope: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("session request {0} was already used to link a wallet")]
    AlreadyConsumed(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("{0}")]
    Transport(String),

    #[error("no usable fee option: {0}")]
    FeeResolution(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Structured rendering of an error for machine consumers
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorReport {
    pub error: String,
    pub message: String,
    pub next_step: String,
    pub retryable: bool,
}

impl AgentWalletError {
    pub fn usage(msg: impl Into<String>) -> Self {
        AgentWalletError::Usage(msg.into())
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AgentWalletError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn wallet_not_found(name: impl Into<String>) -> Self {
        AgentWalletError::NotFound {
            kind: "wallet",
            name: name.into(),
        }
    }

    pub fn request_not_found(id: impl Into<String>) -> Self {
        AgentWalletError::NotFound {
            kind: "session request",
            name: id.into(),
        }
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        AgentWalletError::Storage(err.to_string())
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgentWalletError::Usage(_) => "usage_error",
            AgentWalletError::ExpiredRequest { .. } => "expired_request",
            AgentWalletError::ExpiredSession { .. } => "expired_session",
            AgentWalletError::Decryption => "decryption_error",
            AgentWalletError::Validation { .. } => "validation_error",
            AgentWalletError::AlreadyConsumed(_) => "request_already_used",
            AgentWalletError::NotFound { .. } => "not_found",
            AgentWalletError::Transport(_) => "transport_error",
            AgentWalletError::FeeResolution(_) => "fee_resolution_error",
            AgentWalletError::Storage(_) => "storage_error",
        }
    }

    pub fn next_step(&self) -> String {
        match self {
            AgentWalletError::Usage(_) => "check the command flags with --help".to_string(),
            AgentWalletError::ExpiredRequest { .. } | AgentWalletError::AlreadyConsumed(_) => {
                "re-run wallet create to start a new link request".to_string()
            }
            AgentWalletError::ExpiredSession { wallet_name, .. } => format!(
                "re-run wallet create --name {} to re-link the wallet",
                wallet_name
            ),
            AgentWalletError::Decryption => {
                "make sure the ciphertext was produced for this request id".to_string()
            }
            AgentWalletError::Validation { .. } => {
                "approve the request again from the approval page".to_string()
            }
            AgentWalletError::NotFound { kind, .. } if *kind == "wallet" => {
                "run wallet list, or link one with wallet create".to_string()
            }
            AgentWalletError::NotFound { .. } => {
                "pass --request-id explicitly or re-run wallet create".to_string()
            }
            AgentWalletError::Transport(_) => "re-run the command".to_string(),
            AgentWalletError::FeeResolution(_) => {
                "fund the wallet with the native token or USDC and retry".to_string()
            }
            AgentWalletError::Storage(_) => {
                "check permissions of the agent-wallet home directory".to_string()
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentWalletError::Transport(_))
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            error: self.label().to_string(),
            message: self.to_string(),
            next_step: self.next_step(),
            retryable: self.is_retryable(),
        }
    }
}

impl From<std::io::Error> for AgentWalletError {
    fn from(err: std::io::Error) -> Self {
        AgentWalletError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for AgentWalletError {
    fn from(err: reqwest::Error) -> Self {
        AgentWalletError::Transport(format!("network request failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AgentWalletError>;

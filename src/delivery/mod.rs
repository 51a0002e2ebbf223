// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Delivery Channel
//!
//! Two transports bring the sealed envelope back from the approval page:
//! - **manual**: the user pastes the ciphertext (or points at a file)
//! - **callback**: a single-shot listener on `127.0.0.1` receives a POST
//!
//! Both yield a [`DeliveredCiphertext`].

pub mod callback;
pub mod manual;

pub use callback::{CallbackServer, CALLBACK_BODY_LIMIT, CALLBACK_PATH};
pub use manual::read_manual_ciphertext;

use serde_json::Value;

/// Ciphertext plus the request id hint the approval page may attach
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredCiphertext {
    pub ciphertext: String,
    pub request_id: Option<String>,
}

impl DeliveredCiphertext {
    /// Read `{"ciphertext": "...", "requestId": "..."}`; `None` without a ciphertext
    pub fn from_json(value: &Value) -> Option<Self> {
        let ciphertext = value
            .get("ciphertext")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty())?;
        let request_id = value
            .get("requestId")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        Some(Self {
            ciphertext: ciphertext.to_string(),
            request_id,
        })
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Outbound HTTP instrumentation
//!
//! Clients accept an optional [`HttpObserver`] and report every call to it. The
//! binary installs [`TracingObserver`] when `AGENT_WALLET_DEBUG_HTTP` is set;
//! otherwise no observer is attached and nothing is recorded.

use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const REDACTED: &str = "<redacted>";

pub trait HttpObserver: Send + Sync {
    fn on_request(&self, method: &str, url: &str, body: &Value);
    fn on_response(&self, method: &str, url: &str, status: u16, elapsed: Duration, body: &Value);
    fn on_error(&self, method: &str, url: &str, error: &str);
}

/// Logs calls at debug level with secrets masked
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl HttpObserver for TracingObserver {
    fn on_request(&self, method: &str, url: &str, body: &Value) {
        debug!("➡️ {} {} {}", method, url, redact(body));
    }

    fn on_response(&self, method: &str, url: &str, status: u16, elapsed: Duration, body: &Value) {
        debug!(
            "⬅️ {} {} {} in {}ms {}",
            method,
            url,
            status,
            elapsed.as_millis(),
            redact(body)
        );
    }

    fn on_error(&self, method: &str, url: &str, error: &str) {
        debug!("❌ {} {} failed: {}", method, url, error);
    }
}

fn is_secret_field(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.contains("key") || key.contains("signature") || key.contains("ciphertext")
}

/// Copy of `value` with secret-looking fields replaced
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if is_secret_field(k) && !v.is_null() {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact(v)
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

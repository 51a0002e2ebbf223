// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Manual delivery: ciphertext pasted on the command line or read from a file

use super::DeliveredCiphertext;
use crate::error::{AgentWalletError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

fn strip_quotes(raw: &str) -> &str {
    let trimmed = raw.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].trim();
        }
    }
    trimmed
}

/// Normalize pasted text into a ciphertext
///
/// Accepts a bare ciphertext (optionally quoted) or the JSON object the approval
/// page offers for copying.
pub fn parse_manual_blob(raw: &str) -> Result<DeliveredCiphertext> {
    let text = strip_quotes(raw);
    if text.is_empty() {
        return Err(AgentWalletError::usage("ciphertext is empty"));
    }

    if text.starts_with('{') {
        let value: Value = serde_json::from_str(text).map_err(|e| {
            AgentWalletError::usage(format!("pasted JSON is not valid: {}", e))
        })?;
        return DeliveredCiphertext::from_json(&value).ok_or_else(|| {
            AgentWalletError::usage("pasted JSON has no \"ciphertext\" field")
        });
    }

    Ok(DeliveredCiphertext {
        ciphertext: text.to_string(),
        request_id: None,
    })
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        AgentWalletError::usage(format!(
            "cannot read ciphertext file {}: {}",
            path.display(),
            e
        ))
    })
}

/// Resolve the ciphertext from `--ciphertext` (inline or `@path`) or `--file`
pub fn read_manual_ciphertext(
    ciphertext: Option<&str>,
    file: Option<&Path>,
) -> Result<DeliveredCiphertext> {
    let raw = match (ciphertext, file) {
        (Some(_), Some(_)) => {
            return Err(AgentWalletError::usage(
                "pass either --ciphertext or --file, not both",
            ))
        }
        (Some(arg), None) => match arg.trim().strip_prefix('@') {
            Some(path) => read_file(&PathBuf::from(path))?,
            None => arg.to_string(),
        },
        (None, Some(path)) => read_file(path)?,
        (None, None) => {
            return Err(AgentWalletError::usage(
                "no ciphertext given; pass --ciphertext, --file, or use --callback",
            ))
        }
    };
    parse_manual_blob(&raw)
}

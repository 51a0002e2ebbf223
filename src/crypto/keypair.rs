// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request Keypair
//!
//! Each link request gets its own secp256k1 keypair. The public half travels in
//! the approval URL; the secret half is persisted (encrypted) with the request and
//! is used exactly once to open the returned sealed box.
//!
//! ## Encoding
//!
//! - Secret key: `0x` + 64 hex characters
//! - Public key: `0x` + 66 hex characters (SEC1 compressed point)
//!
//! The secret is never logged; `Debug` only prints the public key.

use super::{sealed_box, CryptoError};
use k256::{elliptic_curve::sec1::ToEncodedPoint, PublicKey, SecretKey};
use rand::rngs::OsRng;
use std::fmt;

#[derive(Clone)]
pub struct RequestKeypair {
    secret: SecretKey,
}

impl RequestKeypair {
    /// Generate a fresh keypair from the OS RNG
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::random(&mut OsRng),
        }
    }

    /// Parse a persisted secret key
    ///
    /// # Errors
    ///
    /// - missing `0x` prefix
    /// - not 64 hex characters
    /// - not a valid secp256k1 scalar
    pub fn from_secret_hex(key_str: &str) -> Result<Self, CryptoError> {
        let key_str = key_str.trim();
        let hex_str = key_str.strip_prefix("0x").ok_or_else(|| CryptoError::InvalidKey {
            key_type: "request_secret_key".to_string(),
            reason: "must start with '0x' prefix".to_string(),
        })?;

        if hex_str.len() != 64 {
            return Err(CryptoError::InvalidKey {
                key_type: "request_secret_key".to_string(),
                reason: format!(
                    "must be exactly 64 hex characters (32 bytes), got {} characters",
                    hex_str.len()
                ),
            });
        }

        let key_bytes = hex::decode(hex_str)?;
        let secret = SecretKey::from_slice(&key_bytes)?;
        Ok(Self { secret })
    }

    pub fn secret_hex(&self) -> String {
        format!("0x{}", hex::encode(self.secret.to_bytes()))
    }

    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    pub fn public_key_hex(&self) -> String {
        format!(
            "0x{}",
            hex::encode(self.public_key().to_encoded_point(true).as_bytes())
        )
    }

    /// Open a sealed box addressed to this keypair
    pub fn open(&self, ciphertext: &str) -> Result<Vec<u8>, CryptoError> {
        sealed_box::open_sealed(&self.secret, ciphertext)
    }
}

impl fmt::Debug for RequestKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestKeypair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// Parse a `0x`-prefixed SEC1 public key as embedded in approval URLs
pub fn parse_public_key_hex(key_str: &str) -> Result<PublicKey, CryptoError> {
    let key_str = key_str.trim();
    let hex_str = key_str.strip_prefix("0x").unwrap_or(key_str);
    let bytes = hex::decode(hex_str)?;
    PublicKey::from_sec1_bytes(&bytes).map_err(|e| CryptoError::InvalidKey {
        key_type: "request_public_key".to_string(),
        reason: format!("not a curve point: {}", e),
    })
}

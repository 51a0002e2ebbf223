// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! AES-GCM at-rest encryption for credential store documents
//!
//! **Encryption Format**:
//! ```text
//! [nonce (12 bytes) | ciphertext+tag (variable length)]
//! ```
//!
//! - Nonce: 12 random bytes, unique per write
//! - Algorithm: AES-256-GCM
//! - AAD: the document's `kind/name` slot, so a file copied to another slot
//!   fails authentication

use super::CryptoError;
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;

const NONCE_LEN: usize = 12;
pub const PASSPHRASE_ROUNDS: u32 = 210_000;

/// Encrypt `plaintext` with a fresh random nonce; returns `nonce | ciphertext+tag`
pub fn encrypt_aes_gcm(plaintext: &[u8], key: &[u8; 32], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::InvalidKey {
        key_type: "store_key".to_string(),
        reason: e.to_string(),
    })?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CryptoError::Other(format!("AES-GCM encryption failed: {}", e)))?;

    let mut encrypted = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    encrypted.extend_from_slice(&nonce_bytes);
    encrypted.extend_from_slice(&ciphertext);
    Ok(encrypted)
}

/// Decrypt `nonce | ciphertext+tag`
///
/// # Errors
///
/// Returns error if:
/// - Encrypted data is shorter than the nonce
/// - Authentication tag verification fails (wrong key, wrong AAD or tampered data)
pub fn decrypt_aes_gcm(encrypted: &[u8], key: &[u8; 32], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if encrypted.len() < NONCE_LEN {
        return Err(CryptoError::InvalidPayload {
            field: "store_document".to_string(),
            reason: format!(
                "too short: expected at least {} bytes for nonce, got {}",
                NONCE_LEN,
                encrypted.len()
            ),
        });
    }

    let (nonce, ciphertext) = encrypted.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::InvalidKey {
        key_type: "store_key".to_string(),
        reason: e.to_string(),
    })?;

    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::DecryptionFailed {
            operation: "aes_gcm".to_string(),
            reason: "authentication error - wrong key or corrupted data".to_string(),
        })
}

/// Derive the store key from an operator-supplied passphrase (PBKDF2-HMAC-SHA256)
pub fn derive_key_from_passphrase(passphrase: &str, salt: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PASSPHRASE_ROUNDS, &mut key);
    key
}

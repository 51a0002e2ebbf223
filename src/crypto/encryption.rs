// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! XChaCha20-Poly1305 Encryption/Decryption
//!
//! Authenticated encryption used inside the sealed box. The 16-byte Poly1305 tag
//! is appended to the ciphertext.

use super::CryptoError;
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};

/// Decrypt data using XChaCha20-Poly1305 AEAD
///
/// # Errors
///
/// Returns error if the authentication tag does not verify (tampered data or
/// wrong key).
pub fn decrypt_with_aead(
    ciphertext: &[u8],
    nonce: &[u8; 24],
    aad: &[u8],
    key: &[u8; 32],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| CryptoError::Other(format!("failed to create cipher: {}", e)))?;
    cipher
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::DecryptionFailed {
            operation: "xchacha20poly1305".to_string(),
            reason: "authentication tag mismatch".to_string(),
        })
}

/// Encrypt data using XChaCha20-Poly1305 AEAD
///
/// # Security
///
/// **CRITICAL**: Never reuse the same nonce with the same key! The sealed box
/// derives a fresh key per message, which is what makes its derived nonce safe.
pub fn encrypt_with_aead(
    plaintext: &[u8],
    nonce: &[u8; 24],
    aad: &[u8],
    key: &[u8; 32],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| CryptoError::Other(format!("failed to create cipher: {}", e)))?;
    cipher
        .encrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CryptoError::Other(format!("encryption failed: {}", e)))
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Sealed Box
//!
//! Anonymous-sender public-key encryption. Anyone holding the request public key
//! can seal a message; only the request secret key can open it.
//!
//! **Wire Format** (base64url, no padding):
//! ```text
//! [sender ephemeral public key (33 bytes, compressed) | ciphertext+tag]
//! ```
//!
//! - Key: HKDF-SHA256 over the ECDH secret, info `agent-wallet sealed box`
//! - Nonce: first 24 bytes of SHA-256(ephemeral public key | recipient public key)
//! - Cipher: XChaCha20-Poly1305, no AAD

use super::{decrypt_with_aead, derive_shared_key, encrypt_with_aead, CryptoError};
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use k256::{elliptic_curve::sec1::ToEncodedPoint, PublicKey, SecretKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

pub const SEALED_BOX_INFO: &[u8] = b"agent-wallet sealed box";
const EPHEMERAL_KEY_LEN: usize = 33;
const TAG_LEN: usize = 16;

fn sealed_nonce(ephemeral_public: &[u8], recipient_public: &[u8]) -> [u8; 24] {
    let digest = Sha256::new()
        .chain_update(ephemeral_public)
        .chain_update(recipient_public)
        .finalize();
    let mut nonce = [0u8; 24];
    nonce.copy_from_slice(&digest[..24]);
    nonce
}

/// Seal `plaintext` to `recipient`, returning the encoded ciphertext string
pub fn seal(recipient: &PublicKey, plaintext: &[u8]) -> Result<String, CryptoError> {
    let ephemeral = SecretKey::random(&mut OsRng);
    let ephemeral_public = ephemeral.public_key().to_encoded_point(true);
    let recipient_public = recipient.to_encoded_point(true);

    let key = derive_shared_key(
        recipient_public.as_bytes(),
        &ephemeral.to_bytes(),
        SEALED_BOX_INFO,
    )?;
    let nonce = sealed_nonce(ephemeral_public.as_bytes(), recipient_public.as_bytes());
    let ciphertext = encrypt_with_aead(plaintext, &nonce, b"", &key)?;

    let mut sealed = Vec::with_capacity(EPHEMERAL_KEY_LEN + ciphertext.len());
    sealed.extend_from_slice(ephemeral_public.as_bytes());
    sealed.extend_from_slice(&ciphertext);
    Ok(URL_SAFE_NO_PAD.encode(sealed))
}

/// Decode a ciphertext string. Approval pages in the wild emit both url-safe and
/// standard alphabets, with or without padding.
fn decode_ciphertext(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    if let Ok(bytes) = URL_SAFE_NO_PAD.decode(&compact) {
        return Ok(bytes);
    }
    if let Ok(bytes) = URL_SAFE.decode(&compact) {
        return Ok(bytes);
    }
    Ok(STANDARD.decode(&compact)?)
}

/// Open a sealed box with the recipient's secret key
pub fn open_sealed(recipient: &SecretKey, encoded: &str) -> Result<Vec<u8>, CryptoError> {
    let sealed = decode_ciphertext(encoded)?;
    if sealed.len() < EPHEMERAL_KEY_LEN + TAG_LEN {
        return Err(CryptoError::InvalidPayload {
            field: "ciphertext".to_string(),
            reason: format!(
                "too short: expected at least {} bytes, got {}",
                EPHEMERAL_KEY_LEN + TAG_LEN,
                sealed.len()
            ),
        });
    }

    let (ephemeral_public, ciphertext) = sealed.split_at(EPHEMERAL_KEY_LEN);
    let recipient_public = recipient.public_key().to_encoded_point(true);

    let key = derive_shared_key(ephemeral_public, &recipient.to_bytes(), SEALED_BOX_INFO)?;
    let nonce = sealed_nonce(ephemeral_public, recipient_public.as_bytes());
    decrypt_with_aead(ciphertext, &nonce, b"", &key)
}

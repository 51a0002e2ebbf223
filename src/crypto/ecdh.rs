// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDH Key Exchange
//!
//! Elliptic Curve Diffie-Hellman over secp256k1 followed by HKDF-SHA256. Both
//! sides of the sealed box derive the same key: the sender from its ephemeral
//! secret and the request public key, the CLI from the request secret and the
//! sender's ephemeral public key.

use super::CryptoError;
use hkdf::Hkdf;
use k256::{PublicKey, SecretKey};
use sha2::Sha256;

/// Derive a 32-byte symmetric key from a peer public key and our secret key
///
/// # Arguments
///
/// * `peer_public` - SEC1 public key (33 bytes compressed or 65 bytes uncompressed)
/// * `own_secret` - 32-byte secp256k1 scalar
/// * `info` - HKDF context string binding the key to its protocol
pub fn derive_shared_key(
    peer_public: &[u8],
    own_secret: &[u8],
    info: &[u8],
) -> Result<[u8; 32], CryptoError> {
    if own_secret.len() != 32 {
        return Err(CryptoError::InvalidKey {
            key_type: "own_secret".to_string(),
            reason: format!("expected 32 bytes, got {}", own_secret.len()),
        });
    }
    if peer_public.len() != 33 && peer_public.len() != 65 {
        return Err(CryptoError::InvalidKey {
            key_type: "peer_public".to_string(),
            reason: format!("expected 33 or 65 bytes, got {}", peer_public.len()),
        });
    }

    let secret = SecretKey::from_slice(own_secret)?;
    let peer = PublicKey::from_sec1_bytes(peer_public).map_err(|e| CryptoError::InvalidKey {
        key_type: "peer_public".to_string(),
        reason: format!("not a curve point: {}", e),
    })?;

    let shared_secret = k256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());

    let hkdf = Hkdf::<Sha256>::new(None, shared_secret.raw_secret_bytes());
    let mut derived_key = [0u8; 32];
    hkdf.expand(info, &mut derived_key)
        .map_err(|e| CryptoError::KeyDerivationFailed {
            operation: "hkdf_expand".to_string(),
            reason: e.to_string(),
        })?;

    Ok(derived_key)
}

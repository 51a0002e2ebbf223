// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cryptographic primitives for the wallet-link handshake
//!
//! - **Keypair**: one-shot secp256k1 keypair generated per link request
//! - **ECDH**: shared-key derivation (secp256k1 + HKDF-SHA256)
//! - **Encryption**: XChaCha20-Poly1305 AEAD
//! - **Sealed box**: anonymous-sender encryption to a request's public key
//! - **AES-GCM**: at-rest encryption of credential store documents
//!
//! ## Protocol Flow
//!
//! 1. CLI generates a request keypair and embeds the public key in the approval URL
//! 2. Approval page generates its own ephemeral keypair and performs ECDH with it
//! 3. Approval page seals the session envelope JSON with the derived key
//! 4. CLI opens the sealed box with the request's private key
//!
//! The request private key never leaves the credential store.

pub mod aes_gcm;
pub mod ecdh;
pub mod encryption;
pub mod error;
pub mod keypair;
pub mod sealed_box;

pub use aes_gcm::{decrypt_aes_gcm, derive_key_from_passphrase, encrypt_aes_gcm};
pub use ecdh::derive_shared_key;
pub use encryption::{decrypt_with_aead, encrypt_with_aead};
pub use error::CryptoError;
pub use keypair::{parse_public_key_hex, RequestKeypair};
pub use sealed_box::{open_sealed, seal};

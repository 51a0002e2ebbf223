// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Sealing, opening and validating session envelopes

use crate::common::{chains, open_store, request_registry, valid_envelope, WALLET_ADDRESS};
use agent_wallet::crypto::RequestKeypair;
use agent_wallet::session::{
    decrypt_envelope, seal_envelope, validate_envelope, LinkOptions, SessionRequest,
};
use agent_wallet::AgentWalletError;
use chrono::{Duration, Utc};
use serde_json::json;
use tempfile::TempDir;

fn pending_request(dir: &TempDir) -> SessionRequest {
    request_registry(&open_store(dir))
        .create_request("trader", "polygon", None, &LinkOptions::default())
        .unwrap()
        .request
}

fn field_of(err: AgentWalletError) -> String {
    match err {
        AgentWalletError::Validation { field, .. } => field,
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_seal_then_decrypt_with_request_key() {
    let dir = TempDir::new().unwrap();
    let request = pending_request(&dir);
    let envelope = valid_envelope(&request);

    let ciphertext = seal_envelope(&request.public_key, &envelope).unwrap();
    let opened = decrypt_envelope(&request.keypair().unwrap(), &ciphertext).unwrap();

    assert_eq!(opened.wallet_address.as_deref(), Some(WALLET_ADDRESS));
    assert_eq!(opened.request_id, Some(request.request_id.clone()));
    assert_eq!(
        opened.explicit_session_material,
        envelope.explicit_session_material
    );
}

#[test]
fn test_wrong_keypair_is_decryption_error() {
    let dir = TempDir::new().unwrap();
    let request = pending_request(&dir);
    let ciphertext = seal_envelope(&request.public_key, &valid_envelope(&request)).unwrap();

    let err = decrypt_envelope(&RequestKeypair::generate(), &ciphertext).unwrap_err();
    assert!(matches!(err, AgentWalletError::Decryption));
}

#[test]
fn test_garbage_ciphertext_is_decryption_error() {
    let keypair = RequestKeypair::generate();
    let err = decrypt_envelope(&keypair, "not-base64-at-all!!").unwrap_err();
    assert!(matches!(err, AgentWalletError::Decryption));
}

#[test]
fn test_valid_envelope_passes() {
    let dir = TempDir::new().unwrap();
    let request = pending_request(&dir);

    let validated =
        validate_envelope(valid_envelope(&request), &request, &chains(), Utc::now()).unwrap();
    assert_eq!(validated.chain_id, 137);
    assert_eq!(validated.chain_name, "polygon");
    assert_eq!(validated.wallet_address, WALLET_ADDRESS);
}

#[test]
fn test_string_chain_id_accepted() {
    let dir = TempDir::new().unwrap();
    let request = pending_request(&dir);
    let mut envelope = valid_envelope(&request);
    envelope.chain_id = Some(json!("137"));

    assert!(validate_envelope(envelope, &request, &chains(), Utc::now()).is_ok());
}

#[test]
fn test_chain_mismatch_rejected() {
    let dir = TempDir::new().unwrap();
    let request = pending_request(&dir);
    let mut envelope = valid_envelope(&request);
    envelope.chain_id = Some(json!(8453));

    let err = validate_envelope(envelope, &request, &chains(), Utc::now()).unwrap_err();
    assert_eq!(field_of(err), "chainId");
}

#[test]
fn test_each_required_field_reported() {
    let dir = TempDir::new().unwrap();
    let request = pending_request(&dir);
    let now = Utc::now();

    let mut no_address = valid_envelope(&request);
    no_address.wallet_address = None;
    let mut bad_address = valid_envelope(&request);
    bad_address.wallet_address = Some("0x1234".into());
    let mut no_chain = valid_envelope(&request);
    no_chain.chain_id = None;
    let mut no_explicit = valid_envelope(&request);
    no_explicit.explicit_session_material = None;
    let mut blank_explicit_key = valid_envelope(&request);
    if let Some(m) = blank_explicit_key.explicit_session_material.as_mut() {
        m.signing_key = "  ".into();
    }
    let mut no_implicit = valid_envelope(&request);
    no_implicit.implicit_session_material = None;
    let mut no_attestation = valid_envelope(&request);
    if let Some(m) = no_attestation.implicit_session_material.as_mut() {
        m.attestation = json!({});
    }
    let mut no_identity_sig = valid_envelope(&request);
    if let Some(m) = no_identity_sig.implicit_session_material.as_mut() {
        m.identity_signature = String::new();
    }
    let mut wrong_request = valid_envelope(&request);
    wrong_request.request_id = Some("ffffffffffffffffffffffffffffffff".into());

    let cases = vec![
        (no_address, "walletAddress"),
        (bad_address, "walletAddress"),
        (no_chain, "chainId"),
        (no_explicit, "explicitSession"),
        (blank_explicit_key, "explicitSession.signingKey"),
        (no_implicit, "implicitSession"),
        (no_attestation, "implicitSession.attestation"),
        (no_identity_sig, "implicitSession.identitySignature"),
        (wrong_request, "requestId"),
    ];
    for (envelope, expected) in cases {
        let err = validate_envelope(envelope, &request, &chains(), now).unwrap_err();
        assert_eq!(field_of(err), expected);
    }
}

#[test]
fn test_expired_request_checked_first() {
    let dir = TempDir::new().unwrap();
    let request = pending_request(&dir);
    let mut envelope = valid_envelope(&request);
    envelope.wallet_address = None;

    let later = request.expires_at + Duration::seconds(1);
    let err = validate_envelope(envelope, &request, &chains(), later).unwrap_err();
    assert!(matches!(err, AgentWalletError::ExpiredRequest { .. }));
}

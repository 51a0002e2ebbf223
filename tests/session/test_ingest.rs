// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! End-to-end ingestion: ciphertext in, wallet session out

use crate::common::{linker, open_store, valid_envelope, WALLET_ADDRESS};
use agent_wallet::session::{seal_envelope, LinkOptions};
use agent_wallet::AgentWalletError;
use chrono::{Duration, Utc};
use tempfile::TempDir;

#[test]
fn test_ingest_links_wallet_and_consumes_request() {
    let dir = TempDir::new().unwrap();
    let linker = linker(&open_store(&dir));

    let link = linker
        .requests()
        .create_request("trader", "polygon", Some("AQAAkey".into()), &LinkOptions::default())
        .unwrap();
    let request = link.request;
    let ciphertext = seal_envelope(&request.public_key, &valid_envelope(&request)).unwrap();

    let session = linker
        .ingest(Some(&request.request_id), None, &ciphertext)
        .unwrap();
    assert_eq!(session.wallet_name, "trader");
    assert_eq!(session.wallet_address, WALLET_ADDRESS);
    assert_eq!(session.access_key.as_deref(), Some("AQAAkey"));
    assert!(!session.is_expired(Utc::now()));

    let stored = linker.wallets().require("trader").unwrap();
    assert_eq!(stored.request_id, request.request_id);

    let reloaded = linker
        .requests()
        .load_request(&request.request_id)
        .unwrap()
        .unwrap();
    assert!(reloaded.is_consumed());

    // Replaying the same ciphertext is refused
    let err = linker
        .ingest(Some(&request.request_id), None, &ciphertext)
        .unwrap_err();
    assert!(matches!(err, AgentWalletError::AlreadyConsumed(_)));
}

#[test]
fn test_ingest_auto_detects_request_by_name() {
    let dir = TempDir::new().unwrap();
    let linker = linker(&open_store(&dir));

    let request = linker
        .requests()
        .create_request("scout", "polygon", None, &LinkOptions::default())
        .unwrap()
        .request;
    let ciphertext = seal_envelope(&request.public_key, &valid_envelope(&request)).unwrap();

    let session = linker.ingest(None, Some("scout"), &ciphertext).unwrap();
    assert_eq!(session.request_id, request.request_id);
}

#[test]
fn test_ingest_without_selector_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let linker = linker(&open_store(&dir));

    let err = linker.ingest(None, None, "abc").unwrap_err();
    assert_eq!(err.label(), "usage_error");
}

#[test]
fn test_ingest_unknown_request_not_found() {
    let dir = TempDir::new().unwrap();
    let linker = linker(&open_store(&dir));

    let err = linker
        .ingest(Some("0000000000000000000000000000dead"), None, "abc")
        .unwrap_err();
    assert_eq!(err.label(), "not_found");
}

#[test]
fn test_ingest_name_mismatch_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let linker = linker(&open_store(&dir));

    let request = linker
        .requests()
        .create_request("scout", "polygon", None, &LinkOptions::default())
        .unwrap()
        .request;
    let ciphertext = seal_envelope(&request.public_key, &valid_envelope(&request)).unwrap();

    let err = linker
        .ingest(Some(&request.request_id), Some("other"), &ciphertext)
        .unwrap_err();
    assert_eq!(err.label(), "usage_error");
    assert!(linker.wallets().load("scout").unwrap().is_none());
}

#[test]
fn test_expired_request_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let linker = linker(&open_store(&dir));

    let request = linker
        .requests()
        .create_request("late", "polygon", None, &LinkOptions::default())
        .unwrap()
        .request;
    let ciphertext = seal_envelope(&request.public_key, &valid_envelope(&request)).unwrap();

    let after_expiry = request.expires_at + Duration::minutes(1);
    let err = linker
        .ingest_at(after_expiry, Some(&request.request_id), None, &ciphertext)
        .unwrap_err();
    assert!(matches!(err, AgentWalletError::ExpiredRequest { .. }));
    assert!(linker.wallets().load("late").unwrap().is_none());

    let reloaded = linker
        .requests()
        .load_request(&request.request_id)
        .unwrap()
        .unwrap();
    assert!(!reloaded.is_consumed());
}

#[test]
fn test_failed_decryption_leaves_request_pending() {
    let dir = TempDir::new().unwrap();
    let linker = linker(&open_store(&dir));

    let target = linker
        .requests()
        .create_request("alpha", "polygon", None, &LinkOptions::default())
        .unwrap()
        .request;
    let other = linker
        .requests()
        .create_request("beta", "polygon", None, &LinkOptions::default())
        .unwrap()
        .request;
    // Sealed for a different request's key
    let ciphertext = seal_envelope(&other.public_key, &valid_envelope(&target)).unwrap();

    let err = linker
        .ingest(Some(&target.request_id), None, &ciphertext)
        .unwrap_err();
    assert!(matches!(err, AgentWalletError::Decryption));
    assert!(linker.wallets().list().unwrap().is_empty());
    assert_eq!(
        linker
            .requests()
            .find_request_by_wallet_name("alpha", Utc::now())
            .unwrap(),
        Some(target.request_id)
    );
}

#[test]
fn test_relink_replaces_existing_session() {
    let dir = TempDir::new().unwrap();
    let linker = linker(&open_store(&dir));

    for _ in 0..2 {
        let request = linker
            .requests()
            .create_request("trader", "polygon", None, &LinkOptions::default())
            .unwrap()
            .request;
        let ciphertext = seal_envelope(&request.public_key, &valid_envelope(&request)).unwrap();
        let session = linker.ingest(None, Some("trader"), &ciphertext).unwrap();
        assert_eq!(session.request_id, request.request_id);
    }
    assert_eq!(linker.wallets().list().unwrap().len(), 1);
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Encrypted credential store on a real filesystem

use agent_wallet::storage::{CredentialStore, RecordKind};
use serde::{Deserialize, Serialize};
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Record {
    label: String,
    secret: String,
}

fn record(label: &str) -> Record {
    Record {
        label: label.into(),
        secret: "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318".into(),
    }
}

#[test]
fn test_save_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::open(dir.path(), None).unwrap();

    store.save(RecordKind::Wallets, "alpha", &record("a")).unwrap();
    let loaded: Option<Record> = store.load(RecordKind::Wallets, "alpha").unwrap();
    assert_eq!(loaded, Some(record("a")));

    let missing: Option<Record> = store.load(RecordKind::Wallets, "beta").unwrap();
    assert_eq!(missing, None);
}

#[test]
fn test_plaintext_never_on_disk() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::open(dir.path(), None).unwrap();
    store.save(RecordKind::Wallets, "alpha", &record("a")).unwrap();

    let on_disk = fs::read_to_string(dir.path().join("wallets").join("alpha.json")).unwrap();
    assert!(!on_disk.contains("4c0883a69102937d"));
}

#[test]
fn test_reopen_uses_same_key() {
    let dir = TempDir::new().unwrap();
    CredentialStore::open(dir.path(), None)
        .unwrap()
        .save(RecordKind::Requests, "r1", &record("r"))
        .unwrap();

    let reopened = CredentialStore::open(dir.path(), None).unwrap();
    let loaded: Option<Record> = reopened.load(RecordKind::Requests, "r1").unwrap();
    assert_eq!(loaded, Some(record("r")));
}

#[test]
fn test_document_bound_to_its_slot() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::open(dir.path(), None).unwrap();
    store.save(RecordKind::Wallets, "alpha", &record("a")).unwrap();

    let wallets = dir.path().join("wallets");
    fs::copy(wallets.join("alpha.json"), wallets.join("beta.json")).unwrap();

    let err = store
        .load::<Record>(RecordKind::Wallets, "beta")
        .unwrap_err();
    assert_eq!(err.label(), "storage_error");
}

#[test]
fn test_list_sorted_and_delete() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::open(dir.path(), None).unwrap();
    assert!(store.list(RecordKind::Wallets).unwrap().is_empty());

    for name in ["zeta", "alpha", "mid"] {
        store.save(RecordKind::Wallets, name, &record(name)).unwrap();
    }
    assert_eq!(
        store.list(RecordKind::Wallets).unwrap(),
        vec!["alpha", "mid", "zeta"]
    );
    assert!(store.list(RecordKind::Requests).unwrap().is_empty());

    assert!(store.delete(RecordKind::Wallets, "mid").unwrap());
    assert!(!store.delete(RecordKind::Wallets, "mid").unwrap());
    assert_eq!(store.list(RecordKind::Wallets).unwrap(), vec!["alpha", "zeta"]);
}

#[test]
fn test_invalid_names_rejected() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::open(dir.path(), None).unwrap();

    for name in ["", "../escape", "a/b", ".hidden"] {
        assert!(
            store.save(RecordKind::Wallets, name, &record("x")).is_err(),
            "accepted name '{}'",
            name
        );
    }
}

#[test]
fn test_passphrase_store_needs_same_passphrase() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::open(dir.path(), Some("correct horse")).unwrap();
    store.save(RecordKind::Builder, "default", &record("b")).unwrap();

    let same = CredentialStore::open(dir.path(), Some("correct horse")).unwrap();
    assert_eq!(
        same.load::<Record>(RecordKind::Builder, "default").unwrap(),
        Some(record("b"))
    );

    let wrong = CredentialStore::open(dir.path(), Some("battery staple")).unwrap();
    assert!(wrong.load::<Record>(RecordKind::Builder, "default").is_err());
}

#[cfg(unix)]
#[test]
fn test_files_are_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let store = CredentialStore::open(dir.path(), None).unwrap();
    store.save(RecordKind::Wallets, "alpha", &record("a")).unwrap();

    let file_mode = fs::metadata(dir.path().join("wallets").join("alpha.json"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(file_mode & 0o777, 0o600);
    let dir_mode = fs::metadata(dir.path().join("wallets"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(dir_mode & 0o777, 0o700);
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Link request lifecycle: creation, persistence and lookup by wallet name

use crate::common::{open_store, request_registry};
use agent_wallet::session::{LinkOptions, REQUEST_TTL_HOURS};
use agent_wallet::AgentWalletError;
use chrono::{Duration, Utc};
use tempfile::TempDir;

#[test]
fn test_created_request_round_trips_through_store() {
    let dir = TempDir::new().unwrap();
    let registry = request_registry(&open_store(&dir));

    let link = registry
        .create_request("trader", "polygon", None, &LinkOptions::default())
        .unwrap();
    let loaded = registry
        .load_request(&link.request.request_id)
        .unwrap()
        .expect("request should be persisted");

    assert_eq!(loaded.wallet_name, "trader");
    assert_eq!(loaded.chain_id, 137);
    assert_eq!(
        loaded.expires_at - loaded.created_at,
        Duration::hours(REQUEST_TTL_HOURS)
    );
    assert!(!loaded.is_consumed());

    // The URL carries exactly the stored public key
    let public_key = link
        .approval_url
        .query_pairs()
        .find(|(k, _)| k == "publicKey")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert_eq!(public_key, loaded.public_key);
}

#[test]
fn test_approval_url_names_canonical_chain() {
    let dir = TempDir::new().unwrap();
    let registry = request_registry(&open_store(&dir));

    let options = LinkOptions {
        callback_url: Some("http://localhost:4455/callback".into()),
        ..Default::default()
    };
    let link = registry
        .create_request("ops", "8453", Some("AQAAkey".into()), &options)
        .unwrap();

    let pairs: Vec<(String, String)> = link
        .approval_url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert!(pairs.contains(&("chain".into(), "base".into())));
    assert!(pairs.contains(&("chainId".into(), "8453".into())));
    assert!(pairs.contains(&("callbackUrl".into(), "http://localhost:4455/callback".into())));
    assert!(pairs.contains(&("accessKey".into(), "AQAAkey".into())));
    assert_eq!(link.request.chain_identifier, "8453");
}

#[test]
fn test_unknown_chain_creates_nothing() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let registry = request_registry(&store);

    let err = registry
        .create_request("bot", "dogechain", None, &LinkOptions::default())
        .unwrap_err();
    assert_eq!(err.label(), "usage_error");
    assert!(store
        .list(agent_wallet::RecordKind::Requests)
        .unwrap()
        .is_empty());
}

#[test]
fn test_find_by_wallet_name_single_pending() {
    let dir = TempDir::new().unwrap();
    let registry = request_registry(&open_store(&dir));

    let link = registry
        .create_request("alpha", "polygon", None, &LinkOptions::default())
        .unwrap();
    registry
        .create_request("beta", "polygon", None, &LinkOptions::default())
        .unwrap();

    let found = registry
        .find_request_by_wallet_name("alpha", Utc::now())
        .unwrap();
    assert_eq!(found, Some(link.request.request_id));
    assert_eq!(
        registry
            .find_request_by_wallet_name("gamma", Utc::now())
            .unwrap(),
        None
    );
}

#[test]
fn test_find_by_wallet_name_ambiguous() {
    let dir = TempDir::new().unwrap();
    let registry = request_registry(&open_store(&dir));

    let first = registry
        .create_request("alpha", "polygon", None, &LinkOptions::default())
        .unwrap();
    let second = registry
        .create_request("alpha", "polygon", None, &LinkOptions::default())
        .unwrap();

    let err = registry
        .find_request_by_wallet_name("alpha", Utc::now())
        .unwrap_err();
    match err {
        AgentWalletError::Usage(msg) => {
            assert!(msg.contains(&first.request.request_id));
            assert!(msg.contains(&second.request.request_id));
        }
        other => panic!("expected usage error, got {:?}", other),
    }
}

#[test]
fn test_find_by_wallet_name_skips_consumed_and_expired() {
    let dir = TempDir::new().unwrap();
    let registry = request_registry(&open_store(&dir));
    let now = Utc::now();

    let mut consumed = registry
        .create_request("alpha", "polygon", None, &LinkOptions::default())
        .unwrap()
        .request;
    registry.mark_consumed(&mut consumed, now).unwrap();

    registry
        .create_request_at(
            now - Duration::hours(3),
            "alpha",
            "polygon",
            None,
            &LinkOptions::default(),
        )
        .unwrap();

    let fresh = registry
        .create_request("alpha", "polygon", None, &LinkOptions::default())
        .unwrap();

    assert_eq!(
        registry.find_request_by_wallet_name("alpha", now).unwrap(),
        Some(fresh.request.request_id)
    );
}

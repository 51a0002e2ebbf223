// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Dispatcher behaviour against a recording wallet client

use crate::common::{chains, fee_option, linked_wallet, open_store, RecordingWalletClient};
use agent_wallet::config::TokenResolver;
use agent_wallet::dispatch::{token_transfer, DispatchRequest, FeePreference, TransactionDispatcher};
use agent_wallet::session::WalletSessionStore;
use agent_wallet::storage::CredentialStore;
use agent_wallet::wallet_client::{FeeTokenList, WalletClient};
use agent_wallet::AgentWalletError;
use chrono::Utc;
use std::sync::Arc;
use tempfile::TempDir;

const RECIPIENT: &str = "0x4444444444444444444444444444444444444444";

fn dispatcher(
    store: &CredentialStore,
    client: Option<Arc<RecordingWalletClient>>,
) -> TransactionDispatcher {
    let client: Option<Arc<dyn WalletClient>> = client.map(|c| c as Arc<dyn WalletClient>);
    TransactionDispatcher::new(WalletSessionStore::new(store.clone()), chains(), client)
}

fn send_one_pol(wallet_name: &str, broadcast: bool) -> DispatchRequest {
    let pol = chains().resolve_token(137, "POL").unwrap();
    DispatchRequest {
        wallet_name: wallet_name.into(),
        chain_id: None,
        transactions: vec![token_transfer(&pol, RECIPIENT, "1").unwrap()],
        broadcast,
        fee_preference: FeePreference::Default,
    }
}

fn tomorrow() -> i64 {
    Utc::now().timestamp() + 86_400
}

#[tokio::test]
async fn test_dry_run_makes_no_client_calls() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    linked_wallet(&store, "bot", tomorrow());
    let client = Arc::new(RecordingWalletClient::new());

    let outcome = dispatcher(&store, Some(client.clone()))
        .execute(send_one_pol("bot", false))
        .await
        .unwrap();
    assert!(outcome.dry_run);
    assert_eq!(outcome.tx_hash, None);
    assert_eq!(outcome.transactions.len(), 1);
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_dry_run_works_without_runtime() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    linked_wallet(&store, "bot", tomorrow());

    let outcome = dispatcher(&store, None)
        .execute(send_one_pol("bot", false))
        .await
        .unwrap();
    assert!(outcome.dry_run);
}

#[tokio::test]
async fn test_expired_session_refused_before_any_call() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    linked_wallet(&store, "bot", Utc::now().timestamp() - 1);
    let client = Arc::new(RecordingWalletClient::new());

    let err = dispatcher(&store, Some(client.clone()))
        .execute(send_one_pol("bot", true))
        .await
        .unwrap_err();
    match err {
        AgentWalletError::ExpiredSession { wallet_name, .. } => assert_eq!(wallet_name, "bot"),
        other => panic!("expected expired session, got {:?}", other),
    }
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_missing_deadline_counts_as_expired() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    linked_wallet(&store, "bot", 0);

    let err = dispatcher(&store, None)
        .execute(send_one_pol("bot", false))
        .await
        .unwrap_err();
    assert_eq!(err.label(), "expired_session");
}

#[tokio::test]
async fn test_unknown_wallet_not_found() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let err = dispatcher(&store, None)
        .execute(send_one_pol("ghost", false))
        .await
        .unwrap_err();
    assert_eq!(err.label(), "not_found");
}

#[tokio::test]
async fn test_chain_mismatch_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    linked_wallet(&store, "bot", tomorrow());

    let mut request = send_one_pol("bot", false);
    request.chain_id = Some(8453);
    let err = dispatcher(&store, None).execute(request).await.unwrap_err();
    assert_eq!(err.label(), "usage_error");
}

#[tokio::test]
async fn test_broadcast_without_runtime_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    linked_wallet(&store, "bot", tomorrow());

    let err = dispatcher(&store, None)
        .execute(send_one_pol("bot", true))
        .await
        .unwrap_err();
    assert_eq!(err.label(), "usage_error");
    assert!(err.to_string().contains("AGENT_WALLET_RUNTIME_URL"));
}

#[tokio::test]
async fn test_broadcast_connects_quotes_and_sends() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    linked_wallet(&store, "bot", tomorrow());
    let client = Arc::new(
        RecordingWalletClient::new().with_fee_options(vec![vec![fee_option("POL", None)]]),
    );

    let outcome = dispatcher(&store, Some(client.clone()))
        .execute(send_one_pol("bot", true))
        .await
        .unwrap();

    assert!(!outcome.dry_run);
    let tx_hash = outcome.tx_hash.clone().unwrap();
    assert!(tx_hash.starts_with("0x5e1f"));
    assert_eq!(
        outcome.explorer_url.as_deref(),
        Some(format!("https://polygonscan.com/tx/{}", tx_hash).as_str())
    );
    assert_eq!(outcome.fee_option.as_ref().map(|f| f.symbol.as_str()), Some("POL"));
    assert_eq!(
        client.calls(),
        vec!["initialize", "connect", "get_fee_options", "send_transaction"]
    );
}

#[tokio::test]
async fn test_no_fee_required_sends_without_fee() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    linked_wallet(&store, "bot", tomorrow());
    let client = Arc::new(RecordingWalletClient::new().with_fee_tokens(FeeTokenList {
        fee_required: false,
        payment_address: None,
        tokens: vec![],
    }));

    let outcome = dispatcher(&store, Some(client.clone()))
        .execute(send_one_pol("bot", true))
        .await
        .unwrap();
    assert!(outcome.tx_hash.is_some());
    assert_eq!(outcome.fee_option, None);
    assert_eq!(*client.sent_fee.lock().unwrap(), Some(None));
}

#[tokio::test]
async fn test_fee_failure_sends_nothing() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    linked_wallet(&store, "bot", tomorrow());
    let client = Arc::new(RecordingWalletClient::new());

    let err = dispatcher(&store, Some(client.clone()))
        .execute(send_one_pol("bot", true))
        .await
        .unwrap_err();
    assert_eq!(err.label(), "fee_resolution_error");
    assert!(!client.calls().contains(&"send_transaction".to_string()));
}

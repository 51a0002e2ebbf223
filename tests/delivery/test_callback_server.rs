// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Loopback callback listener behaviour over real HTTP

use agent_wallet::delivery::{CallbackServer, CALLBACK_BODY_LIMIT};
use agent_wallet::AgentWalletError;
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;

fn endpoint(server: &CallbackServer) -> String {
    format!("http://{}/callback", server.local_addr())
}

#[tokio::test]
async fn test_timeout_reports_and_closes_listener() {
    let server = CallbackServer::bind().await.unwrap();
    let addr = server.local_addr();

    let err = server.wait(Duration::from_secs(1)).await.unwrap_err();
    match err {
        AgentWalletError::Transport(msg) => {
            assert_eq!(msg, "timed out waiting for callback (1s)")
        }
        other => panic!("expected transport error, got {:?}", other),
    }

    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_json_post_resolves_wait() {
    let server = CallbackServer::bind().await.unwrap();
    let url = endpoint(&server);

    let response = reqwest::Client::new()
        .post(&url)
        .json(&json!({"ciphertext": "c2VhbGVk", "requestId": "abc123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = response.text().await.unwrap();
    assert!(page.contains("close this tab"));

    let delivered = server.wait(Duration::from_secs(5)).await.unwrap();
    assert_eq!(delivered.ciphertext, "c2VhbGVk");
    assert_eq!(delivered.request_id.as_deref(), Some("abc123"));
}

#[tokio::test]
async fn test_form_post_resolves_wait() {
    let server = CallbackServer::bind().await.unwrap();
    let url = endpoint(&server);

    let response = reqwest::Client::new()
        .post(&url)
        .form(&[("ciphertext", "Zm9ybQ")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let delivered = server.wait(Duration::from_secs(5)).await.unwrap();
    assert_eq!(delivered.ciphertext, "Zm9ybQ");
    assert_eq!(delivered.request_id, None);
}

#[tokio::test]
async fn test_oversized_body_rejected_then_valid_post_accepted() {
    let server = CallbackServer::bind().await.unwrap();
    let url = endpoint(&server);

    let huge = "A".repeat(70 * 1024);
    assert!(huge.len() > CALLBACK_BODY_LIMIT);
    let oversized = reqwest::Client::new()
        .post(&url)
        .json(&json!({ "ciphertext": huge }))
        .send()
        .await;
    // Either an explicit 413 or the connection is cut while uploading
    if let Ok(response) = oversized {
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    let small = "B".repeat(1024);
    let response = reqwest::Client::new()
        .post(&url)
        .json(&json!({ "ciphertext": small }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let delivered = server.wait(Duration::from_secs(5)).await.unwrap();
    assert_eq!(delivered.ciphertext.len(), 1024);
}

#[tokio::test]
async fn test_second_post_conflicts_and_first_wins() {
    let server = CallbackServer::bind().await.unwrap();
    let url = endpoint(&server);
    let client = reqwest::Client::new();

    let first = client
        .post(&url)
        .json(&json!({"ciphertext": "first"}))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = client
        .post(&url)
        .json(&json!({"ciphertext": "second"}))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let delivered = server.wait(Duration::from_secs(5)).await.unwrap();
    assert_eq!(delivered.ciphertext, "first");
}

#[tokio::test]
async fn test_bad_requests_do_not_resolve_wait() {
    let server = CallbackServer::bind().await.unwrap();
    let base = format!("http://{}", server.local_addr());
    let client = reqwest::Client::new();

    let get = client.get(format!("{}/callback", base)).send().await.unwrap();
    assert_eq!(get.status(), StatusCode::METHOD_NOT_ALLOWED);

    let other_path = client
        .post(format!("{}/elsewhere", base))
        .json(&json!({"ciphertext": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(other_path.status(), StatusCode::NOT_FOUND);

    let missing = client
        .post(format!("{}/callback", base))
        .json(&json!({"requestId": "abc"}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    // None of the above delivered anything
    let err = server.wait(Duration::from_secs(1)).await.unwrap_err();
    assert_eq!(err.label(), "transport_error");
}

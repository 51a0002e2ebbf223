// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Callback Server
//!
//! An ephemeral HTTP listener bound to `127.0.0.1` on an OS-assigned port. The
//! approval page POSTs the sealed envelope to `/callback`; the first well-formed
//! POST resolves the waiting CLI and every later one gets 409.
//!
//! The handler and [`CallbackServer::wait`] share a single oneshot sender behind a
//! mutex. Whoever takes it first owns the resolution.
//!
//! The listener is shut down when the wait returns, whether a ciphertext arrived
//! or the timeout fired.

use super::DeliveredCiphertext;
use crate::error::{AgentWalletError, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

pub const CALLBACK_PATH: &str = "/callback";
/// Hard ceiling on callback bodies; larger bodies are answered with 413
pub const CALLBACK_BODY_LIMIT: usize = 64 * 1024;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

const SUCCESS_PAGE: &str = "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>Wallet linked</title></head>\
<body><h1>Wallet session received</h1><p>You can close this tab and return to your terminal.</p></body></html>\n";

struct CallbackState {
    slot: Mutex<Option<oneshot::Sender<DeliveredCiphertext>>>,
}

pub struct CallbackServer {
    addr: SocketAddr,
    receiver: Option<oneshot::Receiver<DeliveredCiphertext>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Bind `127.0.0.1:0` and start serving in the background
    pub async fn bind() -> Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| AgentWalletError::Transport(format!("cannot bind callback listener: {}", e)))?;
        let addr = listener.local_addr()?;

        let (payload_tx, payload_rx) = oneshot::channel();
        let state = Arc::new(CallbackState {
            slot: Mutex::new(Some(payload_tx)),
        });
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = create_router(state);
        let handle = tokio::spawn(async move {
            let serve_future = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve_future.await {
                warn!("Callback server stopped with error: {}", e);
            }
        });

        info!("📡 Callback server listening on {}", addr);
        Ok(Self {
            addr,
            receiver: Some(payload_rx),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// URL embedded in the approval link
    pub fn callback_url(&self) -> String {
        format!("http://localhost:{}{}", self.addr.port(), CALLBACK_PATH)
    }

    /// Block until a ciphertext arrives or `timeout` elapses, then close the listener
    pub async fn wait(mut self, timeout: Duration) -> Result<DeliveredCiphertext> {
        let receiver = self.receiver.take().ok_or_else(|| {
            AgentWalletError::Transport("callback server already waited".to_string())
        })?;

        let outcome = tokio::time::timeout(timeout, receiver).await;
        self.shutdown().await;

        match outcome {
            Ok(Ok(payload)) => {
                info!("📨 Ciphertext received on callback");
                Ok(payload)
            }
            Ok(Err(_)) => Err(AgentWalletError::Transport(
                "callback server stopped before a ciphertext arrived".to_string(),
            )),
            Err(_) => Err(AgentWalletError::Transport(format!(
                "timed out waiting for callback ({}s)",
                timeout.as_secs()
            ))),
        }
    }

    async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut handle) = self.handle.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                debug!("Callback server did not drain in time, aborting");
                handle.abort();
                let _ = handle.await;
            }
        }
        debug!("Callback listener on {} closed", self.addr);
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn create_router(state: Arc<CallbackState>) -> Router {
    Router::new()
        .route(CALLBACK_PATH, post(callback_handler))
        .layer(DefaultBodyLimit::max(CALLBACK_BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Accepts JSON or form bodies carrying `ciphertext` (and optionally `requestId`)
fn parse_payload(headers: &HeaderMap, body: &[u8]) -> Option<DeliveredCiphertext> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let looks_like_json = content_type.starts_with("application/json")
        || body.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{');

    if looks_like_json {
        let value: Value = serde_json::from_slice(body).ok()?;
        return DeliveredCiphertext::from_json(&value);
    }

    let mut ciphertext = None;
    let mut request_id = None;
    for (key, value) in url::form_urlencoded::parse(body) {
        match key.as_ref() {
            "ciphertext" => ciphertext = Some(value.trim().to_string()),
            "requestId" => request_id = Some(value.trim().to_string()),
            _ => {}
        }
    }
    let ciphertext = ciphertext.filter(|c| !c.is_empty())?;
    Some(DeliveredCiphertext {
        ciphertext,
        request_id: request_id.filter(|id| !id.is_empty()),
    })
}

async fn callback_handler(
    State(state): State<Arc<CallbackState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload = match parse_payload(&headers, &body) {
        Some(payload) => payload,
        None => {
            debug!("Callback body without ciphertext ({} bytes)", body.len());
            return (StatusCode::BAD_REQUEST, "missing ciphertext\n").into_response();
        }
    };

    let sender = state.slot.lock().await.take();
    match sender {
        Some(tx) => match tx.send(payload) {
            Ok(()) => Html(SUCCESS_PAGE).into_response(),
            Err(_) => (StatusCode::GONE, "the CLI is no longer waiting\n").into_response(),
        },
        None => {
            warn!("⚠️ Duplicate callback rejected");
            (StatusCode::CONFLICT, "a ciphertext was already received\n").into_response()
        }
    }
}

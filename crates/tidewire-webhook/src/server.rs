// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Axum routes for webhook ingestion.
//!
//! Two provider endpoints share one handler pair: `GET` answers the Meta
//! subscription handshake, `POST` verifies the delivery signature and hands
//! the raw body to the event store. Verification failures return 403 and
//! persist nothing.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tidewire_config::MetaConfig;
use tidewire_core::types::Provider;
use tidewire_storage::Database;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::store;
use crate::verify::verify_signature;

const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct WebhookState {
    pub db: Database,
    pub app_secret: Option<String>,
    pub verify_token: Option<String>,
}

impl WebhookState {
    pub fn new(db: Database, meta: &MetaConfig) -> Self {
        Self {
            db,
            app_secret: meta.app_secret.clone(),
            verify_token: meta.verify_token.clone(),
        }
    }
}

/// Build the ingestion router.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhooks/meta", get(handshake).post(accept_meta))
        .route("/webhooks/whatsapp", get(handshake).post(accept_whatsapp))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// Meta sends `hub.mode` style dotted keys; some relays flatten them to
/// underscores, so both spellings are accepted.
#[derive(Debug, Deserialize)]
pub struct HandshakeParams {
    #[serde(rename = "hub.mode", alias = "hub_mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token", alias = "hub_verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge", alias = "hub_challenge")]
    challenge: Option<String>,
}

async fn handshake(
    State(state): State<WebhookState>,
    Query(params): Query<HandshakeParams>,
) -> Response {
    let verified = params.mode.as_deref() == Some("subscribe")
        && state.verify_token.is_some()
        && params.verify_token == state.verify_token;
    if verified {
        (StatusCode::OK, params.challenge.unwrap_or_default()).into_response()
    } else {
        debug!(mode = ?params.mode, "webhook handshake rejected");
        (
            StatusCode::FORBIDDEN,
            axum::Json(serde_json::json!({ "error": "Verification failed" })),
        )
            .into_response()
    }
}

async fn accept_meta(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    accept(state, Provider::Facebook, headers, body).await
}

async fn accept_whatsapp(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    accept(state, Provider::Whatsapp, headers, body).await
}

async fn accept(
    state: WebhookState,
    provider: Provider,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let Some(app_secret) = state.app_secret.as_deref() else {
        debug!("webhook rejected: no app secret configured");
        return forbidden();
    };
    if let Err(e) = verify_signature(app_secret, signature, &body) {
        debug!(provider = %provider, error = %e, "webhook signature rejected");
        return forbidden();
    }

    // Signature verified over the raw bytes; store them as received.
    let payload = String::from_utf8_lossy(&body);
    let signature = signature.unwrap_or_default();
    match store::accept(&state.db, provider, signature, &payload).await {
        Ok(_) => (
            StatusCode::OK,
            axum::Json(serde_json::json!({ "status": "received" })),
        )
            .into_response(),
        Err(e) => {
            error!(provider = %provider, error = %e, "failed to persist webhook event");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(serde_json::json!({ "error": "storage failure" })),
            )
                .into_response()
        }
    }
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        axum::Json(serde_json::json!({ "error": "Invalid signature" })),
    )
        .into_response()
}

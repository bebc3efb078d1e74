// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end pipeline tests: signed webhook delivery through the router,
//! event processing through the worker, and outbound dispatch against a
//! mocked Graph API.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tidewire_core::types::{ChannelKind, JobStatus, MessageDirection};
use tidewire_dispatch::ingest::WebhookProcessHandler;
use tidewire_dispatch::outbound::DispatchHandler;
use tidewire_dispatch::{api, Worker, JOB_MESSAGE_DISPATCH};
use tidewire_graph::{default_registry, GraphClient};
use tidewire_storage::queries::{conversations, jobs, messages, usage};
use tidewire_storage::Database;
use tidewire_vault::SecretStore;
use tidewire_webhook::verify::sign;
use tidewire_webhook::{router, WebhookState};
use tower::ServiceExt;

const APP_SECRET: &str = "e2e-app-secret";
const VERIFY_TOKEN: &str = "e2e-verify-token";

async fn setup() -> (Database, Arc<SecretStore>, axum::Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tidewire.db");
    let db = Database::open(path.to_str().unwrap()).await.unwrap();
    let secrets = Arc::new(SecretStore::generate().unwrap());
    let state = WebhookState {
        db: db.clone(),
        app_secret: Some(APP_SECRET.to_string()),
        verify_token: Some(VERIFY_TOKEN.to_string()),
    };
    let app = router(state);
    (db, secrets, app, dir)
}

fn signed_post(uri: &str, payload: &serde_json::Value) -> Request<Body> {
    let body = payload.to_string();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-hub-signature-256", sign(APP_SECRET, body.as_bytes()))
        .body(Body::from(body))
        .unwrap()
}

fn whatsapp_inbound(text: &str, provider_message_id: &str) -> serde_json::Value {
    serde_json::json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "waba-1",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {"display_phone_number": "15550001111", "phone_number_id": "555"},
                    "contacts": [{"wa_id": "15557770000", "profile": {"name": "Ada"}}],
                    "messages": [{
                        "from": "15557770000",
                        "id": provider_message_id,
                        "timestamp": "1726000000",
                        "type": "text",
                        "text": {"body": text}
                    }]
                }
            }]
        }]
    })
}

#[tokio::test]
async fn handshake_echoes_the_challenge() {
    let (db, _secrets, app, _dir) = setup().await;

    let uri = format!(
        "/webhooks/whatsapp?hub.mode=subscribe&hub.verify_token={VERIFY_TOKEN}&hub.challenge=12345"
    );
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"12345");

    db.close().await.unwrap();
}

#[tokio::test]
async fn tampered_delivery_is_rejected_and_not_stored() {
    let (db, _secrets, app, _dir) = setup().await;

    let payload = whatsapp_inbound("hi", "wamid.tampered");
    let mut request = signed_post("/webhooks/whatsapp", &payload);
    *request.body_mut() = Body::from(payload.to_string().replace("hi", "ho"));

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        jobs::count(&db, tidewire_webhook::store::JOB_WEBHOOK_PROCESS, JobStatus::Pending)
            .await
            .unwrap(),
        0
    );

    db.close().await.unwrap();
}

#[tokio::test]
async fn inbound_whatsapp_message_lands_in_the_store() {
    let (db, secrets, app, _dir) = setup().await;
    let channel = api::attach_channel(
        &db,
        &secrets,
        "t-1",
        ChannelKind::Whatsapp,
        serde_json::json!({"phone_number_id": "555"}),
        "wa-token",
        None,
    )
    .await
    .unwrap();

    let payload = whatsapp_inbound("hello tidewire", "wamid.e2e.1");
    let response = app
        .clone()
        .oneshot(signed_post("/webhooks/whatsapp", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let worker_config = tidewire_config::WorkerConfig::default();
    let mut worker = Worker::new(db.clone(), &worker_config);
    worker.register(Arc::new(WebhookProcessHandler));
    assert_eq!(worker.sweep().await.unwrap(), 1);

    let message = messages::get_by_provider_id(&db, "wamid.e2e.1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.body.as_deref(), Some("hello tidewire"));
    let conversation = conversations::get(&db, &message.conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.channel_id, channel.id);
    assert_eq!(conversation.peer_id, "15557770000");
    assert!(conversation.last_message_at.is_some());
    assert_eq!(
        usage::get(&db, "t-1", "messages", &usage::current_period())
            .await
            .unwrap(),
        1
    );

    // Redelivery of the same payload stores a new event but no new message.
    let response = app
        .oneshot(signed_post("/webhooks/whatsapp", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(worker.sweep().await.unwrap(), 1);
    assert_eq!(
        messages::count_for_conversation(&db, &conversation.id, MessageDirection::In)
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        usage::get(&db, "t-1", "messages", &usage::current_period())
            .await
            .unwrap(),
        1
    );

    db.close().await.unwrap();
}

#[tokio::test]
async fn outbound_reply_dispatches_through_the_graph_api() {
    let (db, secrets, app, _dir) = setup().await;
    api::attach_channel(
        &db,
        &secrets,
        "t-1",
        ChannelKind::Whatsapp,
        serde_json::json!({"phone_number_id": "555"}),
        "wa-token",
        None,
    )
    .await
    .unwrap();

    // Inbound message opens the conversation.
    let payload = whatsapp_inbound("anyone there?", "wamid.e2e.2");
    app.oneshot(signed_post("/webhooks/whatsapp", &payload))
        .await
        .unwrap();
    let worker_config = tidewire_config::WorkerConfig::default();
    let mut worker = Worker::new(db.clone(), &worker_config);
    worker.register(Arc::new(WebhookProcessHandler));
    worker.sweep().await.unwrap();

    let inbound = messages::get_by_provider_id(&db, "wamid.e2e.2")
        .await
        .unwrap()
        .unwrap();

    // Mocked WhatsApp Cloud API accepts the send.
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/555/messages"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "messaging_product": "whatsapp",
            "messages": [{"id": "wamid.out.1"}]
        })))
        .mount(&server)
        .await;
    let client = GraphClient::new(
        db.clone(),
        server.uri(),
        std::time::Duration::from_secs(5),
    )
    .unwrap();
    worker.register(Arc::new(DispatchHandler::new(
        default_registry(client),
        secrets.clone(),
    )));

    let reply = api::create_outbound(&db, &inbound.conversation_id, "yes, hello", None)
        .await
        .unwrap();
    assert_eq!(
        jobs::count(&db, JOB_MESSAGE_DISPATCH, JobStatus::Pending)
            .await
            .unwrap(),
        1
    );
    assert_eq!(worker.sweep().await.unwrap(), 1);

    let sent = messages::get(&db, &reply.id).await.unwrap().unwrap();
    assert_eq!(sent.provider_message_id, "wamid.out.1");

    db.close().await.unwrap();
}

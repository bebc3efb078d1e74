// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tidewire serve` command implementation.
//!
//! Starts the webhook HTTP server and the job worker against one SQLite
//! database. The worker carries every pipeline job type: webhook
//! processing, message dispatch, post publishing, insights, token
//! maintenance, and event retention.

use std::sync::Arc;

use tidewire_config::TidewireConfig;
use tidewire_core::types::JobStatus;
use tidewire_core::TidewireError;
use tidewire_dispatch::ingest::WebhookProcessHandler;
use tidewire_dispatch::insights::InsightsHandler;
use tidewire_dispatch::outbound::DispatchHandler;
use tidewire_dispatch::publisher::PublishHandler;
use tidewire_dispatch::retention::RetentionHandler;
use tidewire_dispatch::token_refresh::{TokenRefreshHandler, TokenSweepHandler};
use tidewire_dispatch::{Worker, JOB_TOKEN_SWEEP, JOB_WEBHOOK_RETENTION};
use tidewire_graph::{default_registry, GraphClient};
use tidewire_storage::models::now_utc;
use tidewire_storage::queries::jobs;
use tidewire_storage::Database;
use tidewire_vault::SecretStore;
use tidewire_webhook::{router, WebhookState};
use tracing::info;

use crate::shutdown;

/// Runs the `tidewire serve` command.
pub async fn run_serve(config: TidewireConfig) -> Result<(), TidewireError> {
    init_tracing(&config.service.log_level);

    let db = Database::from_config(&config.storage).await?;
    let secrets = Arc::new(SecretStore::from_config(&config.vault)?);
    let client = GraphClient::from_config(db.clone(), &config.meta)?;
    let registry = default_registry(client.clone());

    ensure_recurring_jobs(&db).await?;

    let mut worker = Worker::new(db.clone(), &config.worker);
    worker.register(Arc::new(WebhookProcessHandler));
    worker.register(Arc::new(DispatchHandler::new(
        registry.clone(),
        secrets.clone(),
    )));
    worker.register(Arc::new(PublishHandler::new(
        registry.clone(),
        secrets.clone(),
        config.media.public_base_url.clone(),
    )));
    worker.register(Arc::new(InsightsHandler::new(
        registry.clone(),
        secrets.clone(),
    )));
    worker.register(Arc::new(TokenRefreshHandler::new(
        client,
        secrets.clone(),
        config.meta.app_id.clone(),
        config.meta.app_secret.clone(),
    )));
    worker.register(Arc::new(TokenSweepHandler));
    worker.register(Arc::new(RetentionHandler));

    let cancel = shutdown::install_signal_handler();
    let worker_handle = tokio::spawn(worker.run(cancel.clone()));

    let state = WebhookState::new(db.clone(), &config.meta);
    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TidewireError::Internal(format!("cannot bind {addr}: {e}")))?;
    info!(service = %config.service.name, %addr, "webhook server listening");

    let server_cancel = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_cancel.cancelled().await })
        .await
        .map_err(|e| TidewireError::Internal(format!("server error: {e}")))?;

    cancel.cancel();
    worker_handle
        .await
        .map_err(|e| TidewireError::Internal(format!("worker task panicked: {e}")))?;

    info!("tidewire serve shutdown complete");
    Ok(())
}

/// The token sweep and retention cycles re-arm themselves after each run.
/// Seed one pending row each on a fresh database so the cycles start.
async fn ensure_recurring_jobs(db: &Database) -> Result<(), TidewireError> {
    for job_type in [JOB_TOKEN_SWEEP, JOB_WEBHOOK_RETENTION] {
        let pending = jobs::count(db, job_type, JobStatus::Pending).await?;
        let running = jobs::count(db, job_type, JobStatus::Running).await?;
        if pending == 0 && running == 0 {
            jobs::enqueue(db, None, job_type, &serde_json::json!({}), &now_utc(), 1).await?;
            info!(job_type, "seeded recurring job");
        }
    }
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tidewire={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The job worker: a single polling loop over `scheduled_jobs`.
//!
//! Each sweep claims due jobs and runs their handlers sequentially.
//! Delivery is at-least-once; handlers are idempotent, so a crash between
//! claim and completion just means a replay after the next enqueue.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tidewire_config::WorkerConfig;
use tidewire_core::TidewireError;
use tidewire_storage::models::{now_utc, utc_after, ScheduledJob};
use tidewire_storage::queries::jobs;
use tidewire_storage::Database;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::retry::RetryPolicy;

/// One job type's execution logic.
#[async_trait]
pub trait JobHandler: Send + Sync {
    fn job_type(&self) -> &'static str;

    fn retry_policy(&self) -> RetryPolicy;

    async fn run(&self, db: &Database, job: &ScheduledJob) -> Result<(), TidewireError>;

    /// Called once when a job lands in terminal failure, after the last
    /// attempt. Handlers use it to mark the owning row failed.
    async fn on_permanent_failure(
        &self,
        _db: &Database,
        _job: &ScheduledJob,
        _error: &TidewireError,
    ) -> Result<(), TidewireError> {
        Ok(())
    }
}

pub struct Worker {
    db: Database,
    handlers: HashMap<&'static str, Arc<dyn JobHandler>>,
    poll_interval: std::time::Duration,
    batch_size: i64,
}

impl Worker {
    pub fn new(db: Database, config: &WorkerConfig) -> Self {
        Self {
            db,
            handlers: HashMap::new(),
            poll_interval: std::time::Duration::from_secs(config.poll_interval_secs),
            batch_size: config.batch_size as i64,
        }
    }

    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(handler.job_type(), handler);
    }

    /// Poll until cancelled. Cancellation lands between sweeps; a started
    /// job always runs to completion.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            handlers = self.handlers.len(),
            "worker loop started"
        );
        loop {
            match self.sweep().await {
                Ok(0) => {}
                Ok(n) => debug!(jobs = n, "sweep completed"),
                Err(e) => error!(error = %e, "sweep failed"),
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("worker loop stopping");
                    return;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Claim and execute one batch of due jobs. Returns how many ran.
    pub async fn sweep(&self) -> Result<usize, TidewireError> {
        let due = jobs::claim_due(&self.db, &now_utc(), self.batch_size).await?;
        let count = due.len();
        for job in due {
            self.execute(&job).await?;
        }
        Ok(count)
    }

    async fn execute(&self, job: &ScheduledJob) -> Result<(), TidewireError> {
        let Some(handler) = self.handlers.get(job.job_type.as_str()) else {
            warn!(job_id = job.id, job_type = %job.job_type, "no handler for job type");
            jobs::fail(&self.db, job.id, "no handler registered", None).await?;
            return Ok(());
        };

        match handler.run(&self.db, job).await {
            Ok(()) => {
                debug!(job_id = job.id, job_type = %job.job_type, "job completed");
                jobs::complete(&self.db, job.id, &now_utc()).await
            }
            Err(e) => {
                let backoff = if e.is_permanent() {
                    None
                } else {
                    handler.retry_policy().backoff_after(job.attempts)
                };
                match backoff {
                    Some(backoff) => {
                        let retry_at = utc_after(backoff);
                        warn!(
                            job_id = job.id,
                            job_type = %job.job_type,
                            attempts = job.attempts,
                            retry_at = %retry_at,
                            error = %e,
                            "job failed, retrying"
                        );
                        jobs::fail(&self.db, job.id, &e.to_string(), Some(&retry_at)).await
                    }
                    None => {
                        error!(
                            job_id = job.id,
                            job_type = %job.job_type,
                            attempts = job.attempts,
                            error = %e,
                            "job failed permanently"
                        );
                        jobs::fail(&self.db, job.id, &e.to_string(), None).await?;
                        handler.on_permanent_failure(&self.db, job, &e).await
                    }
                }
            }
        }
    }
}

// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job execution for the Tidewire pipeline: the polling worker, the retry
//! policy, and one handler per job type.

pub mod api;
pub mod ingest;
pub mod insights;
pub mod outbound;
pub mod publisher;
pub mod retention;
pub mod retry;
pub mod token_refresh;
pub mod worker;

#[cfg(test)]
pub(crate) mod testsupport;

pub use worker::{JobHandler, Worker};

/// Job types executed by the worker. `webhook.process` lives with the
/// ingestion side, in [`tidewire_webhook::store`].
pub const JOB_MESSAGE_DISPATCH: &str = "message.dispatch";
pub const JOB_POST_PUBLISH: &str = "post.publish";
pub const JOB_POST_INSIGHTS: &str = "post.insights";
pub const JOB_TOKEN_REFRESH: &str = "token.refresh";
pub const JOB_TOKEN_SWEEP: &str = "token.sweep";
pub const JOB_WEBHOOK_RETENTION: &str = "webhook.retention";

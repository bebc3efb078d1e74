// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook ingestion for the Tidewire pipeline.
//!
//! Flow: signature verification over the raw body, durable event insert,
//! `webhook.process` job enqueue, `200 {"status":"received"}`. Processing
//! itself happens later, in the worker.

pub mod processor;
pub mod server;
pub mod store;
pub mod verify;

#[cfg(test)]
pub(crate) mod testsupport;

pub use server::{router, WebhookState};

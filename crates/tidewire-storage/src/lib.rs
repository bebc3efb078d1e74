// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Tidewire pipeline.
//!
//! Holds the channel directory, the webhook event store, conversations and
//! messages, posts, comments, the durable job queue, usage counters, and
//! the platform API audit log. All writes are serialized through a single
//! tokio-rusqlite background connection.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

#[cfg(test)]
pub(crate) mod testutil;

pub use database::Database;

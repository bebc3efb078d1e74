// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-entity query modules. One module per table, free functions taking
//! the shared [`crate::Database`] handle.

pub mod audit;
pub mod channels;
pub mod comments;
pub mod conversations;
pub mod jobs;
pub mod messages;
pub mod posts;
pub mod usage;
pub mod webhook_events;

// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core types for the Tidewire webhook + dispatch pipeline.
//!
//! This crate defines the shared error enum, the domain enums and value
//! types used across the workspace, and the [`PlatformAdapter`] trait seam
//! that the per-platform Graph API clients implement.

pub mod error;
pub mod traits;
pub mod types;

pub use error::TidewireError;
pub use traits::{AdapterRegistry, PlatformAdapter};

// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Meta Graph API adapters for the Tidewire pipeline.
//!
//! One [`tidewire_core::traits::PlatformAdapter`] implementation per
//! channel kind, all sharing an audited [`GraphClient`].

pub mod client;
pub mod facebook;
pub mod instagram;
pub mod oauth;
pub mod whatsapp;

#[cfg(test)]
pub(crate) mod testsupport;

pub use client::{CallScope, GraphClient};
pub use facebook::FacebookAdapter;
pub use instagram::InstagramAdapter;
pub use whatsapp::WhatsAppAdapter;

use std::sync::Arc;

use tidewire_core::traits::AdapterRegistry;

/// Build a registry with all three platform adapters on a shared client.
pub fn default_registry(client: GraphClient) -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(FacebookAdapter::new(client.clone())));
    registry.register(Arc::new(InstagramAdapter::new(client.clone())));
    registry.register(Arc::new(WhatsAppAdapter::new(client)));
    registry
}

// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Tidewire pipeline.
//!
//! TOML files merged through the XDG hierarchy with `TIDEWIRE_*` environment
//! variable overrides, using Figment. See [`loader`] for merge order.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    MediaConfig, MetaConfig, ServerConfig, ServiceConfig, StorageConfig, TidewireConfig,
    VaultConfig, WorkerConfig,
};

// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./tidewire.toml` > `~/.config/tidewire/tidewire.toml`
//! > `/etc/tidewire/tidewire.toml` with environment variable overrides via
//! the `TIDEWIRE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::TidewireConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tidewire/tidewire.toml` (system-wide)
/// 3. `~/.config/tidewire/tidewire.toml` (user XDG config)
/// 4. `./tidewire.toml` (local directory)
/// 5. `TIDEWIRE_*` environment variables
pub fn load_config() -> Result<TidewireConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TidewireConfig::default()))
        .merge(Toml::file("/etc/tidewire/tidewire.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("tidewire/tidewire.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("tidewire.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from an inline TOML string (tests and tooling).
pub fn load_config_from_str(toml_content: &str) -> Result<TidewireConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TidewireConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TidewireConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TidewireConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `TIDEWIRE_META_APP_SECRET` must map to
/// `meta.app_secret`, not `meta.app.secret`.
fn env_provider() -> Env {
    Env::prefixed("TIDEWIRE_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: TIDEWIRE_META_APP_SECRET -> "meta_app_secret"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("server_", "server.", 1)
            .replacen("meta_", "meta.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("vault_", "vault.", 1)
            .replacen("worker_", "worker.", 1)
            .replacen("media_", "media.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
            [meta]
            app_secret = "shhh"
            verify_token = "vt"

            [server]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.meta.app_secret.as_deref(), Some("shhh"));
        assert_eq!(config.server.port, 9000);
        // Untouched sections keep defaults.
        assert_eq!(config.worker.poll_interval_secs, 5);
    }

    #[test]
    fn env_vars_map_to_dotted_keys() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("TIDEWIRE_META_APP_SECRET", "from-env");
            jail.set_env("TIDEWIRE_SERVER_PORT", "8081");
            let config: TidewireConfig = Figment::new()
                .merge(Serialized::defaults(TidewireConfig::default()))
                .merge(env_provider())
                .extract()?;
            assert_eq!(config.meta.app_secret.as_deref(), Some("from-env"));
            assert_eq!(config.server.port, 8081);
            Ok(())
        });
    }

    #[test]
    fn unknown_section_key_is_an_error() {
        let result = load_config_from_str(
            r#"
            [meta]
            app_secrett = "typo"
            "#,
        );
        assert!(result.is_err());
    }
}

// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-lived token exchange (`grant_type=fb_exchange_token`).

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tidewire_core::TidewireError;

use crate::client::{CallScope, GraphClient};

/// Meta's long-lived page tokens run about 60 days; when `expires_in` is
/// absent from the exchange response this default is used instead.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 5_184_000;

/// Result of one token exchange.
pub struct RefreshedToken {
    pub access_token: SecretString,
    pub expires_in_secs: i64,
}

#[derive(Deserialize)]
struct ExchangeResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Exchange the current access token for a fresh long-lived one.
pub async fn exchange_token(
    client: &GraphClient,
    channel_id: &str,
    app_id: &str,
    app_secret: &str,
    current: &SecretString,
) -> Result<RefreshedToken, TidewireError> {
    let scope = CallScope {
        channel_id: Some(channel_id),
        platform: "meta",
        operation: "token_refresh",
    };
    let response = client
        .get(
            scope,
            "oauth/access_token",
            current,
            &[
                ("grant_type", "fb_exchange_token"),
                ("client_id", app_id),
                ("client_secret", app_secret),
                ("fb_exchange_token", current.expose_secret()),
            ],
        )
        .await?;
    let parsed: ExchangeResponse =
        serde_json::from_value(response).map_err(|e| TidewireError::Http {
            message: format!("token_refresh response malformed: {e}"),
            source: Some(Box::new(e)),
        })?;
    Ok(RefreshedToken {
        access_token: SecretString::from(parsed.access_token),
        expires_in_secs: parsed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
    })
}

// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared HTTP client for the Meta Graph API.
//!
//! Every adapter call funnels through [`GraphClient`], which measures call
//! latency and writes an `api_audit_log` row whether the call succeeded or
//! not. The access token travels as a query parameter and is never written
//! to the audit trail.

use std::time::{Duration, Instant};

use secrecy::{ExposeSecret, SecretString};
use tidewire_config::MetaConfig;
use tidewire_core::TidewireError;
use tidewire_storage::queries::audit;
use tidewire_storage::Database;
use tracing::debug;

/// Audit attribution for one Graph API call.
#[derive(Debug, Clone, Copy)]
pub struct CallScope<'a> {
    pub channel_id: Option<&'a str>,
    pub platform: &'a str,
    pub operation: &'a str,
}

/// Reqwest wrapper with audit logging and uniform error mapping.
#[derive(Debug, Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
    db: Database,
}

impl GraphClient {
    pub fn new(
        db: Database,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TidewireError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TidewireError::Http {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            db,
        })
    }

    pub fn from_config(db: Database, meta: &MetaConfig) -> Result<Self, TidewireError> {
        Self::new(
            db,
            meta.graph_base_url.clone(),
            Duration::from_secs(meta.timeout_secs),
        )
    }

    /// GET `path` with the token plus extra query parameters.
    pub async fn get(
        &self,
        scope: CallScope<'_>,
        path: &str,
        token: &SecretString,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, TidewireError> {
        let req = self
            .http
            .get(self.url(path))
            .query(&[("access_token", token.expose_secret())])
            .query(query);
        self.execute(scope, req, None).await
    }

    /// POST a JSON body to `path`.
    pub async fn post(
        &self,
        scope: CallScope<'_>,
        path: &str,
        token: &SecretString,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, TidewireError> {
        let req = self
            .http
            .post(self.url(path))
            .query(&[("access_token", token.expose_secret())])
            .json(body);
        self.execute(scope, req, Some(body.clone())).await
    }

    /// DELETE `path`.
    pub async fn delete(
        &self,
        scope: CallScope<'_>,
        path: &str,
        token: &SecretString,
    ) -> Result<serde_json::Value, TidewireError> {
        let req = self
            .http
            .delete(self.url(path))
            .query(&[("access_token", token.expose_secret())]);
        self.execute(scope, req, None).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn execute(
        &self,
        scope: CallScope<'_>,
        req: reqwest::RequestBuilder,
        request_body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, TidewireError> {
        let started = Instant::now();
        let response = req.send().await;
        let latency_ms = started.elapsed().as_millis() as i64;

        let (status, body) = match response {
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                (status, body)
            }
            Err(e) => {
                audit::record(
                    &self.db,
                    scope.channel_id,
                    scope.platform,
                    scope.operation,
                    request_body.as_ref(),
                    None,
                    false,
                    latency_ms,
                )
                .await?;
                return Err(TidewireError::Http {
                    message: format!("{} request failed: {e}", scope.operation),
                    source: Some(Box::new(e)),
                });
            }
        };

        debug!(
            platform = scope.platform,
            operation = scope.operation,
            status = status.as_u16(),
            latency_ms,
            "graph api call"
        );
        audit::record(
            &self.db,
            scope.channel_id,
            scope.platform,
            scope.operation,
            request_body.as_ref(),
            Some(&body),
            status.is_success(),
            latency_ms,
        )
        .await?;

        if !status.is_success() {
            return Err(TidewireError::Platform {
                operation: scope.operation.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        if body.is_empty() {
            return Ok(serde_json::Value::Object(Default::default()));
        }
        serde_json::from_str(&body).map_err(|e| TidewireError::Http {
            message: format!("{} returned non-JSON body: {e}", scope.operation),
            source: Some(Box::new(e)),
        })
    }
}

/// Pulls a string field out of a Graph API response, erroring with the
/// operation name when the expected shape is missing.
pub(crate) fn response_str(
    value: &serde_json::Value,
    pointer: &str,
    operation: &str,
) -> Result<String, TidewireError> {
    value
        .pointer(pointer)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| TidewireError::Http {
            message: format!("{operation} response missing {pointer}"),
            source: None,
        })
}

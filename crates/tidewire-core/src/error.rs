// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tidewire pipeline.

use thiserror::Error;

/// The primary error type used across all Tidewire crates.
#[derive(Debug, Error)]
pub enum TidewireError {
    /// Configuration errors (invalid TOML, missing required fields, bad key material).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Token vault errors (seal/open failure, missing or malformed master key).
    #[error("vault error: {0}")]
    Vault(String),

    /// A platform API returned a non-2xx response. The raw response body is
    /// carried so callers can persist it into the owning row's error field.
    #[error("platform error: {operation} returned {status}: {body}")]
    Platform {
        operation: String,
        status: u16,
        body: String,
    },

    /// Transport-level HTTP failure (connect, timeout, TLS) before any
    /// platform response was received.
    #[error("http error: {message}")]
    Http {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Malformed webhook payload (missing `entry`, wrong shape).
    #[error("payload error: {0}")]
    Payload(String),

    /// A referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A precondition for the operation does not hold (channel not active,
    /// instagram post without media, illegal post state transition).
    /// Precondition failures are permanent: the job queue does not retry them.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TidewireError {
    /// Returns true when retrying the failed operation cannot succeed
    /// (payload and precondition errors, unknown rows).
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            TidewireError::Payload(_)
                | TidewireError::Precondition(_)
                | TidewireError::NotFound { .. }
                | TidewireError::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_error_carries_response_body() {
        let err = TidewireError::Platform {
            operation: "send_message".into(),
            status: 400,
            body: r#"{"error":{"message":"Invalid OAuth token"}}"#.into(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("send_message"));
        assert!(rendered.contains("400"));
        assert!(rendered.contains("Invalid OAuth token"));
    }

    #[test]
    fn precondition_is_permanent() {
        assert!(TidewireError::Precondition("channel not active".into()).is_permanent());
        assert!(TidewireError::Payload("missing entry".into()).is_permanent());
        assert!(!TidewireError::Platform {
            operation: "publish_post".into(),
            status: 500,
            body: "server error".into(),
        }
        .is_permanent());
    }
}

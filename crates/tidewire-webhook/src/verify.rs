// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `X-Hub-Signature-256` verification.
//!
//! Meta signs every webhook delivery with HMAC-SHA256 over the raw body,
//! keyed with the app secret, sent as `sha256=<hex>`. Verification happens
//! on the exact bytes received, before any JSON parsing, and the compare is
//! constant-time via the hmac crate.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tidewire_core::TidewireError;

type HmacSha256 = Hmac<Sha256>;

/// Verifies a webhook delivery signature against the raw request body.
///
/// Any failure (missing header, malformed prefix or hex, digest mismatch)
/// is the same error: the caller rejects with 403 and persists nothing.
pub fn verify_signature(
    app_secret: &str,
    header: Option<&str>,
    body: &[u8],
) -> Result<(), TidewireError> {
    let header = header
        .ok_or_else(|| TidewireError::Precondition("missing signature header".to_string()))?;
    let hex_digest = header
        .strip_prefix("sha256=")
        .ok_or_else(|| TidewireError::Precondition("malformed signature header".to_string()))?;
    let expected = hex::decode(hex_digest)
        .map_err(|_| TidewireError::Precondition("malformed signature hex".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|_| TidewireError::Internal("invalid HMAC key length".to_string()))?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| TidewireError::Precondition("signature mismatch".to_string()))
}

/// Computes the `sha256=<hex>` header value for a body (test support and
/// local delivery tooling).
pub fn sign(app_secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_signature_passes() {
        let body = br#"{"object":"page","entry":[]}"#;
        let header = sign("app-secret", body);
        assert!(verify_signature("app-secret", Some(&header), body).is_ok());
    }

    #[test]
    fn rejects_missing_malformed_and_wrong() {
        let body = b"payload";
        assert!(verify_signature("s", None, body).is_err());
        assert!(verify_signature("s", Some("md5=abcd"), body).is_err());
        assert!(verify_signature("s", Some("sha256=zz"), body).is_err());

        let other = sign("different-secret", body);
        assert!(verify_signature("s", Some(&other), body).is_err());
    }

    #[test]
    fn signature_covers_exact_bytes() {
        let header = sign("s", b"{\"a\":1}");
        // Re-serialized JSON with different whitespace must not verify.
        assert!(verify_signature("s", Some(&header), b"{\"a\": 1}").is_err());
    }
}

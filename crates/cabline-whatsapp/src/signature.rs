// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `X-Hub-Signature-256` verification.
//!
//! Meta signs every webhook body with HMAC-SHA256 keyed by the app secret and
//! sends `sha256=<hex digest>` in the header.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Checks `header` against the body. Comparison is constant-time.
pub fn verify_signature(app_secret: &str, body: &[u8], header: Option<&str>) -> bool {
    let Some(header) = header else {
        return false;
    };
    let hex_digest = header.trim();
    let hex_digest = hex_digest.strip_prefix("sha256=").unwrap_or(hex_digest);
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Header value Meta would send for `body`.
pub fn sign_body(app_secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(app_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_body_verifies() {
        let body = br#"{"object":"whatsapp_business_account"}"#;
        let header = sign_body("app-secret", body);
        assert!(header.starts_with("sha256="));
        assert!(verify_signature("app-secret", body, Some(&header)));
    }

    #[test]
    fn tampered_body_or_wrong_secret_fails() {
        let header = sign_body("app-secret", b"original");
        assert!(!verify_signature("app-secret", b"tampered", Some(&header)));
        assert!(!verify_signature("other-secret", b"original", Some(&header)));
    }

    #[test]
    fn missing_or_malformed_header_fails() {
        assert!(!verify_signature("s", b"x", None));
        assert!(!verify_signature("s", b"x", Some("sha256=not-hex")));
        assert!(!verify_signature("s", b"x", Some("")));
    }
}

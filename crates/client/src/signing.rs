//! Per-request HMAC signing
//!
//! Every physical attempt carries an `X-Signature` header of the form
//! `digest:timestamp`, where the digest is HMAC-SHA256 over the request
//! method, path, serialized body, and the wall-clock timestamp of that
//! attempt. The server rejects stale timestamps, so a signature is never
//! reused across attempts: callers take a fresh timestamp and re-sign before
//! each send.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signature for one physical request attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Lowercase hex HMAC-SHA256 digest
    pub digest: String,
    /// Wall-clock timestamp (unix milliseconds) the digest covers
    pub timestamp: String,
}

impl Signature {
    /// Render the signature as the `X-Signature` header value
    /// (`digest:timestamp`).
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("{}:{}", self.digest, self.timestamp)
    }
}

/// Stateless signer keyed with the shared application secret
///
/// `sign` is a pure function of its inputs; the signer holds no per-request
/// state and is safe to share across concurrent calls.
#[derive(Clone)]
pub struct RequestSigner {
    secret: String,
}

impl RequestSigner {
    /// Create a signer for the given shared secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    /// Sign one physical attempt.
    ///
    /// The digest covers `method + path + body + timestamp` in that order;
    /// an absent body contributes the empty string. Serialization of the
    /// body is the caller's concern and happens before signing.
    #[must_use]
    pub fn sign(&self, method: &str, path: &str, body: &str, timestamp: &str) -> Signature {
        // HMAC-SHA256 accepts keys of any length, so this cannot fail.
        #[allow(clippy::expect_used)]
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");

        mac.update(method.as_bytes());
        mac.update(path.as_bytes());
        mac.update(body.as_bytes());
        mac.update(timestamp.as_bytes());

        Signature {
            digest: hex::encode(mac.finalize().into_bytes()),
            timestamp: timestamp.to_string(),
        }
    }
}

// The shared secret must never leak through debug formatting or logs.
impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner").field("secret", &"<redacted>").finish()
    }
}

/// Current wall-clock timestamp in unix milliseconds, as a decimal string.
#[must_use]
pub fn unix_timestamp() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

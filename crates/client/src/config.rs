//! Client configuration

use std::fmt;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Configuration for [`SecureApiClient`](crate::SecureApiClient)
///
/// `timeout` bounds a single physical attempt at the transport level;
/// `deadline` bounds the whole logical call including backoff sleeps and any
/// wait on an in-flight token refresh.
#[derive(Clone)]
pub struct ApiClientConfig {
    /// Base URL for the API (e.g., "https://api.arcadia.gg/v1")
    pub base_url: String,
    /// Shared secret for per-request HMAC signing
    pub signing_secret: String,
    /// Value for the `X-App-Version` header
    pub app_version: String,
    /// Value for the `X-Platform` header
    pub platform: String,
    /// Per-attempt transport timeout
    pub timeout: Duration,
    /// Deadline for one logical call across all attempts
    pub deadline: Duration,
    /// Retry policy for transient failures
    pub retry: RetryPolicy,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.arcadia.gg/v1".to_string(),
            signing_secret: String::new(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            platform: std::env::consts::OS.to_string(),
            timeout: Duration::from_secs(10),
            deadline: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

// The signing secret must never leak through debug formatting or logs.
impl fmt::Debug for ApiClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClientConfig")
            .field("base_url", &self.base_url)
            .field("signing_secret", &"<redacted>")
            .field("app_version", &self.app_version)
            .field("platform", &self.platform)
            .field("timeout", &self.timeout)
            .field("deadline", &self.deadline)
            .field("retry", &self.retry)
            .finish()
    }
}

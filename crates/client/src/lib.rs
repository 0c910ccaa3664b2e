//! Secure API client layer for Arcadia desktop builds
//!
//! Every outbound request is signed with a per-request HMAC, carries the
//! stored access token when one exists, and is retried on transient
//! failures. A 401 triggers one transparent refresh-and-replay cycle;
//! concurrent 401s are collapsed onto a single refresh call.
//!
//! The crate owns transport, signing, refresh, and retry. Credential
//! persistence stays behind the [`CredentialStore`] trait so hosts can plug
//! in their platform keychain; [`testing::MemoryCredentialStore`] covers
//! test harnesses.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use arcadia_client::{ApiClientConfig, SecureApiClient};
//! use arcadia_client::testing::MemoryCredentialStore;
//!
//! # async fn run() -> Result<(), arcadia_client::ApiError> {
//! let store = Arc::new(MemoryCredentialStore::with_credentials("access", "refresh"));
//! let config = ApiClientConfig {
//!     base_url: "https://api.arcadia.gg/v1".to_string(),
//!     signing_secret: "shared-secret".to_string(),
//!     ..Default::default()
//! };
//! let client = SecureApiClient::new(config, store)?;
//!
//! let pairs: Vec<String> = client.get("/trading/pairs").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod refresh;
pub mod retry;
pub mod signing;
pub mod testing;

pub use client::SecureApiClient;
pub use config::ApiClientConfig;
pub use credentials::{CredentialStore, Credentials, StorageError};
pub use error::ApiError;
pub use refresh::{RefreshCoordinator, RefreshError, RefreshedToken};
pub use retry::RetryPolicy;
pub use signing::{RequestSigner, Signature};

//! Credential types and the storage interface the client consumes
//!
//! Secure storage is owned by the host application (keychain, encrypted
//! preferences, enclave, whatever the platform offers); the client only sees
//! it through [`CredentialStore`]. Read failures are treated like missing
//! credentials, write failures leave the session degraded but usable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for credential storage operations
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The backing store rejected or failed the operation
    #[error("credential storage backend failed: {0}")]
    Backend(String),
}

/// Access/refresh token pair
///
/// Invariant: a stored pair always has both tokens present and non-empty;
/// "logged out" is represented by the absence of a pair, never by a partial
/// one. The pair is replaced wholesale on refresh and cleared on logout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Short-lived bearer token attached to authenticated requests
    pub access_token: String,
    /// Longer-lived token exchanged for a new pair on expiry
    pub refresh_token: String,
}

impl Credentials {
    /// Create a credential pair.
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token: refresh_token.into() }
    }

    /// Whether the pair satisfies the both-present-and-non-empty invariant.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

/// Interface to the externally-owned secure credential store
///
/// All operations are async key-value calls with last-write-wins semantics.
/// Only the refresh coordinator (and explicit login/logout in the host
/// application) writes; everything else reads.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Current access token, if one is stored.
    async fn access_token(&self) -> Result<Option<String>, StorageError>;

    /// Current refresh token, if one is stored.
    async fn refresh_token(&self) -> Result<Option<String>, StorageError>;

    /// Replace the stored pair wholesale.
    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError>;

    /// Remove the stored pair (logout).
    async fn clear(&self) -> Result<(), StorageError>;
}

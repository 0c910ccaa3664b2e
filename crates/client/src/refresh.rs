//! Single-flight access-token refresh
//!
//! N concurrent requests can hit 401 at the same moment. Without
//! coordination each would call `POST /auth/refresh`, racing to overwrite
//! each other's token pair and invalidating tokens already in flight. The
//! coordinator collapses those callers onto one ticket: the first caller
//! spawns the refresh, everyone else awaits the same outcome.
//!
//! The refresh itself runs on its own task, so a waiter abandoning its wait
//! (deadline, cancellation) never aborts the refresh other waiters depend on.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::credentials::{CredentialStore, Credentials};
use crate::error;

/// Error type for refresh operations
///
/// Cloneable so a single failure can be distributed to every waiter on the
/// ticket.
#[derive(Debug, Clone, Error)]
pub enum RefreshError {
    /// No refresh token in the store; re-authentication is required
    #[error("no refresh token available")]
    MissingRefreshToken,

    /// The server rejected the refresh (invalid/expired refresh token)
    #[error("refresh rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The refresh call never produced a response
    #[error("refresh transport failure: {message}")]
    Transport { message: String },

    /// The server response did not contain a usable token pair
    #[error("refresh response missing token pair")]
    MalformedResponse,

    /// The refresh task went away without publishing an outcome
    #[error("refresh aborted")]
    Aborted,
}

// Every refresh failure surfaces to the caller as an authentication
// failure; the original cause is preserved in the message.
impl From<RefreshError> for error::ApiError {
    fn from(err: RefreshError) -> Self {
        Self::Unauthorized { message: err.to_string() }
    }
}

/// Outcome of a successful refresh
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    /// The new access token, usable immediately by in-flight requests
    pub access_token: String,
    /// Whether the new pair reached the credential store; `false` means the
    /// session is degraded and the host should force a re-login eventually
    pub persisted: bool,
}

/// Wire request for the refresh endpoint
#[derive(Debug, Serialize)]
struct RefreshRequest {
    refresh_token: String,
}

/// Wire response from the refresh endpoint
#[derive(Debug, serde::Deserialize)]
struct TokenPairResponse {
    access_token: String,
    refresh_token: String,
}

type RefreshOutcome = Result<RefreshedToken, RefreshError>;
type Ticket = watch::Receiver<Option<RefreshOutcome>>;

/// Collapses concurrent refresh attempts into one network call
///
/// Exactly one ticket exists while a refresh is in flight; the slot is
/// guarded by a mutex and cleared by the owning task before the outcome is
/// published.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    refresh_url: String,
    store: Arc<dyn CredentialStore>,
    active: Mutex<Option<Ticket>>,
}

impl RefreshCoordinator {
    /// Create a coordinator for the given API base URL.
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: &str, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                refresh_url: format!("{}/auth/refresh", base_url.trim_end_matches('/')),
                store,
                active: Mutex::new(None),
            }),
        }
    }

    /// Obtain a fresh access token, joining an in-flight refresh if one
    /// exists.
    ///
    /// The first caller while no refresh is active installs a ticket and
    /// spawns the refresh task; every later caller awaits that ticket and
    /// receives the same outcome. A missing refresh token short-circuits to
    /// failure without any network call.
    ///
    /// # Errors
    /// Returns a [`RefreshError`] when the refresh token is absent, the
    /// server rejects the exchange, or the call never completes. Callers are
    /// expected to surface this as an authentication failure.
    pub async fn ensure_fresh_token(&self) -> RefreshOutcome {
        let mut ticket = {
            let mut slot = self.inner.active.lock().await;
            match slot.as_ref() {
                Some(existing) => {
                    debug!("joining in-flight token refresh");
                    existing.clone()
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    *slot = Some(rx.clone());

                    let inner = Arc::clone(&self.inner);
                    tokio::spawn(async move {
                        let outcome = inner.perform_refresh().await;
                        // Clear the slot before publishing so a later 401
                        // starts a new refresh instead of reading a stale
                        // ticket.
                        *inner.active.lock().await = None;
                        let _ = tx.send(Some(outcome));
                    });

                    rx
                }
            }
        };

        loop {
            {
                let value = ticket.borrow_and_update();
                if let Some(outcome) = value.as_ref() {
                    return outcome.clone();
                }
            }
            if ticket.changed().await.is_err() {
                return Err(RefreshError::Aborted);
            }
        }
    }
}

impl Inner {
    async fn perform_refresh(&self) -> RefreshOutcome {
        // A storage read failure is treated like missing credentials.
        let refresh_token = match self.store.refresh_token().await {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "credential store read failed during refresh");
                None
            }
        };
        let Some(refresh_token) = refresh_token.filter(|token| !token.is_empty()) else {
            return Err(RefreshError::MissingRefreshToken);
        };

        debug!("exchanging refresh token for a new pair");

        let response = self
            .http
            .post(&self.refresh_url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|err| RefreshError::Transport { message: err.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error::detail_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .map_or_else(|| format!("status {}", status.as_u16()), String::from)
            });
            debug!(status = status.as_u16(), "refresh rejected");
            return Err(RefreshError::Rejected { status: status.as_u16(), message });
        }

        let pair: TokenPairResponse =
            response.json().await.map_err(|_| RefreshError::MalformedResponse)?;
        let credentials = Credentials::new(pair.access_token, pair.refresh_token);
        if !credentials.is_complete() {
            return Err(RefreshError::MalformedResponse);
        }

        let persisted = match self.store.save(&credentials).await {
            Ok(()) => true,
            Err(err) => {
                // The token pair is still good for in-flight requests; the
                // session is degraded until the host forces a re-login.
                warn!(error = %err, "refreshed tokens could not be persisted");
                false
            }
        };

        info!("access token refreshed");
        Ok(RefreshedToken { access_token: credentials.access_token, persisted })
    }
}

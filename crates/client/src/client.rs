//! Secure API client façade
//!
//! Composes the signer, credential store, refresh coordinator, and retry
//! policy into typed `get`/`post` operations. Each logical call runs as an
//! explicit sequential pipeline: sign, send, classify, maybe
//! refresh-and-replay (once), maybe retry. Stages hand results forward;
//! nothing mutates shared request state.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::ApiClientConfig;
use crate::credentials::CredentialStore;
use crate::error::{classify_status, classify_transport, ApiError};
use crate::refresh::RefreshCoordinator;
use crate::signing::{unix_timestamp, RequestSigner};

/// Authenticated, signed HTTP client with refresh and retry built in
///
/// One instance is shared across all concurrent callers; the only
/// serialization point is the refresh coordinator. Collaborators call
/// `get`/`post` and receive decoded payloads or a classified [`ApiError`];
/// they never see refresh or retry mechanics.
pub struct SecureApiClient {
    http: reqwest::Client,
    config: ApiClientConfig,
    signer: RequestSigner,
    store: Arc<dyn CredentialStore>,
    refresh: RefreshCoordinator,
}

impl SecureApiClient {
    /// Create a client owning its store reference and refresh coordinator.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(
        config: ApiClientConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ApiError::Network { message: format!("http client: {err}") })?;

        let signer = RequestSigner::new(config.signing_secret.clone());
        let refresh =
            RefreshCoordinator::new(http.clone(), &config.base_url, Arc::clone(&store));

        Ok(Self { http, config, signer, store, refresh })
    }

    /// Execute a GET request and decode the response as `T`.
    ///
    /// # Errors
    /// Returns a classified [`ApiError`] once retries and the single
    /// refresh-and-replay cycle are exhausted.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, &[], None::<&()>).await
    }

    /// Execute a GET request with query parameters.
    ///
    /// # Errors
    /// Returns a classified [`ApiError`] on terminal failure.
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        self.request(Method::GET, path, query, None::<&()>).await
    }

    /// Execute a POST request with an optional JSON body.
    ///
    /// # Errors
    /// Returns `BadRequest` if the body cannot be serialized, otherwise a
    /// classified [`ApiError`] on terminal failure.
    pub async fn post<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, &[], body).await
    }

    /// Execute a POST request with an optional JSON body and query
    /// parameters.
    ///
    /// # Errors
    /// Returns a classified [`ApiError`] on terminal failure.
    pub async fn post_with_query<B, T>(
        &self,
        path: &str,
        body: Option<&B>,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, query, body).await
    }

    async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        // Serialize once per logical call, before any signing; a failure
        // here is a client-side error with no network traffic.
        let body_text = match body {
            Some(value) => serde_json::to_string(value).map_err(|err| ApiError::BadRequest {
                message: format!("request body could not be serialized: {err}"),
            })?,
            None => String::new(),
        };

        let url = self.build_url(path)?;

        // The deadline covers every attempt, backoff sleep, and any wait on
        // an in-flight refresh. Expiry cancels this waiter only; a refresh
        // task other callers depend on keeps running.
        match tokio::time::timeout(
            self.config.deadline,
            self.execute(method, path, url, query, &body_text),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ApiError::Network { message: "timeout".to_string() }),
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        url: Url,
        query: &[(&str, &str)],
        body_text: &str,
    ) -> Result<T, ApiError> {
        let mut attempt: u32 = 0;
        let mut replay_token: Option<String> = None;
        let mut refreshed = false;

        loop {
            let outcome = self
                .send_once(&method, path, url.clone(), query, body_text, replay_token.as_deref())
                .await;

            let response = match outcome {
                Ok(response) => response,
                Err(err) => {
                    if self.backoff(&err, &mut attempt).await {
                        continue;
                    }
                    return Err(err);
                }
            };

            let status = response.status();
            debug!(%method, path, attempt, status = status.as_u16(), "response received");

            if status.is_success() {
                return decode_body(response).await;
            }

            if status == StatusCode::UNAUTHORIZED && !refreshed {
                // Exactly one refresh-and-replay cycle per logical call. A
                // second 401 after a successful refresh is terminal.
                match self.refresh.ensure_fresh_token().await {
                    Ok(token) => {
                        if !token.persisted {
                            warn!("using unpersisted refreshed token; session is degraded");
                        }
                        replay_token = Some(token.access_token);
                        refreshed = true;
                        continue;
                    }
                    Err(err) => {
                        debug!(error = %err, "token refresh failed");
                        return Err(ApiError::from(err));
                    }
                }
            }

            let body = response.text().await.unwrap_or_default();
            let err = classify_status(status, &body);
            if self.backoff(&err, &mut attempt).await {
                continue;
            }
            return Err(err);
        }
    }

    /// Sleep per the retry schedule if the error warrants another attempt.
    ///
    /// Returns `true` when the caller should replay; `attempt` is advanced.
    async fn backoff(&self, err: &ApiError, attempt: &mut u32) -> bool {
        if !self.config.retry.should_retry(err, *attempt) {
            return false;
        }
        let delay = self.config.retry.delay_for(*attempt).unwrap_or_default();
        debug!(attempt = *attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying");
        sleep(delay).await;
        *attempt += 1;
        true
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        url: Url,
        query: &[(&str, &str)],
        body_text: &str,
        replay_token: Option<&str>,
    ) -> Result<Response, ApiError> {
        // Re-read credentials on every attempt so a refresh completed by
        // another call is picked up. After an in-call refresh the replay
        // token wins, even when persisting it failed.
        let token = match replay_token {
            Some(token) => Some(token.to_string()),
            None => match self.store.access_token().await {
                Ok(token) => token,
                Err(err) => {
                    warn!(error = %err, "credential store read failed; sending unauthenticated");
                    None
                }
            },
        };

        // Fresh wall-clock timestamp per physical attempt; the wire
        // protocol rejects replayed signatures with stale timestamps.
        let timestamp = unix_timestamp();
        let signature = self.signer.sign(method.as_str(), path, body_text, &timestamp);

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(CONTENT_TYPE, "application/json")
            .header("X-Signature", signature.header_value())
            .header("X-App-Version", &self.config.app_version)
            .header("X-Platform", &self.config.platform);

        if let Some(token) = token.filter(|token| !token.is_empty()) {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if !body_text.is_empty() {
            request = request.body(body_text.to_string());
        }

        debug!(%method, path, "sending request");

        request.send().await.map_err(|err| {
            debug!(%method, path, error = %err, "transport failure");
            classify_transport(&err)
        })
    }

    fn build_url(&self, path: &str) -> Result<Url, ApiError> {
        Url::parse(&format!("{}{}", self.config.base_url.trim_end_matches('/'), path)).map_err(
            |err| ApiError::BadRequest { message: format!("invalid request path {path:?}: {err}") },
        )
    }
}

/// Decode a success response as `T`.
///
/// 204/205 carry no body by spec and decode as JSON `null`, so unit targets
/// succeed. Shape mismatches are terminal `Decode` errors, never retried.
async fn decode_body<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
        return serde_json::from_value(serde_json::Value::Null).map_err(|_| ApiError::Decode {
            message: format!(
                "no-content response ({}) cannot populate the requested type",
                status.as_u16()
            ),
        });
    }

    let bytes = response.bytes().await.map_err(|err| classify_transport(&err))?;
    serde_json::from_slice(&bytes)
        .map_err(|err| ApiError::Decode { message: err.to_string() })
}

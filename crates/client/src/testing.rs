//! Test doubles for the externally-owned credential store
//!
//! `MemoryCredentialStore` keeps the pair in memory with failure-injection
//! toggles so retry, refresh, and degraded-persistence paths can be
//! exercised deterministically. Useful both in this crate's tests and for
//! consumers wiring the client into their own test harnesses.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::credentials::{CredentialStore, Credentials, StorageError};

/// In-memory credential store with failure injection
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Option<Credentials>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryCredentialStore {
    /// Create an empty store (logged-out state).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with a credential pair.
    #[must_use]
    pub fn with_credentials(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        let store = Self::new();
        store.set_credentials(Credentials::new(access_token, refresh_token));
        store
    }

    /// Replace the stored pair directly, bypassing failure injection.
    pub fn set_credentials(&self, credentials: Credentials) {
        *self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(credentials);
    }

    /// Snapshot of the stored pair.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    /// Make subsequent reads fail with a backend error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn read_guard(&self) -> Result<Option<Credentials>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("injected read failure".to_string()));
        }
        Ok(self.credentials())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn access_token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.read_guard()?.map(|pair| pair.access_token))
    }

    async fn refresh_token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.read_guard()?.map(|pair| pair.refresh_token))
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("injected write failure".to_string()));
        }
        self.set_credentials(credentials.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("injected write failure".to_string()));
        }
        *self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        Ok(())
    }
}

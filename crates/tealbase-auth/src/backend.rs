//! Collaborator seams of the native auth surface.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use tealbase_core::SessionAccessor;

use crate::error::AuthError;
use crate::types::{AuthResponse, Credentials, Session, SignOutScope, User};

/// The native auth collaborator.
///
/// Owns the current session and talks to the auth endpoint. It is also the
/// session source for per-request authorization headers.
pub trait AuthBackend: SessionAccessor {
    fn sign_up(&self, credentials: Credentials) -> BoxFuture<'_, Result<AuthResponse, AuthError>>;

    fn sign_in_with_password(
        &self,
        credentials: Credentials,
    ) -> BoxFuture<'_, Result<Session, AuthError>>;

    fn sign_out(&self, scope: SignOutScope) -> BoxFuture<'_, Result<(), AuthError>>;

    /// Fetch the user for `jwt`, or for the current session when `None`.
    fn get_user(&self, jwt: Option<String>) -> BoxFuture<'_, Result<User, AuthError>>;

    fn get_session(&self) -> BoxFuture<'_, Result<Option<Session>, AuthError>>;

    fn refresh_session(&self) -> BoxFuture<'_, Result<Session, AuthError>>;
}

/// Key/value store a backend persists sessions into.
pub trait SessionStorage: Send + Sync {
    fn get_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, AuthError>>;

    fn set_item<'a>(&'a self, key: &'a str, value: String)
        -> BoxFuture<'a, Result<(), AuthError>>;

    fn remove_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), AuthError>>;
}

/// Process-local [`SessionStorage`], used when no storage is configured.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_items<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, String>) -> T,
    ) -> Result<T, AuthError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| AuthError::Storage("memory storage lock poisoned".into()))?;
        Ok(f(&mut items))
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, AuthError>> {
        Box::pin(async move { self.with_items(|items| items.get(key).cloned()) })
    }

    fn set_item<'a>(
        &'a self,
        key: &'a str,
        value: String,
    ) -> BoxFuture<'a, Result<(), AuthError>> {
        Box::pin(async move {
            self.with_items(|items| {
                items.insert(key.to_string(), value);
            })
        })
    }

    fn remove_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), AuthError>> {
        Box::pin(async move {
            self.with_items(|items| {
                items.remove(key);
            })
        })
    }
}

/// Exposes a backend as the session source of the header resolver.
struct BackendSession(Arc<dyn AuthBackend>);

impl SessionAccessor for BackendSession {
    fn access_token(&self) -> BoxFuture<'_, Option<String>> {
        self.0.access_token()
    }
}

pub(crate) fn session_accessor(backend: Arc<dyn AuthBackend>) -> Arc<dyn SessionAccessor> {
    Arc::new(BackendSession(backend))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("k").await.unwrap(), None);

        storage.set_item("k", "v".into()).await.unwrap();
        assert_eq!(storage.get_item("k").await.unwrap().as_deref(), Some("v"));

        storage.remove_item("k").await.unwrap();
        assert_eq!(storage.get_item("k").await.unwrap(), None);
    }
}

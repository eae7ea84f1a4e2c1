use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::backend::{AuthBackend, SessionStorage};
use crate::types::FlowType;

/// Options of the native auth surface.
///
/// Everything except `backend` is forwarded to the default HTTP backend.
#[derive(Clone)]
pub struct AuthOptions {
    /// Refresh an expired session before handing it out. Default `true`.
    pub auto_refresh_token: bool,
    /// Write sessions to `storage`. Default `true`.
    pub persist_session: bool,
    /// Default `true`. Only meaningful for redirect-based flows.
    pub detect_session_in_url: bool,
    /// Storage key; defaults to `sb-<project-ref>-auth-token`.
    pub storage_key: Option<String>,
    /// Defaults to an in-memory store.
    pub storage: Option<Arc<dyn SessionStorage>>,
    pub flow_type: FlowType,
    /// Serializes session reads and refreshes. No locking when unset.
    pub lock: Option<Arc<Mutex<()>>>,
    /// Log every auth request at debug level.
    pub debug: bool,
    /// Replaces the default HTTP backend.
    pub backend: Option<Arc<dyn AuthBackend>>,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            auto_refresh_token: true,
            persist_session: true,
            detect_session_in_url: true,
            storage_key: None,
            storage: None,
            flow_type: FlowType::Implicit,
            lock: None,
            debug: false,
            backend: None,
        }
    }
}

impl fmt::Debug for AuthOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthOptions")
            .field("auto_refresh_token", &self.auto_refresh_token)
            .field("persist_session", &self.persist_session)
            .field("detect_session_in_url", &self.detect_session_in_url)
            .field("storage_key", &self.storage_key)
            .field("storage", &self.storage.is_some())
            .field("flow_type", &self.flow_type)
            .field("lock", &self.lock.is_some())
            .field("debug", &self.debug)
            .field("backend", &self.backend.is_some())
            .finish()
    }
}

impl AuthOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_refresh_token(mut self, enabled: bool) -> Self {
        self.auto_refresh_token = enabled;
        self
    }

    pub fn persist_session(mut self, enabled: bool) -> Self {
        self.persist_session = enabled;
        self
    }

    pub fn detect_session_in_url(mut self, enabled: bool) -> Self {
        self.detect_session_in_url = enabled;
        self
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self
    }

    pub fn storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn flow_type(mut self, flow_type: FlowType) -> Self {
        self.flow_type = flow_type;
        self
    }

    pub fn lock(mut self, lock: Arc<Mutex<()>>) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    pub fn backend(mut self, backend: Arc<dyn AuthBackend>) -> Self {
        self.backend = Some(backend);
        self
    }
}

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, warn};
use url::Url;

use tealbase_core::SessionAccessor;

use crate::backend::{AuthBackend, MemoryStorage, SessionStorage};
use crate::error::{AuthError, AuthErrorResponse};
use crate::options::AuthOptions;
use crate::types::{AuthResponse, Credentials, FlowType, Session, SignOutScope, User};

/// Default [`AuthBackend`]: talks to the auth endpoint over HTTP and keeps the
/// current session in memory, mirrored to [`SessionStorage`] when
/// `persist_session` is on.
pub struct HttpAuthBackend {
    http: reqwest::Client,
    base_url: Url,
    headers: HeaderMap,
    storage_key: String,
    storage: Arc<dyn SessionStorage>,
    auto_refresh_token: bool,
    persist_session: bool,
    detect_session_in_url: bool,
    flow_type: FlowType,
    lock: Option<Arc<Mutex<()>>>,
    debug: bool,
    session: RwLock<Option<Session>>,
}

impl fmt::Debug for HttpAuthBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpAuthBackend")
            .field("base_url", &self.base_url.as_str())
            .field("storage_key", &self.storage_key)
            .field("persist_session", &self.persist_session)
            .field("flow_type", &self.flow_type)
            .finish()
    }
}

impl HttpAuthBackend {
    /// Create a backend for the auth endpoint `auth_url`.
    ///
    /// `headers` are sent on every request. Unless they already carry one,
    /// `Authorization: Bearer <api_key>` is added; user calls replace it with
    /// the session token.
    pub fn new(
        auth_url: Url,
        api_key: &str,
        mut headers: HeaderMap,
        http: reqwest::Client,
        storage_key: impl Into<String>,
        options: &AuthOptions,
    ) -> Result<Self, AuthError> {
        if !headers.contains_key(AUTHORIZATION) {
            headers.insert(AUTHORIZATION, bearer(api_key)?);
        }

        Ok(Self {
            http,
            base_url: auth_url,
            headers,
            storage_key: storage_key.into(),
            storage: options
                .storage
                .clone()
                .unwrap_or_else(|| Arc::new(MemoryStorage::new()) as Arc<dyn SessionStorage>),
            auto_refresh_token: options.auto_refresh_token,
            persist_session: options.persist_session,
            detect_session_in_url: options.detect_session_in_url,
            flow_type: options.flow_type,
            lock: options.lock.clone(),
            debug: options.debug,
            session: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn flow_type(&self) -> FlowType {
        self.flow_type
    }

    pub fn detects_session_in_url(&self) -> bool {
        self.detect_session_in_url
    }

    // ─── Session State ─────────────────────────────────────────

    async fn guard(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }

    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        if let Some(session) = self.session.read().await.clone() {
            return Ok(Some(session));
        }
        if !self.persist_session {
            return Ok(None);
        }
        let Some(raw) = self.storage.get_item(&self.storage_key).await? else {
            return Ok(None);
        };
        let session: Session = serde_json::from_str(&raw)?;
        *self.session.write().await = Some(session.clone());
        Ok(Some(session))
    }

    async fn save_session(&self, session: Session) -> Result<Session, AuthError> {
        let session = with_expiry(session);
        *self.session.write().await = Some(session.clone());
        if self.persist_session {
            self.storage
                .set_item(&self.storage_key, serde_json::to_string(&session)?)
                .await?;
        }
        Ok(session)
    }

    async fn clear_session(&self) -> Result<(), AuthError> {
        self.session.write().await.take();
        if self.persist_session {
            self.storage.remove_item(&self.storage_key).await?;
        }
        Ok(())
    }

    async fn refresh_with(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let resp = self
            .request(Method::POST, "/token?grant_type=refresh_token", None)?
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let session: Session = read_json(resp).await?;
        self.save_session(session).await
    }

    // ─── Internal Helpers ──────────────────────────────────────

    pub(crate) fn url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let current = url.path().trim_end_matches('/').to_string();
        // path may contain a query string (e.g. "/token?grant_type=password")
        match path.split_once('?') {
            Some((path, query)) => {
                url.set_path(&format!("{current}{path}"));
                url.set_query(Some(query));
            }
            None => url.set_path(&format!("{current}{path}")),
        }
        url
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        access_token: Option<&str>,
    ) -> Result<RequestBuilder, AuthError> {
        let mut headers = self.headers.clone();
        if let Some(token) = access_token {
            headers.insert(AUTHORIZATION, bearer(token)?);
        }
        let url = self.url(path);
        if self.debug {
            debug!(method = %method, url = %url, "Auth request");
        }
        Ok(self.http.request(method, url).headers(headers))
    }
}

impl SessionAccessor for HttpAuthBackend {
    fn access_token(&self) -> BoxFuture<'_, Option<String>> {
        Box::pin(async move {
            match self.get_session().await {
                Ok(session) => session.map(|s| s.access_token),
                Err(e) => {
                    warn!(error = %e, "Could not load auth session");
                    None
                }
            }
        })
    }
}

impl AuthBackend for HttpAuthBackend {
    fn sign_up(&self, credentials: Credentials) -> BoxFuture<'_, Result<AuthResponse, AuthError>> {
        Box::pin(async move {
            let _guard = self.guard().await;
            let resp = self
                .request(Method::POST, "/signup", None)?
                .json(&credentials.to_body())
                .send()
                .await?;
            let mut response: AuthResponse = read_json(resp).await?;
            if let Some(session) = response.session.take() {
                response.session = Some(self.save_session(session).await?);
            }
            Ok(response)
        })
    }

    fn sign_in_with_password(
        &self,
        credentials: Credentials,
    ) -> BoxFuture<'_, Result<Session, AuthError>> {
        Box::pin(async move {
            let _guard = self.guard().await;
            let resp = self
                .request(Method::POST, "/token?grant_type=password", None)?
                .json(&credentials.to_body())
                .send()
                .await?;
            let session: Session = read_json(resp).await?;
            self.save_session(session).await
        })
    }

    fn sign_out(&self, scope: SignOutScope) -> BoxFuture<'_, Result<(), AuthError>> {
        Box::pin(async move {
            let _guard = self.guard().await;
            let Some(session) = self.current_session().await? else {
                return Ok(());
            };
            let path = format!("/logout?scope={scope}");
            let result = match self
                .request(Method::POST, &path, Some(&session.access_token))?
                .send()
                .await
            {
                Ok(resp) => read_empty(resp).await,
                Err(e) => Err(e.into()),
            };
            if scope != SignOutScope::Others {
                self.clear_session().await?;
            }
            result
        })
    }

    fn get_user(&self, jwt: Option<String>) -> BoxFuture<'_, Result<User, AuthError>> {
        Box::pin(async move {
            let token = match jwt {
                Some(token) => token,
                None => self
                    .get_session()
                    .await?
                    .map(|s| s.access_token)
                    .ok_or(AuthError::NoSession)?,
            };
            let resp = self
                .request(Method::GET, "/user", Some(&token))?
                .send()
                .await?;
            read_json(resp).await
        })
    }

    fn get_session(&self) -> BoxFuture<'_, Result<Option<Session>, AuthError>> {
        Box::pin(async move {
            let _guard = self.guard().await;
            match self.current_session().await? {
                Some(session) if self.auto_refresh_token && session.is_expired(now()) => {
                    debug!("Session expired, refreshing");
                    self.refresh_with(&session.refresh_token).await.map(Some)
                }
                other => Ok(other),
            }
        })
    }

    fn refresh_session(&self) -> BoxFuture<'_, Result<Session, AuthError>> {
        Box::pin(async move {
            let _guard = self.guard().await;
            let session = self.current_session().await?.ok_or(AuthError::NoSession)?;
            self.refresh_with(&session.refresh_token).await
        })
    }
}

fn bearer(token: &str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| AuthError::InvalidConfig(format!("Invalid bearer token: {e}")))
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

fn with_expiry(mut session: Session) -> Session {
    if session.expires_at.is_none() {
        session.expires_at = Some(now() + session.expires_in);
    }
    session
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, AuthError> {
    let status = resp.status().as_u16();
    if status >= 400 {
        return Err(parse_error(status, resp).await);
    }
    Ok(resp.json().await?)
}

async fn read_empty(resp: reqwest::Response) -> Result<(), AuthError> {
    let status = resp.status().as_u16();
    if status >= 400 {
        return Err(parse_error(status, resp).await);
    }
    Ok(())
}

async fn parse_error(status: u16, resp: reqwest::Response) -> AuthError {
    match resp.json::<AuthErrorResponse>().await {
        Ok(body) => AuthError::Api {
            status,
            message: body.error_message(),
            error_code: body.error_code,
        },
        Err(_) => AuthError::Api {
            status,
            message: format!("HTTP {status}"),
            error_code: None,
        },
    }
}

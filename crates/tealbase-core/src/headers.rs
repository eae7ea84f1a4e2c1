//! Per-request authorization headers.
//!
//! Every request to the query, storage and functions endpoints carries
//! `apikey` and `Authorization: Bearer <token>`. The token comes either from a
//! third-party provider or from the native session, falling back to the key.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use tracing::{debug, trace};

use crate::error::{BoxError, TealbaseError, TealbaseResult};

/// Name of the client-identification header.
pub const CLIENT_INFO_HEADER: &str = "x-client-info";

/// Value of the client-identification header.
pub const CLIENT_INFO: &str = concat!("tealbase-rs/", env!("CARGO_PKG_VERSION"));

/// Read access to the current native session.
///
/// Implemented by whichever auth collaborator is wired into the client.
pub trait SessionAccessor: Send + Sync {
    /// The access token of the current session, if there is one.
    fn access_token(&self) -> BoxFuture<'_, Option<String>>;
}

/// Third-party token source. May be called concurrently and many times.
pub type AccessTokenProvider =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Option<String>, BoxError>> + Send + Sync>;

/// Wrap an async closure as an [`AccessTokenProvider`].
///
/// ```
/// use tealbase_core::access_token_provider;
/// let provider = access_token_provider(|| async { Ok(Some("jwt".to_string())) });
/// # let _ = provider;
/// ```
pub fn access_token_provider<F, Fut>(f: F) -> AccessTokenProvider
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<String>, BoxError>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

/// How bearer tokens are obtained. Chosen once at construction.
#[derive(Clone)]
pub enum AuthMode {
    /// Session-backed; `None` when no auth collaborator is wired in.
    Native(Option<Arc<dyn SessionAccessor>>),
    /// Tokens come from an external provider; native auth is disabled.
    ThirdParty(AccessTokenProvider),
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(Some(_)) => write!(f, "Native(session)"),
            Self::Native(None) => write!(f, "Native(no session source)"),
            Self::ThirdParty(_) => write!(f, "ThirdParty"),
        }
    }
}

/// Computes the headers attached to every outbound data request.
#[derive(Debug, Clone)]
pub struct HeaderResolver {
    api_key: String,
    api_key_value: HeaderValue,
    custom: HeaderMap,
    mode: AuthMode,
}

impl HeaderResolver {
    /// Build a resolver. Invalid header names or values are configuration errors.
    pub fn new(
        api_key: impl Into<String>,
        custom_headers: &HashMap<String, String>,
        mode: AuthMode,
    ) -> TealbaseResult<Self> {
        let api_key = api_key.into();
        let api_key_value = HeaderValue::from_str(&api_key)
            .map_err(|e| TealbaseError::config(format!("Invalid API key header: {e}")))?;

        let mut custom = HeaderMap::new();
        for (key, value) in custom_headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                TealbaseError::config(format!("Invalid header name '{key}': {e}"))
            })?;
            if name.as_str() == CLIENT_INFO_HEADER {
                debug!(header = %key, "Ignoring custom client-identification header");
                continue;
            }
            let value = HeaderValue::from_str(value).map_err(|e| {
                TealbaseError::config(format!("Invalid header value for '{key}': {e}"))
            })?;
            custom.insert(name, value);
        }

        Ok(Self {
            api_key,
            api_key_value,
            custom,
            mode,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn mode(&self) -> &AuthMode {
        &self.mode
    }

    pub fn is_third_party(&self) -> bool {
        matches!(self.mode, AuthMode::ThirdParty(_))
    }

    /// The same key and custom headers under a different token mode.
    pub fn with_mode(&self, mode: AuthMode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }

    /// Select the bearer token for the next request.
    pub async fn bearer_token(&self) -> TealbaseResult<String> {
        match &self.mode {
            AuthMode::ThirdParty(provider) => match provider().await {
                Ok(Some(token)) if !token.is_empty() => Ok(token),
                Ok(_) => Err(TealbaseError::token_resolution(
                    "access token provider returned no token",
                )),
                Err(e) => Err(TealbaseError::token_resolution(e.to_string())),
            },
            AuthMode::Native(Some(session)) => Ok(session
                .access_token()
                .await
                .unwrap_or_else(|| self.api_key.clone())),
            AuthMode::Native(None) => Ok(self.api_key.clone()),
        }
    }

    /// Headers without a per-request `Authorization` value.
    pub fn static_headers(&self) -> HeaderMap {
        self.merge(None)
    }

    /// The full header set for one request.
    pub async fn resolve(&self) -> TealbaseResult<HeaderMap> {
        let token = self.bearer_token().await?;
        let authorization = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| TealbaseError::token_resolution(format!("invalid token: {e}")))?;
        trace!(mode = ?self.mode, "Resolved request headers");
        Ok(self.merge(Some(authorization)))
    }

    fn merge(&self, authorization: Option<HeaderValue>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("apikey"), self.api_key_value.clone());
        if let Some(value) = authorization {
            headers.insert(AUTHORIZATION, value);
        }
        // User-supplied headers win over computed ones.
        for (name, value) in &self.custom {
            headers.insert(name.clone(), value.clone());
        }
        headers.insert(
            HeaderName::from_static(CLIENT_INFO_HEADER),
            HeaderValue::from_static(CLIENT_INFO),
        );
        headers
    }
}

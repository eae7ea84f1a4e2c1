use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tealbase_auth::AuthOptions;
use tealbase_core::AccessTokenProvider;
use tealbase_query::QueryExecutor;
use tealbase_realtime::RealtimeTransport;

/// Configuration for [`create_client`](crate::create_client).
///
/// # Example
/// ```
/// use tealbase::ClientOptions;
///
/// let options = ClientOptions::new()
///     .schema("other")
///     .header("x-app", "demo");
/// assert_eq!(options.db.schema, "other");
/// ```
#[derive(Clone, Default)]
pub struct ClientOptions {
    pub db: DbOptions,
    pub auth: AuthOptions,
    pub realtime: RealtimeOptions,
    pub storage: StorageOptions,
    pub global: GlobalOptions,
    /// Third-party token provider. When set, the native auth surface is disabled.
    pub access_token: Option<AccessTokenProvider>,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("db", &self.db)
            .field("auth", &self.auth)
            .field("realtime", &self.realtime)
            .field("storage", &self.storage)
            .field("global", &self.global)
            .field("access_token", &self.access_token.is_some())
            .finish()
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Postgres schema for queries and realtime filters (default `public`).
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.db.schema = schema.into();
        self
    }

    /// Replace the query collaborator.
    pub fn executor(mut self, executor: Arc<dyn QueryExecutor>) -> Self {
        self.db.executor = Some(executor);
        self
    }

    pub fn auth(mut self, auth: AuthOptions) -> Self {
        self.auth = auth;
        self
    }

    /// Use this transport for realtime channels.
    pub fn transport(mut self, transport: Arc<dyn RealtimeTransport>) -> Self {
        self.realtime.transport = Some(transport);
        self
    }

    /// Extra query parameter for the realtime socket URL.
    pub fn realtime_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.realtime.params.insert(key.into(), value.into());
        self
    }

    /// Option forwarded verbatim to the storage collaborator.
    pub fn storage_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.storage.settings.insert(key.into(), value.into());
        self
    }

    /// HTTP client shared by every subsystem.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.global.http_client = Some(http);
        self
    }

    /// Custom header merged into every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.global.headers.insert(name.into(), value.into());
        self
    }

    pub fn access_token(mut self, provider: AccessTokenProvider) -> Self {
        self.access_token = Some(provider);
        self
    }
}

/// Database options.
#[derive(Clone)]
pub struct DbOptions {
    pub schema: String,
    /// Defaults to PostgREST over HTTP.
    pub executor: Option<Arc<dyn QueryExecutor>>,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            executor: None,
        }
    }
}

impl fmt::Debug for DbOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbOptions")
            .field("schema", &self.schema)
            .field("executor", &self.executor.is_some())
            .finish()
    }
}

/// Realtime options.
#[derive(Clone, Default)]
pub struct RealtimeOptions {
    /// Without a transport, channels can be created and removed but not joined.
    pub transport: Option<Arc<dyn RealtimeTransport>>,
    /// Appended to the socket URL next to `apikey`.
    pub params: HashMap<String, String>,
}

impl fmt::Debug for RealtimeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeOptions")
            .field("transport", &self.transport.is_some())
            .field("params", &self.params)
            .finish()
    }
}

/// Storage options, forwarded to the storage client unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageOptions {
    pub settings: HashMap<String, String>,
}

/// Options shared by every subsystem.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub http_client: Option<reqwest::Client>,
    pub headers: HashMap<String, String>,
}

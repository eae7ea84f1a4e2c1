use std::fmt;
use std::sync::{Arc, OnceLock};

use reqwest::header::HeaderMap;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};
use url::Url;

use tealbase_auth::{AuthBackend, AuthClient, HttpAuthBackend};
use tealbase_core::{
    AuthMode, Endpoints, HeaderResolver, TealbaseError, TealbaseResponse, TealbaseResult,
};
use tealbase_query::{QueryBuilder, QueryClient, QueryExecutor, RestExecutor, RpcOptions};
use tealbase_realtime::{
    Channel, ChannelConfig, ChannelRegistry, DetachedTransport, PostgresChangePayload,
    PostgresChangesEvent, RealtimeError, RealtimeTransport,
};

use crate::functions::FunctionsClient;
use crate::options::{ClientOptions, RealtimeOptions, StorageOptions};
use crate::storage::StorageClient;

/// Create a client for the project at `url` using the API key `key`.
///
/// Fails with [`TealbaseError::Config`] when either is empty or the URL is
/// not an absolute `http(s)` URL.
///
/// # Example
/// ```ignore
/// use tealbase::prelude::*;
///
/// let client = create_client("https://abc.tealbase.co", "anon-key", ClientOptions::default())?;
/// let rows = client.from("cities").eq("country", "NZ").select("name").await;
/// ```
pub fn create_client(
    url: &str,
    key: &str,
    options: ClientOptions,
) -> TealbaseResult<TealbaseClient> {
    TealbaseClient::new(url, key, options)
}

/// The unified client: one base URL and key for every subsystem.
///
/// Cheap to clone; clones share the channel registry, the auth session and
/// the lazily created sub-clients.
#[derive(Clone)]
pub struct TealbaseClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    endpoints: Endpoints,
    resolver: Arc<HeaderResolver>,
    query: QueryClient,
    registry: ChannelRegistry,
    auth: AuthClient,
    storage_key: String,
    http: reqwest::Client,
    realtime: RealtimeOptions,
    storage_options: StorageOptions,
    storage: OnceLock<StorageClient>,
    functions: OnceLock<FunctionsClient>,
}

impl fmt::Debug for TealbaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TealbaseClient")
            .field("url", &self.inner.endpoints.base().as_str())
            .field("schema", &self.inner.query.schema_name())
            .field("third_party_auth", &self.inner.resolver.is_third_party())
            .finish()
    }
}

impl TealbaseClient {
    pub fn new(url: &str, key: &str, options: ClientOptions) -> TealbaseResult<Self> {
        let endpoints = Endpoints::derive(url, key)?;
        let ClientOptions {
            db,
            auth: auth_options,
            realtime,
            storage: storage_options,
            global,
            access_token,
        } = options;

        if db.schema.trim().is_empty() {
            return Err(TealbaseError::config("db.schema must not be empty"));
        }

        let http = match global.http_client {
            Some(http) => http,
            None => reqwest::Client::builder().build()?,
        };
        let base = HeaderResolver::new(key, &global.headers, AuthMode::Native(None))?;
        let storage_key = auth_options
            .storage_key
            .clone()
            .unwrap_or_else(|| endpoints.default_storage_key());

        let (auth, mode) = match access_token {
            Some(provider) => {
                if auth_options.backend.is_some() {
                    warn!("access_token is set; the configured auth backend will not be used");
                }
                (AuthClient::disabled(), AuthMode::ThirdParty(provider))
            }
            None => {
                let backend: Arc<dyn AuthBackend> = match &auth_options.backend {
                    Some(backend) => Arc::clone(backend),
                    None => Arc::new(HttpAuthBackend::new(
                        endpoints.auth().clone(),
                        key,
                        base.static_headers(),
                        http.clone(),
                        storage_key.clone(),
                        &auth_options,
                    )?),
                };
                let auth = AuthClient::native(backend);
                let mode = AuthMode::Native(auth.session_accessor());
                (auth, mode)
            }
        };
        let resolver = Arc::new(base.with_mode(mode));

        let executor: Arc<dyn QueryExecutor> = match db.executor {
            Some(executor) => executor,
            None => Arc::new(RestExecutor::new(http.clone())),
        };
        let query = QueryClient::new(
            endpoints.rest().clone(),
            db.schema.clone(),
            Arc::clone(&resolver),
            executor,
        );

        let transport: Arc<dyn RealtimeTransport> = match &realtime.transport {
            Some(transport) => Arc::clone(transport),
            None => Arc::new(DetachedTransport),
        };
        let registry = ChannelRegistry::new(transport, Arc::clone(&resolver), db.schema);

        debug!(
            url = %endpoints.base(),
            schema = %query.schema_name(),
            third_party_auth = resolver.is_third_party(),
            "tealbase client created"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                endpoints,
                resolver,
                query,
                registry,
                auth,
                storage_key,
                http,
                realtime,
                storage_options,
                storage: OnceLock::new(),
                functions: OnceLock::new(),
            }),
        })
    }

    // ─── Query ─────────────────────────────────────────────────

    /// A query builder targeting `table` in the configured schema.
    pub fn from(&self, table: impl Into<String>) -> QueryBuilder {
        self.inner.query.from(table)
    }

    /// The query client for another schema.
    pub fn schema(&self, schema: impl Into<String>) -> QueryClient {
        self.inner.query.schema(schema)
    }

    /// The query client for the configured schema.
    pub fn query(&self) -> &QueryClient {
        &self.inner.query
    }

    /// Call a database function. `args` must be a JSON object or null.
    pub async fn rpc(
        &self,
        function: &str,
        args: JsonValue,
        options: RpcOptions,
    ) -> TealbaseResponse<JsonValue> {
        self.inner.query.rpc(function, args, options).await
    }

    // ─── Realtime ──────────────────────────────────────────────

    /// Create and register a channel for topic `realtime:<name>`.
    ///
    /// Nothing is sent until [`Channel::subscribe`] is called.
    pub async fn channel(&self, name: &str, config: ChannelConfig) -> Channel {
        self.inner.registry.create_channel(name, config).await
    }

    /// Register a channel for row changes on `table` in the configured schema.
    ///
    /// `"*"` watches every table. Like [`channel`](Self::channel), nothing is
    /// sent until the channel is subscribed.
    pub async fn on<F>(&self, table: &str, event: PostgresChangesEvent, callback: F) -> Channel
    where
        F: Fn(PostgresChangePayload) + Send + Sync + 'static,
    {
        self.inner.registry.on_table(table, event, callback).await
    }

    /// Leave and unregister `channel`, returning how many channels remain.
    /// The realtime connection is closed once none do.
    pub async fn remove_channel(&self, channel: &Channel) -> Result<usize, RealtimeError> {
        self.inner.registry.remove_channel(channel).await
    }

    /// Remove every channel, returning one outcome per channel.
    pub async fn remove_all_channels(&self) -> Vec<Result<(), RealtimeError>> {
        self.inner.registry.remove_all_channels().await
    }

    /// Registered channels in creation order.
    pub async fn get_channels(&self) -> Vec<Channel> {
        self.inner.registry.channels().await
    }

    pub fn realtime(&self) -> &ChannelRegistry {
        &self.inner.registry
    }

    /// The socket URL a realtime transport connects to, with `apikey` and
    /// the configured realtime params in the query string.
    pub fn realtime_url(&self) -> Url {
        let mut url = self.inner.endpoints.realtime_websocket();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("apikey", self.api_key());
            let mut params: Vec<_> = self.inner.realtime.params.iter().collect();
            params.sort();
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        url
    }

    // ─── Other Subsystems ──────────────────────────────────────

    /// The native auth surface. Disabled when an access token provider is set.
    pub fn auth(&self) -> &AuthClient {
        &self.inner.auth
    }

    pub fn storage(&self) -> &StorageClient {
        self.inner.storage.get_or_init(|| {
            StorageClient::new(
                self.inner.endpoints.storage().clone(),
                Arc::clone(&self.inner.resolver),
                self.inner.storage_options.clone(),
            )
        })
    }

    pub fn functions(&self) -> &FunctionsClient {
        self.inner.functions.get_or_init(|| {
            FunctionsClient::new(
                self.inner.endpoints.functions().clone(),
                Arc::clone(&self.inner.resolver),
                self.inner.http.clone(),
            )
        })
    }

    // ─── Configuration ─────────────────────────────────────────

    pub fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }

    /// Headers sent on every request, without the per-request `Authorization`.
    pub fn headers(&self) -> HeaderMap {
        self.inner.resolver.static_headers()
    }

    /// Headers for the next request, `Authorization` included.
    pub async fn resolve_headers(&self) -> TealbaseResult<HeaderMap> {
        self.inner.resolver.resolve().await
    }

    /// Storage key of the auth session.
    pub fn storage_key(&self) -> &str {
        &self.inner.storage_key
    }

    pub fn api_key(&self) -> &str {
        self.inner.resolver.api_key()
    }
}

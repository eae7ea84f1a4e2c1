//! Client facade wiring against in-memory collaborators.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use serde_json::{json, Value as JsonValue};

use tealbase::prelude::*;
use tealbase::tealbase_auth::{AuthResponse, SignOutScope};
use tealbase::tealbase_core::{SessionAccessor, CLIENT_INFO};
use tealbase::tealbase_query::{QueryExecutor, QueryRequest, RpcRequest};
use tealbase::tealbase_realtime::{JoinRequest, RealtimeTransport};
use tealbase::{create_client, TealbaseError};

const URL: &str = "https://abc.tealbase.co";
const KEY: &str = "anon-key";

// ── Recording executor ────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    queries: Mutex<Vec<QueryRequest>>,
    rpcs: Mutex<Vec<RpcRequest>>,
}

impl Recorder {
    fn last_query(&self) -> QueryRequest {
        self.queries.lock().unwrap().last().cloned().unwrap()
    }

    fn last_rpc(&self) -> RpcRequest {
        self.rpcs.lock().unwrap().last().cloned().unwrap()
    }
}

impl QueryExecutor for Recorder {
    fn execute(&self, request: QueryRequest) -> BoxFuture<'_, TealbaseResponse<Row>> {
        self.queries.lock().unwrap().push(request);
        Box::pin(async { TealbaseResponse::ok(Vec::new()) })
    }

    fn rpc(&self, request: RpcRequest) -> BoxFuture<'_, TealbaseResponse<JsonValue>> {
        self.rpcs.lock().unwrap().push(request);
        Box::pin(async { TealbaseResponse::ok(vec![json!(3)]) })
    }
}

fn header<'a>(headers: &'a reqwest::header::HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// ── Counting transport ────────────────────────────────────────────────────────

#[derive(Default)]
struct CountingTransport {
    connected: AtomicBool,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    joins: Mutex<Vec<JoinRequest>>,
}

impl RealtimeTransport for CountingTransport {
    fn connect(&self) -> BoxFuture<'_, Result<(), RealtimeError>> {
        Box::pin(async move {
            if !self.connected.swap(true, Ordering::SeqCst) {
                self.connects.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, Result<(), RealtimeError>> {
        Box::pin(async move {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            self.connected.store(false, Ordering::SeqCst);
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn join(&self, request: JoinRequest) -> BoxFuture<'_, Result<(), RealtimeError>> {
        Box::pin(async move {
            self.joins.lock().unwrap().push(request);
            Ok(())
        })
    }

    fn leave(&self, _topic: String) -> BoxFuture<'_, Result<(), RealtimeError>> {
        Box::pin(async { Ok(()) })
    }
}

// ── Session backend ───────────────────────────────────────────────────────────

#[derive(Default)]
struct SessionBackend {
    token: Mutex<Option<String>>,
}

impl SessionBackend {
    fn signed_in(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }

    fn session(&self) -> Option<Session> {
        let token = self.token.lock().unwrap().clone()?;
        serde_json::from_value(json!({
            "access_token": token,
            "refresh_token": "refresh",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": "u1" }
        }))
        .ok()
    }
}

impl SessionAccessor for SessionBackend {
    fn access_token(&self) -> BoxFuture<'_, Option<String>> {
        Box::pin(async move { self.token.lock().unwrap().clone() })
    }
}

impl tealbase::tealbase_auth::AuthBackend for SessionBackend {
    fn sign_up(&self, _credentials: Credentials) -> BoxFuture<'_, Result<AuthResponse, AuthError>> {
        Box::pin(async { Err(AuthError::NoSession) })
    }

    fn sign_in_with_password(
        &self,
        _credentials: Credentials,
    ) -> BoxFuture<'_, Result<Session, AuthError>> {
        Box::pin(async { Err(AuthError::NoSession) })
    }

    fn sign_out(&self, _scope: SignOutScope) -> BoxFuture<'_, Result<(), AuthError>> {
        Box::pin(async move {
            self.token.lock().unwrap().take();
            Ok(())
        })
    }

    fn get_user(&self, _jwt: Option<String>) -> BoxFuture<'_, Result<User, AuthError>> {
        Box::pin(async move { self.session().map(|s| s.user).ok_or(AuthError::NoSession) })
    }

    fn get_session(&self) -> BoxFuture<'_, Result<Option<Session>, AuthError>> {
        Box::pin(async move { Ok(self.session()) })
    }

    fn refresh_session(&self) -> BoxFuture<'_, Result<Session, AuthError>> {
        Box::pin(async move { self.session().ok_or(AuthError::NoSession) })
    }
}

fn client_with(options: ClientOptions) -> (TealbaseClient, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let client = create_client(URL, KEY, options.executor(recorder.clone())).unwrap();
    (client, recorder)
}

fn third_party(token: &'static str) -> ClientOptions {
    ClientOptions::new().access_token(access_token_provider(move || async move {
        Ok(Some(token.to_string()))
    }))
}

// ── Construction ──────────────────────────────────────────────────────────────

#[test]
fn invalid_configuration_is_rejected() {
    for (url, key) in [("", KEY), (URL, ""), ("   ", KEY), ("ftp://abc.tealbase.co", KEY)] {
        let err = create_client(url, key, ClientOptions::default()).unwrap_err();
        assert!(matches!(err, TealbaseError::Config(_)), "{url:?}/{key:?}: {err:?}");
    }

    let err = create_client(URL, KEY, ClientOptions::new().schema("")).unwrap_err();
    assert!(matches!(err, TealbaseError::Config(_)));

    let err = create_client(URL, KEY, ClientOptions::new().header("bad header", "x")).unwrap_err();
    assert!(matches!(err, TealbaseError::Config(_)));
}

#[test]
fn endpoints_keep_the_path_prefix() {
    let client = create_client(
        "https://example.com/project",
        KEY,
        ClientOptions::new().realtime_param("vsn", "1.0.0"),
    )
    .unwrap();
    let endpoints = client.endpoints();

    assert_eq!(endpoints.rest().as_str(), "https://example.com/project/rest/v1");
    assert_eq!(endpoints.auth().as_str(), "https://example.com/project/auth/v1");
    assert_eq!(client.storage().url().as_str(), "https://example.com/project/storage/v1");
    assert_eq!(
        client.functions().url().as_str(),
        "https://example.com/project/functions/v1"
    );
    assert_eq!(
        client.realtime_url().as_str(),
        "wss://example.com/project/realtime/v1/websocket?apikey=anon-key&vsn=1.0.0"
    );
}

#[test]
fn storage_key_defaults_to_project_ref() {
    let client = create_client(URL, KEY, ClientOptions::default()).unwrap();
    assert_eq!(client.storage_key(), "sb-abc-auth-token");

    let options = ClientOptions::new().auth(AuthOptions::new().storage_key("custom-key"));
    let client = create_client(URL, KEY, options).unwrap();
    assert_eq!(client.storage_key(), "custom-key");
}

#[test]
fn static_headers_carry_key_and_client_info() {
    let client = create_client(URL, KEY, ClientOptions::new().header("x-app", "demo")).unwrap();
    let headers = client.headers();

    assert_eq!(header(&headers, "apikey"), Some(KEY));
    assert_eq!(header(&headers, "x-app"), Some("demo"));
    assert_eq!(header(&headers, "x-client-info"), Some(CLIENT_INFO));
    assert!(headers.get("authorization").is_none());
    assert_eq!(client.api_key(), KEY);
}

// ── Query ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn queries_use_key_without_session() {
    let (client, recorder) = client_with(ClientOptions::new().header("x-app", "demo"));

    let response = client.from("cities").eq("country", "NZ").select("name").await;
    assert!(response.is_ok());

    let request = recorder.last_query();
    assert_eq!(request.url.as_str(), "https://abc.tealbase.co/rest/v1/cities");
    assert_eq!(request.schema, "public");
    assert_eq!(header(&request.headers, "authorization"), Some("Bearer anon-key"));
    assert_eq!(header(&request.headers, "x-app"), Some("demo"));
    assert_eq!(header(&request.headers, "x-client-info"), Some(CLIENT_INFO));
}

#[tokio::test]
async fn queries_follow_the_native_session() {
    let backend = Arc::new(SessionBackend::signed_in("user-jwt"));
    let options = ClientOptions::new().auth(AuthOptions::new().backend(backend.clone()));
    let (client, recorder) = client_with(options);

    client.from("todos").select("*").await;
    assert_eq!(
        header(&recorder.last_query().headers, "authorization"),
        Some("Bearer user-jwt")
    );

    client.auth().sign_out().await.unwrap();
    client.from("todos").select("*").await;
    assert_eq!(
        header(&recorder.last_query().headers, "authorization"),
        Some("Bearer anon-key")
    );
}

#[tokio::test]
async fn schema_option_reaches_queries() {
    let (client, recorder) = client_with(ClientOptions::new().schema("private"));

    client.from("notes").select("*").await;
    assert_eq!(recorder.last_query().schema, "private");

    client.schema("audit").from("events").select("*").await;
    assert_eq!(recorder.last_query().schema, "audit");
    assert_eq!(client.query().schema_name(), "private");
}

#[tokio::test]
async fn rpc_is_dispatched_with_headers() {
    let (client, recorder) = client_with(third_party("external-jwt"));

    let response = client
        .rpc("add_numbers", json!({"a": 1, "b": 2}), RpcOptions::default())
        .await;
    assert_eq!(response.data, vec![json!(3)]);

    let request = recorder.last_rpc();
    assert_eq!(
        request.url.as_str(),
        "https://abc.tealbase.co/rest/v1/rpc/add_numbers"
    );
    assert_eq!(request.args, json!({"a": 1, "b": 2}));
    assert_eq!(
        header(&request.headers, "authorization"),
        Some("Bearer external-jwt")
    );
}

// ── Third-party tokens ────────────────────────────────────────────────────────

#[tokio::test]
async fn third_party_mode_disables_auth() {
    let (client, recorder) = client_with(third_party("external-jwt"));

    assert!(client.auth().is_disabled());
    let err = client.auth().get_session().await.unwrap_err();
    assert!(matches!(err, AuthError::ConfigConflict("get_session")));
    let err: TealbaseError = client.auth().sign_out().await.unwrap_err().into();
    assert!(matches!(err, TealbaseError::ConfigConflict(_)));

    client.from("todos").select("*").await;
    assert_eq!(
        header(&recorder.last_query().headers, "authorization"),
        Some("Bearer external-jwt")
    );
}

#[tokio::test]
async fn third_party_mode_ignores_auth_backend() {
    let backend = Arc::new(SessionBackend::signed_in("user-jwt"));
    let options = third_party("external-jwt").auth(AuthOptions::new().backend(backend));
    let (client, recorder) = client_with(options);

    assert!(client.auth().is_disabled());
    client.from("todos").select("*").await;
    assert_eq!(
        header(&recorder.last_query().headers, "authorization"),
        Some("Bearer external-jwt")
    );
}

#[tokio::test]
async fn failing_token_provider_is_reported_in_band() {
    let options = ClientOptions::new().access_token(access_token_provider(|| async {
        Err::<Option<String>, _>("token service down".into())
    }));
    let (client, recorder) = client_with(options);

    let response = client.from("todos").select("*").await;
    assert!(matches!(response.error, Some(TealbaseError::TokenResolution(_))));
    assert!(recorder.queries.lock().unwrap().is_empty());

    let headers = client.resolve_headers().await;
    assert!(matches!(headers, Err(TealbaseError::TokenResolution(_))));
}

// ── Channels ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn channel_lifecycle_through_the_client() {
    let transport = Arc::new(CountingTransport::default());
    let client = create_client(
        URL,
        KEY,
        third_party("external-jwt").transport(transport.clone()),
    )
    .unwrap();

    let first = client.channel("room-1", ChannelConfig::new()).await;
    let second = client.channel("room-2", ChannelConfig::new()).await;
    assert_eq!(transport.connects.load(Ordering::SeqCst), 0);

    let topics: Vec<String> = client
        .get_channels()
        .await
        .iter()
        .map(|c| c.topic().to_string())
        .collect();
    assert_eq!(topics, vec!["realtime:room-1", "realtime:room-2"]);

    first.subscribe().await.unwrap();
    second.subscribe().await.unwrap();
    assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
    let joins = transport.joins.lock().unwrap().clone();
    assert_eq!(joins.len(), 2);
    assert_eq!(joins[0].payload.access_token.as_deref(), Some("external-jwt"));

    assert_eq!(client.remove_channel(&first).await.unwrap(), 1);
    assert_eq!(transport.disconnects.load(Ordering::SeqCst), 0);
    assert_eq!(client.get_channels().await.len(), 1);

    let outcomes = client.remove_all_channels().await;
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes.iter().all(Result::is_ok));
    assert_eq!(transport.disconnects.load(Ordering::SeqCst), 1);
    assert!(client.get_channels().await.is_empty());
    assert_eq!(first.state().await, ChannelState::Closed);
}

#[tokio::test]
async fn channels_without_transport_cannot_join() {
    let client = create_client(URL, KEY, ClientOptions::default()).unwrap();

    let channel = client.channel("room-1", ChannelConfig::new()).await;
    assert!(channel.subscribe().await.is_err());
    client.remove_channel(&channel).await.unwrap();
    assert!(client.get_channels().await.is_empty());
}

#[tokio::test]
async fn on_table_subscribes_in_the_client_schema() {
    let transport = Arc::new(CountingTransport::default());
    let options = third_party("external-jwt").schema("app").transport(transport.clone());
    let client = create_client(URL, KEY, options).unwrap();

    let channel = client.on("todos", PostgresChangesEvent::Update, |_| {}).await;
    assert_eq!(channel.topic(), "realtime:app:todos");
    assert_eq!(transport.connects.load(Ordering::SeqCst), 0);

    channel.subscribe().await.unwrap();
    let joins = transport.joins.lock().unwrap().clone();
    let filter = &joins[0].payload.config.postgres_changes[0];
    assert_eq!(filter.schema, "app");
    assert_eq!(filter.table.as_deref(), Some("todos"));
    assert_eq!(filter.event, "UPDATE");

    assert_eq!(client.remove_channel(&channel).await.unwrap(), 0);
    assert_eq!(transport.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn clones_share_the_registry() {
    let client = create_client(URL, KEY, ClientOptions::default()).unwrap();
    let clone = client.clone();

    clone.channel("shared", ChannelConfig::new()).await;
    assert_eq!(client.get_channels().await.len(), 1);
    assert_eq!(client.realtime().len().await, 1);
}

// ── Storage and functions ─────────────────────────────────────────────────────

#[tokio::test]
async fn storage_resolves_headers_and_urls() {
    let client = create_client(
        URL,
        KEY,
        third_party("external-jwt").storage_option("region", "eu"),
    )
    .unwrap();
    let storage = client.storage();

    assert_eq!(
        storage.public_url("avatars", "u1.png").unwrap().as_str(),
        "https://abc.tealbase.co/storage/v1/object/public/avatars/u1.png"
    );
    assert_eq!(
        storage.options().settings.get("region").map(String::as_str),
        Some("eu")
    );
    let headers = storage.headers().await.unwrap();
    assert_eq!(header(&headers, "authorization"), Some("Bearer external-jwt"));
    assert!(std::ptr::eq(storage, client.storage()));
}

#[test]
fn debug_output_hides_secrets() {
    let client = create_client(URL, KEY, third_party("external-jwt")).unwrap();
    let debug = format!("{client:?}");
    assert!(debug.contains("third_party_auth: true"));
    assert!(!debug.contains(KEY));
}

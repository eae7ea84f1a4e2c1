use futures_util::future::BoxFuture;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value as JsonValue;
use url::Url;

use tealbase_core::{Row, TealbaseError, TealbaseResponse};

use crate::filter::FilterOp;
use crate::postgrest::{self, Rendered};

/// Row-count strategy requested from the query endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountOption {
    Exact,
    Planned,
    Estimated,
}

impl CountOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Planned => "planned",
            Self::Estimated => "estimated",
        }
    }
}

/// The terminal operation of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperation {
    Select { columns: String },
    Insert { rows: Vec<Row> },
    Update { values: Row },
    Delete,
}

impl QueryOperation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Select { .. } => "select",
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Delete => "delete",
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, Self::Select { .. })
    }
}

/// A fully assembled table query, handed to a [`QueryExecutor`].
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// `{rest}/{table}`.
    pub url: Url,
    pub table: String,
    pub schema: String,
    /// Resolved auth headers plus custom headers.
    pub headers: HeaderMap,
    pub operation: QueryOperation,
    pub count: Option<CountOption>,
    ops: Vec<FilterOp>,
}

impl QueryRequest {
    pub fn new(
        url: Url,
        table: impl Into<String>,
        schema: impl Into<String>,
        headers: HeaderMap,
        operation: QueryOperation,
    ) -> Self {
        Self {
            url,
            table: table.into(),
            schema: schema.into(),
            headers,
            operation,
            count: None,
            ops: Vec::new(),
        }
    }

    /// Apply one chain operation. Called once per operation, in chain order.
    pub fn apply(&mut self, op: FilterOp) {
        self.ops.push(op);
    }

    /// Operations in the order they were applied.
    pub fn ops(&self) -> &[FilterOp] {
        &self.ops
    }

    pub fn is_single(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, FilterOp::Single))
    }
}

/// Options for a remote procedure call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RpcOptions {
    /// Only fetch the count; no rows are returned.
    pub head: bool,
    /// Call with GET, passing the arguments as query parameters.
    pub get: bool,
    pub count: Option<CountOption>,
}

impl RpcOptions {
    pub fn head(mut self, head: bool) -> Self {
        self.head = head;
        self
    }

    pub fn get(mut self, get: bool) -> Self {
        self.get = get;
        self
    }

    pub fn count(mut self, count: CountOption) -> Self {
        self.count = Some(count);
        self
    }
}

/// A remote procedure call, handed to a [`QueryExecutor`].
#[derive(Debug, Clone)]
pub struct RpcRequest {
    /// `{rest}/rpc/{function}`.
    pub url: Url,
    pub function: String,
    pub schema: String,
    pub headers: HeaderMap,
    /// A JSON object of named arguments, or null.
    pub args: JsonValue,
    pub options: RpcOptions,
}

/// The query collaborator: executes table queries and procedure calls.
///
/// Implementations report every failure in-band through the response.
pub trait QueryExecutor: Send + Sync {
    fn execute(&self, request: QueryRequest) -> BoxFuture<'_, TealbaseResponse<Row>>;

    fn rpc(&self, request: RpcRequest) -> BoxFuture<'_, TealbaseResponse<JsonValue>>;
}

/// [`QueryExecutor`] that talks to a PostgREST endpoint over HTTP.
#[derive(Debug, Clone, Default)]
pub struct RestExecutor {
    http: reqwest::Client,
}

impl RestExecutor {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn send<T: serde::de::DeserializeOwned + Send>(
        &self,
        rendered: Rendered,
        single: bool,
    ) -> TealbaseResponse<T> {
        tracing::debug!(
            method = %rendered.method,
            url = %rendered.url,
            "Executing PostgREST request"
        );

        let head = rendered.method == Method::HEAD;
        let mut request = self
            .http
            .request(rendered.method, rendered.url)
            .headers(rendered.headers);
        if let Some(body) = rendered.body {
            request = request.json(&body);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => return TealbaseResponse::error(TealbaseError::Http(e.to_string())),
        };

        let status = response.status().as_u16();
        let headers = response.headers().clone();

        if head {
            return postgrest::parse_head_response(status, &headers);
        }

        let body = match response.text().await {
            Ok(t) => t,
            Err(e) => return TealbaseResponse::error(TealbaseError::Http(e.to_string())),
        };

        postgrest::parse_response(status, &headers, &body, single)
    }
}

impl QueryExecutor for RestExecutor {
    fn execute(&self, request: QueryRequest) -> BoxFuture<'_, TealbaseResponse<Row>> {
        Box::pin(async move {
            match postgrest::render_query(&request) {
                Ok(rendered) => self.send(rendered, request.is_single()).await,
                Err(e) => TealbaseResponse::error(e),
            }
        })
    }

    fn rpc(&self, request: RpcRequest) -> BoxFuture<'_, TealbaseResponse<JsonValue>> {
        Box::pin(async move {
            match postgrest::render_rpc(&request) {
                Ok(rendered) => self.send(rendered, false).await,
                Err(e) => TealbaseResponse::error(e),
            }
        })
    }
}

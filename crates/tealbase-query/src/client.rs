use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use url::Url;

use tealbase_core::endpoints::endpoint_url;
use tealbase_core::{HeaderResolver, TealbaseError, TealbaseResponse};

use crate::builder::QueryBuilder;
use crate::executor::{QueryExecutor, RpcOptions, RpcRequest};

/// Entry point to the query endpoint: hands out builders and issues RPCs.
///
/// Cheap to clone; clones share the resolver and executor.
#[derive(Clone)]
pub struct QueryClient {
    rest_url: Url,
    schema: String,
    resolver: Arc<HeaderResolver>,
    executor: Arc<dyn QueryExecutor>,
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("rest_url", &self.rest_url.as_str())
            .field("schema", &self.schema)
            .finish()
    }
}

impl QueryClient {
    pub fn new(
        rest_url: Url,
        schema: impl Into<String>,
        resolver: Arc<HeaderResolver>,
        executor: Arc<dyn QueryExecutor>,
    ) -> Self {
        Self {
            rest_url,
            schema: schema.into(),
            resolver,
            executor,
        }
    }

    pub fn rest_url(&self) -> &Url {
        &self.rest_url
    }

    pub fn schema_name(&self) -> &str {
        &self.schema
    }

    /// A client identical to this one but targeting another schema.
    pub fn schema(&self, schema: impl Into<String>) -> QueryClient {
        Self {
            schema: schema.into(),
            ..self.clone()
        }
    }

    /// A builder with no table selected.
    pub fn builder(&self) -> QueryBuilder {
        QueryBuilder::new(
            self.rest_url.clone(),
            self.schema.clone(),
            Arc::clone(&self.resolver),
            Arc::clone(&self.executor),
        )
    }

    /// A builder targeting `table`.
    pub fn from(&self, table: impl Into<String>) -> QueryBuilder {
        let mut builder = self.builder();
        builder.from(table);
        builder
    }

    /// Call a database function. `args` must be a JSON object or null.
    pub async fn rpc(
        &self,
        function: &str,
        args: JsonValue,
        options: RpcOptions,
    ) -> TealbaseResponse<JsonValue> {
        if !(args.is_object() || args.is_null()) {
            return TealbaseResponse::error(TealbaseError::query_builder(format!(
                "rpc arguments for '{function}' must be a JSON object"
            )));
        }

        let headers = match self.resolver.resolve().await {
            Ok(h) => h,
            Err(e) => {
                tracing::debug!(function, error = %e, "Header resolution failed");
                return TealbaseResponse::error(e);
            }
        };
        let url = match endpoint_url(&self.rest_url, &["rpc", function]) {
            Ok(u) => u,
            Err(e) => return TealbaseResponse::error(e),
        };

        tracing::debug!(function, head = options.head, get = options.get, "Dispatching rpc");
        self.executor
            .rpc(RpcRequest {
                url,
                function: function.to_string(),
                schema: self.schema.clone(),
                headers,
                args,
                options,
            })
            .await
    }
}

use std::fmt;
use std::sync::Arc;

use url::Url;

use tealbase_core::endpoints::endpoint_url;
use tealbase_core::{HeaderResolver, Row, TealbaseError, TealbaseResponse};

use crate::chain::{FilterChain, Filterable};
use crate::executor::{CountOption, QueryExecutor, QueryOperation, QueryRequest};

/// Reusable query builder created by `client.from("table")`.
///
/// Chain filters, then call a terminal (`select`, `insert`, `update`,
/// `delete`). The terminal consumes the chain and the table name, so the same
/// builder can then be pointed at another table with [`from`](Self::from).
pub struct QueryBuilder {
    rest_url: Url,
    schema: String,
    resolver: Arc<HeaderResolver>,
    executor: Arc<dyn QueryExecutor>,
    table: Option<String>,
    count: Option<CountOption>,
    chain: FilterChain,
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("rest_url", &self.rest_url.as_str())
            .field("schema", &self.schema)
            .field("table", &self.table)
            .field("chain", &self.chain)
            .finish()
    }
}

impl QueryBuilder {
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
            table: None,
            count: None,
            chain: FilterChain::new(),
        }
    }

    /// Target `table` for the next terminal operation.
    pub fn from(&mut self, table: impl Into<String>) -> &mut Self {
        self.table = Some(table.into());
        self
    }

    /// Request a row count with the next terminal operation.
    pub fn count(&mut self, count: CountOption) -> &mut Self {
        self.count = Some(count);
        self
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }

    /// True when no table is selected and no operations are pending.
    pub fn is_clear(&self) -> bool {
        self.table.is_none() && self.count.is_none() && self.chain.is_empty()
    }

    /// Fetch rows. `columns` uses PostgREST select syntax, e.g. `"id,name"` or `"*"`.
    pub async fn select(&mut self, columns: &str) -> TealbaseResponse<Row> {
        self.dispatch(QueryOperation::Select {
            columns: columns.to_string(),
        })
        .await
    }

    pub async fn insert(&mut self, rows: impl IntoIterator<Item = Row>) -> TealbaseResponse<Row> {
        self.dispatch(QueryOperation::Insert {
            rows: rows.into_iter().collect(),
        })
        .await
    }

    pub async fn update(&mut self, values: Row) -> TealbaseResponse<Row> {
        self.dispatch(QueryOperation::Update { values }).await
    }

    pub async fn delete(&mut self) -> TealbaseResponse<Row> {
        self.dispatch(QueryOperation::Delete).await
    }

    async fn dispatch(&mut self, operation: QueryOperation) -> TealbaseResponse<Row> {
        // Reset first so the builder is reusable whatever happens below.
        let chain = self.chain.take();
        let count = self.count.take();
        let Some(table) = self.table.take() else {
            return TealbaseResponse::error(TealbaseError::query_builder(format!(
                "no table selected for {}; call from() first",
                operation.name()
            )));
        };
        if let Some(message) = chain.errors().first() {
            return TealbaseResponse::error(TealbaseError::query_builder(message.clone()));
        }

        let headers = match self.resolver.resolve().await {
            Ok(h) => h,
            Err(e) => {
                tracing::debug!(table = %table, error = %e, "Header resolution failed");
                return TealbaseResponse::error(e);
            }
        };
        let url = match endpoint_url(&self.rest_url, &[table.as_str()]) {
            Ok(u) => u,
            Err(e) => return TealbaseResponse::error(e),
        };

        let mut request = QueryRequest::new(url, table, self.schema.clone(), headers, operation);
        request.count = count;
        for op in chain {
            request.apply(op);
        }

        tracing::debug!(
            table = %request.table,
            operation = request.operation.name(),
            ops = request.ops().len(),
            "Dispatching query"
        );
        self.executor.execute(request).await
    }
}

impl Filterable for QueryBuilder {
    fn chain_mut(&mut self) -> &mut FilterChain {
        &mut self.chain
    }
}

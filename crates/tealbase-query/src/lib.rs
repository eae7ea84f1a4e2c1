//! Query surface of the tealbase client.
//!
//! A [`QueryBuilder`] accumulates an ordered [`FilterChain`] and replays it
//! onto a [`QueryRequest`] when a terminal operation runs. Requests go to a
//! [`QueryExecutor`]; [`RestExecutor`] speaks PostgREST over HTTP.

pub mod builder;
pub mod chain;
pub mod client;
pub mod executor;
pub mod filter;
pub mod postgrest;

pub use builder::QueryBuilder;
pub use chain::{FilterChain, Filterable};
pub use client::QueryClient;
pub use executor::{
    CountOption, QueryExecutor, QueryOperation, QueryRequest, RestExecutor, RpcOptions,
    RpcRequest,
};
pub use filter::{FilterOp, FilterOperator, OPERATORS};

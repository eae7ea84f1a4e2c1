//! Shared building blocks of the tealbase client.
//!
//! Holds the error and response types used across every subsystem, the
//! endpoint derivation rule and the per-request authorization headers.

pub mod endpoints;
pub mod error;
pub mod headers;
pub mod response;
pub mod value;

pub use endpoints::Endpoints;
pub use error::{BoxError, StatusCode, TealbaseError, TealbaseResult};
pub use headers::{
    access_token_provider, AccessTokenProvider, AuthMode, HeaderResolver, SessionAccessor,
    CLIENT_INFO, CLIENT_INFO_HEADER,
};
pub use response::TealbaseResponse;
pub use value::Row;

#[doc(hidden)]
pub use serde_json;

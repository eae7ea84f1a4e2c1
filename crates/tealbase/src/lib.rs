//! tealbase client.
//!
//! One [`TealbaseClient`] fronts the query, realtime, auth, storage and
//! functions subsystems of a project, all derived from a single base URL
//! and API key.
//!
//! # Usage
//!
//! ```ignore
//! use tealbase::prelude::*;
//!
//! let client = create_client("https://abc.tealbase.co", "anon-key", ClientOptions::default())?;
//!
//! let cities = client.from("cities").eq("country", "NZ").select("name").await;
//!
//! let channel = client.channel("room-1", ChannelConfig::new()).await;
//! channel.subscribe().await?;
//! client.remove_channel(&channel).await?;
//! ```
//!
//! With a third-party token provider the native auth surface is disabled and
//! every request carries the provider's token:
//!
//! ```ignore
//! let options = ClientOptions::new()
//!     .access_token(access_token_provider(|| async { Ok(Some(fetch_jwt().await?)) }));
//! let client = create_client(url, key, options)?;
//! assert!(client.auth().is_disabled());
//! ```

pub mod client;
pub mod functions;
pub mod options;
pub mod storage;

pub use client::{create_client, TealbaseClient};
pub use functions::{FunctionsClient, InvokeBody, InvokeOptions};
pub use options::{ClientOptions, DbOptions, GlobalOptions, RealtimeOptions, StorageOptions};
pub use storage::StorageClient;

pub use tealbase_auth;
pub use tealbase_core;
pub use tealbase_query;
pub use tealbase_realtime;

pub use tealbase_core::{
    access_token_provider, AccessTokenProvider, Endpoints, Row, StatusCode, TealbaseError,
    TealbaseResponse, TealbaseResult,
};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tealbase::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{create_client, ClientOptions, InvokeOptions, TealbaseClient};
    pub use tealbase_core::{
        access_token_provider, Row, TealbaseError, TealbaseResponse, TealbaseResult,
    };

    pub use tealbase_query::{CountOption, FilterChain, Filterable, QueryBuilder, RpcOptions};

    pub use tealbase_auth::{AuthClient, AuthError, AuthOptions, Credentials, Session, User};

    pub use tealbase_realtime::{
        Channel, ChannelConfig, ChannelState, PostgresChangesEvent, PostgresChangesFilter,
        RealtimeError, SubscriptionStatus,
    };
}

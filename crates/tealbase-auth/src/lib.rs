//! Native auth surface of the tealbase client.
//!
//! [`AuthClient`] forwards to an [`AuthBackend`]; the default backend,
//! [`HttpAuthBackend`], talks to the `/auth/v1` endpoint and keeps the
//! current session. The backend also feeds the session token into the
//! request headers of the other subsystems.
//!
//! # Usage
//!
//! ```ignore
//! let auth = client.auth();
//! auth.sign_up(Credentials::email("user@example.com", "password123")).await?;
//! let session = auth
//!     .sign_in_with_password(Credentials::email("user@example.com", "password123"))
//!     .await?;
//! let user = auth.get_user(None).await?;
//! auth.sign_out().await?;
//! ```

pub mod backend;
pub mod client;
pub mod error;
pub mod http;
pub mod options;
pub mod types;

pub use backend::{AuthBackend, MemoryStorage, SessionStorage};
pub use client::AuthClient;
pub use error::{AuthError, AuthErrorResponse};
pub use http::HttpAuthBackend;
pub use options::AuthOptions;
pub use types::{
    AuthResponse, Credentials, FlowType, Session, SignOutScope, User, EXPIRY_MARGIN_SECS,
};

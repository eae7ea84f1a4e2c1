use std::fmt;
use std::sync::Arc;

use tealbase_core::SessionAccessor;
use tracing::debug;

use crate::backend::{session_accessor, AuthBackend};
use crate::error::AuthError;
use crate::types::{AuthResponse, Credentials, Session, SignOutScope, User};

#[derive(Clone)]
enum AuthState {
    Native(Arc<dyn AuthBackend>),
    /// A third-party access token provider is configured.
    Disabled,
}

/// The native auth surface of a client.
///
/// When the client uses a third-party access token provider, every method
/// fails with [`AuthError::ConfigConflict`] without touching the network.
///
/// # Example
/// ```ignore
/// let session = client
///     .auth()
///     .sign_in_with_password(Credentials::email("user@example.com", "password"))
///     .await?;
/// ```
#[derive(Clone)]
pub struct AuthClient {
    state: AuthState,
}

impl fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            AuthState::Native(_) => "native",
            AuthState::Disabled => "disabled",
        };
        f.debug_struct("AuthClient").field("state", &state).finish()
    }
}

impl AuthClient {
    pub fn native(backend: Arc<dyn AuthBackend>) -> Self {
        Self {
            state: AuthState::Native(backend),
        }
    }

    pub fn disabled() -> Self {
        Self {
            state: AuthState::Disabled,
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self.state, AuthState::Disabled)
    }

    /// The backend as a session source for request headers.
    pub fn session_accessor(&self) -> Option<Arc<dyn SessionAccessor>> {
        match &self.state {
            AuthState::Native(backend) => Some(session_accessor(Arc::clone(backend))),
            AuthState::Disabled => None,
        }
    }

    fn backend(&self, method: &'static str) -> Result<&Arc<dyn AuthBackend>, AuthError> {
        match &self.state {
            AuthState::Native(backend) => Ok(backend),
            AuthState::Disabled => {
                debug!(method, "Native auth call rejected in third-party token mode");
                Err(AuthError::ConfigConflict(method))
            }
        }
    }

    // ─── Sign Up / Sign In ─────────────────────────────────────

    pub async fn sign_up(&self, credentials: Credentials) -> Result<AuthResponse, AuthError> {
        self.backend("sign_up")?.sign_up(credentials).await
    }

    pub async fn sign_in_with_password(
        &self,
        credentials: Credentials,
    ) -> Result<Session, AuthError> {
        self.backend("sign_in_with_password")?
            .sign_in_with_password(credentials)
            .await
    }

    // ─── Sign Out ──────────────────────────────────────────────

    /// Sign out everywhere.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.sign_out_with_scope(SignOutScope::Global).await
    }

    pub async fn sign_out_with_scope(&self, scope: SignOutScope) -> Result<(), AuthError> {
        self.backend("sign_out")?.sign_out(scope).await
    }

    // ─── Session / User ────────────────────────────────────────

    /// Fetch the user for `jwt`, or for the current session.
    pub async fn get_user(&self, jwt: Option<&str>) -> Result<User, AuthError> {
        self.backend("get_user")?
            .get_user(jwt.map(str::to_string))
            .await
    }

    pub async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        self.backend("get_session")?.get_session().await
    }

    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        self.backend("refresh_session")?.refresh_session().await
    }
}

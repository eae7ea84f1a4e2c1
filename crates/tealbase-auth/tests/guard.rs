//! Auth guard behaviour against an in-memory backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;

use tealbase_auth::{
    AuthBackend, AuthClient, AuthError, AuthResponse, Credentials, Session, SignOutScope, User,
};
use tealbase_core::SessionAccessor;

fn user(id: &str) -> User {
    serde_json::from_value(serde_json::json!({ "id": id, "email": "a@b.co" })).unwrap()
}

fn session(token: &str) -> Session {
    Session {
        access_token: token.into(),
        refresh_token: "refresh".into(),
        expires_in: 3600,
        expires_at: None,
        token_type: "bearer".into(),
        user: user("u1"),
    }
}

#[derive(Default)]
struct FakeBackend {
    calls: AtomicUsize,
    session: Mutex<Option<Session>>,
    scopes: Mutex<Vec<SignOutScope>>,
}

impl FakeBackend {
    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl SessionAccessor for FakeBackend {
    fn access_token(&self) -> BoxFuture<'_, Option<String>> {
        Box::pin(async move {
            self.session
                .lock()
                .unwrap()
                .as_ref()
                .map(|s| s.access_token.clone())
        })
    }
}

impl AuthBackend for FakeBackend {
    fn sign_up(&self, _credentials: Credentials) -> BoxFuture<'_, Result<AuthResponse, AuthError>> {
        Box::pin(async move {
            self.hit();
            Ok(AuthResponse {
                session: None,
                user: Some(user("new")),
            })
        })
    }

    fn sign_in_with_password(
        &self,
        credentials: Credentials,
    ) -> BoxFuture<'_, Result<Session, AuthError>> {
        Box::pin(async move {
            self.hit();
            if credentials.to_body()["password"] != "secret" {
                return Err(AuthError::Api {
                    status: 400,
                    message: "Invalid login credentials".into(),
                    error_code: Some("invalid_credentials".into()),
                });
            }
            let s = session("user-jwt");
            *self.session.lock().unwrap() = Some(s.clone());
            Ok(s)
        })
    }

    fn sign_out(&self, scope: SignOutScope) -> BoxFuture<'_, Result<(), AuthError>> {
        Box::pin(async move {
            self.hit();
            self.scopes.lock().unwrap().push(scope);
            self.session.lock().unwrap().take();
            Ok(())
        })
    }

    fn get_user(&self, jwt: Option<String>) -> BoxFuture<'_, Result<User, AuthError>> {
        Box::pin(async move {
            self.hit();
            match jwt {
                Some(token) => Ok(user(&token)),
                None => self
                    .session
                    .lock()
                    .unwrap()
                    .as_ref()
                    .map(|s| s.user.clone())
                    .ok_or(AuthError::NoSession),
            }
        })
    }

    fn get_session(&self) -> BoxFuture<'_, Result<Option<Session>, AuthError>> {
        Box::pin(async move {
            self.hit();
            Ok(self.session.lock().unwrap().clone())
        })
    }

    fn refresh_session(&self) -> BoxFuture<'_, Result<Session, AuthError>> {
        Box::pin(async move {
            self.hit();
            let refreshed = session("refreshed-jwt");
            *self.session.lock().unwrap() = Some(refreshed.clone());
            Ok(refreshed)
        })
    }
}

fn conflict_method(err: AuthError) -> &'static str {
    match err {
        AuthError::ConfigConflict(method) => method,
        other => panic!("expected a configuration conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn disabled_guard_rejects_every_method() {
    let auth = AuthClient::disabled();
    let creds = || Credentials::email("a@b.co", "secret");

    assert!(auth.is_disabled());
    assert!(auth.session_accessor().is_none());
    assert_eq!(conflict_method(auth.sign_up(creds()).await.unwrap_err()), "sign_up");
    assert_eq!(
        conflict_method(auth.sign_in_with_password(creds()).await.unwrap_err()),
        "sign_in_with_password"
    );
    assert_eq!(conflict_method(auth.sign_out().await.unwrap_err()), "sign_out");
    assert_eq!(conflict_method(auth.get_user(None).await.unwrap_err()), "get_user");
    assert_eq!(conflict_method(auth.get_session().await.unwrap_err()), "get_session");
    assert_eq!(
        conflict_method(auth.refresh_session().await.unwrap_err()),
        "refresh_session"
    );
}

#[tokio::test]
async fn conflict_message_names_the_method() {
    let err = AuthClient::disabled()
        .get_user(Some("jwt"))
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("access_token"));
    assert!(message.contains("auth.get_user"));
}

#[tokio::test]
async fn native_guard_forwards_to_backend() {
    let backend = Arc::new(FakeBackend::default());
    let auth = AuthClient::native(backend.clone());

    assert!(!auth.is_disabled());
    assert_eq!(auth.get_session().await.unwrap(), None);

    let signed_in = auth
        .sign_in_with_password(Credentials::email("a@b.co", "secret"))
        .await
        .unwrap();
    assert_eq!(signed_in.access_token, "user-jwt");
    assert_eq!(auth.get_user(None).await.unwrap().id, "u1");
    assert_eq!(auth.get_user(Some("other")).await.unwrap().id, "other");
    assert_eq!(auth.refresh_session().await.unwrap().access_token, "refreshed-jwt");

    auth.sign_out_with_scope(SignOutScope::Local).await.unwrap();
    assert_eq!(*backend.scopes.lock().unwrap(), vec![SignOutScope::Local]);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn backend_errors_pass_through() {
    let auth = AuthClient::native(Arc::new(FakeBackend::default()));

    let err = auth
        .sign_in_with_password(Credentials::email("a@b.co", "wrong"))
        .await
        .unwrap_err();
    match err {
        AuthError::Api {
            status, error_code, ..
        } => {
            assert_eq!(status, 400);
            assert_eq!(error_code.as_deref(), Some("invalid_credentials"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(matches!(auth.get_user(None).await, Err(AuthError::NoSession)));
}

#[tokio::test]
async fn session_accessor_follows_backend_session() {
    let backend = Arc::new(FakeBackend::default());
    let auth = AuthClient::native(backend.clone());
    let accessor = auth.session_accessor().unwrap();

    assert_eq!(accessor.access_token().await, None);
    auth.sign_in_with_password(Credentials::email("a@b.co", "secret"))
        .await
        .unwrap();
    assert_eq!(accessor.access_token().await.as_deref(), Some("user-jwt"));

    auth.sign_out().await.unwrap();
    assert_eq!(accessor.access_token().await, None);
}

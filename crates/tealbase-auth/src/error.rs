use serde::Deserialize;
use tealbase_core::TealbaseError;

/// Error response format from the auth API.
///
/// The server may return errors in different shapes; this covers the common fields.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

impl AuthErrorResponse {
    /// Extract the most informative error message from the response.
    pub fn error_message(&self) -> String {
        self.msg
            .as_deref()
            .or(self.message.as_deref())
            .or(self.error_description.as_deref())
            .or(self.error.as_deref())
            .unwrap_or("Unknown error")
            .to_string()
    }
}

/// Auth-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The client was created with a third-party access token provider, so
    /// the native auth surface cannot be used. Carries the method name.
    #[error(
        "tealbase client is configured with the access_token option, accessing auth.{0} is not possible"
    )]
    ConfigConflict(&'static str),

    /// No auth backend is available.
    #[error("Invalid auth configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The auth API returned an error response.
    #[error("Auth API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        error_code: Option<String>,
    },

    #[error("No active session")]
    NoSession,

    /// Session storage failed to read or write.
    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl From<AuthError> for TealbaseError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::ConfigConflict(_) => TealbaseError::ConfigConflict(err.to_string()),
            AuthError::InvalidConfig(msg) => TealbaseError::Config(msg),
            other => TealbaseError::Auth(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_precedence() {
        let body: AuthErrorResponse = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        )
        .unwrap();
        assert_eq!(body.error_message(), "Invalid login credentials");

        let body: AuthErrorResponse =
            serde_json::from_str(r#"{"msg":"User already registered","error_code":"user_already_exists"}"#)
                .unwrap();
        assert_eq!(body.error_message(), "User already registered");
        assert_eq!(body.error_code.as_deref(), Some("user_already_exists"));

        let body: AuthErrorResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(body.error_message(), "Unknown error");
    }

    #[test]
    fn conflict_maps_to_core_conflict() {
        let err: TealbaseError = AuthError::ConfigConflict("sign_in_with_password").into();
        match err {
            TealbaseError::ConfigConflict(msg) => {
                assert!(msg.contains("access_token"));
                assert!(msg.contains("auth.sign_in_with_password"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn other_errors_map_to_auth() {
        let err: TealbaseError = AuthError::NoSession.into();
        assert_eq!(err, TealbaseError::Auth("No active session".into()));

        let err: TealbaseError = AuthError::InvalidConfig("no backend".into()).into();
        assert_eq!(err, TealbaseError::Config("no backend".into()));
    }
}

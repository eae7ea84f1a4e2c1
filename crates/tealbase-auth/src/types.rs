use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

/// Seconds before `expires_at` at which a session counts as expired.
pub const EXPIRY_MARGIN_SECS: i64 = 10;

/// A user session returned from sign-in, sign-up, or token refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub token_type: String,
    pub user: User,
}

impl Session {
    /// Whether the session expires within [`EXPIRY_MARGIN_SECS`] of `now`
    /// (unix seconds). Sessions without `expires_at` never expire locally.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at
            .map(|at| at - EXPIRY_MARGIN_SECS <= now)
            .unwrap_or(false)
    }
}

/// A user of the auth API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
    #[serde(default)]
    pub last_sign_in_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub user_metadata: Option<JsonValue>,
    #[serde(default)]
    pub app_metadata: Option<JsonValue>,
    #[serde(default)]
    pub is_anonymous: Option<bool>,
}

/// Response from sign-up: a session when auto-confirm is on, otherwise just the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub session: Option<Session>,
    #[serde(default)]
    pub user: Option<User>,
}

/// Email or phone credentials for sign-up and password sign-in.
#[derive(Clone, PartialEq)]
pub enum Credentials {
    Email {
        email: String,
        password: String,
        data: Option<JsonValue>,
    },
    Phone {
        phone: String,
        password: String,
        data: Option<JsonValue>,
    },
}

impl Credentials {
    pub fn email(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Email {
            email: email.into(),
            password: password.into(),
            data: None,
        }
    }

    pub fn phone(phone: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Phone {
            phone: phone.into(),
            password: password.into(),
            data: None,
        }
    }

    /// Attach user metadata, sent on sign-up.
    pub fn with_data(mut self, value: JsonValue) -> Self {
        match &mut self {
            Self::Email { data, .. } | Self::Phone { data, .. } => *data = Some(value),
        }
        self
    }

    /// Request body for the auth API.
    pub fn to_body(&self) -> JsonValue {
        let (mut body, data) = match self {
            Self::Email {
                email,
                password,
                data,
            } => (json!({ "email": email, "password": password }), data),
            Self::Phone {
                phone,
                password,
                data,
            } => (json!({ "phone": phone, "password": password }), data),
        };
        if let Some(data) = data {
            body["data"] = data.clone();
        }
        body
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email { email, .. } => f.debug_struct("Email").field("email", email).finish(),
            Self::Phone { phone, .. } => f.debug_struct("Phone").field("phone", phone).finish(),
        }
    }
}

/// OAuth flow used by the auth backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    #[default]
    Implicit,
    Pkce,
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Implicit => write!(f, "implicit"),
            Self::Pkce => write!(f, "pkce"),
        }
    }
}

/// Sign-out scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignOutScope {
    #[default]
    Global,
    Local,
    Others,
}

impl fmt::Display for SignOutScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Local => write!(f, "local"),
            Self::Others => write!(f, "others"),
        }
    }
}

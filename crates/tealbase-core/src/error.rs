use std::fmt;

/// Boxed error returned by user-supplied callbacks such as the access token provider.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All errors that can occur in the tealbase client crates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TealbaseError {
    /// Missing or malformed construction parameters.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Two configured features cannot be used together (e.g. `access_token` and native auth).
    #[error("Configuration conflict: {0}")]
    ConfigConflict(String),

    /// The third-party access token provider failed or produced no token.
    #[error("Access token resolution failed: {0}")]
    TokenResolution(String),

    #[error("Query builder error: {0}")]
    QueryBuilder(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("HTTP error: {0}")]
    Http(String),

    /// Error body returned by the query endpoint, passed through unmodified.
    #[error("PostgREST error ({status}): {message}")]
    Postgrest {
        status: u16,
        message: String,
        code: Option<String>,
        details: Option<String>,
        hint: Option<String>,
    },

    #[error("Expected exactly one row, but got none")]
    NoRows,

    #[error("Expected at most one row, but got {0}")]
    MultipleRows(usize),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Realtime error: {0}")]
    Realtime(String),

    #[error("Functions error: {0}")]
    Functions(String),
}

impl TealbaseError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn config_conflict(msg: impl Into<String>) -> Self {
        Self::ConfigConflict(msg.into())
    }

    pub fn token_resolution(msg: impl Into<String>) -> Self {
        Self::TokenResolution(msg.into())
    }

    pub fn query_builder(msg: impl Into<String>) -> Self {
        Self::QueryBuilder(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Build a PostgREST error with just a status and message.
    pub fn postgrest(status: u16, message: impl Into<String>, code: Option<String>) -> Self {
        Self::Postgrest {
            status,
            message: message.into(),
            code,
            details: None,
            hint: None,
        }
    }
}

impl From<serde_json::Error> for TealbaseError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for TealbaseError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

impl From<url::ParseError> for TealbaseError {
    fn from(e: url::ParseError) -> Self {
        Self::Config(format!("invalid URL: {e}"))
    }
}

/// Result alias using TealbaseError.
pub type TealbaseResult<T> = Result<T, TealbaseError>;

/// HTTP-like status codes for response metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    Created,
    NoContent,
    BadRequest,
    Unauthorized,
    NotFound,
    NotAcceptable,
    Conflict,
    InternalError,
    Other(u16),
}

impl StatusCode {
    pub fn from_u16(code: u16) -> Self {
        match code {
            200 => Self::Ok,
            201 => Self::Created,
            204 => Self::NoContent,
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            404 => Self::NotFound,
            406 => Self::NotAcceptable,
            409 => Self::Conflict,
            500 => Self::InternalError,
            other => Self::Other(other),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Created => 201,
            Self::NoContent => 204,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::NotFound => 404,
            Self::NotAcceptable => 406,
            Self::Conflict => 409,
            Self::InternalError => 500,
            Self::Other(code) => *code,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "200 OK"),
            Self::Created => write!(f, "201 Created"),
            Self::NoContent => write!(f, "204 No Content"),
            Self::BadRequest => write!(f, "400 Bad Request"),
            Self::Unauthorized => write!(f, "401 Unauthorized"),
            Self::NotFound => write!(f, "404 Not Found"),
            Self::NotAcceptable => write!(f, "406 Not Acceptable"),
            Self::Conflict => write!(f, "409 Conflict"),
            Self::InternalError => write!(f, "500 Internal Server Error"),
            Self::Other(code) => write!(f, "{code}"),
        }
    }
}

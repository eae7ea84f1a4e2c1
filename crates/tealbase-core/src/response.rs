use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{StatusCode, TealbaseError};

/// Response type matching the `{ data, error, count, status }` result shape.
///
/// Asynchronous operations never fail with `Err`; failures land in `error`.
#[derive(Debug)]
pub struct TealbaseResponse<T> {
    /// The returned data (empty Vec on error).
    pub data: Vec<T>,
    /// Error, if any.
    pub error: Option<TealbaseError>,
    /// Row count (if count was requested).
    pub count: Option<i64>,
    /// HTTP-like status code.
    pub status: StatusCode,
}

impl<T> TealbaseResponse<T> {
    /// Create a successful response with data.
    pub fn ok(data: Vec<T>) -> Self {
        Self {
            data,
            error: None,
            count: None,
            status: StatusCode::Ok,
        }
    }

    /// Create a no-content (204) response.
    pub fn no_content() -> Self {
        Self {
            data: Vec::new(),
            error: None,
            count: None,
            status: StatusCode::NoContent,
        }
    }

    /// Create an error response. The status is taken from the error when it carries one.
    pub fn error(err: TealbaseError) -> Self {
        let status = match &err {
            TealbaseError::NoRows => StatusCode::NotFound,
            TealbaseError::Postgrest { status, .. } => StatusCode::from_u16(*status),
            TealbaseError::TokenResolution(_) => StatusCode::Unauthorized,
            TealbaseError::QueryBuilder(_) => StatusCode::BadRequest,
            _ => StatusCode::InternalError,
        };
        Self {
            data: Vec::new(),
            error: Some(err),
            count: None,
            status,
        }
    }

    /// Check if the response is successful.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Check if the response has an error.
    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    /// Set the status code.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Set the count.
    pub fn with_count(mut self, count: Option<i64>) -> Self {
        self.count = count;
        self
    }

    /// Convert into a Result, consuming the response.
    pub fn into_result(self) -> Result<Vec<T>, TealbaseError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.data),
        }
    }

    /// Get the first item, or None if empty.
    pub fn first(&self) -> Option<&T> {
        self.data.first()
    }

    /// Consume and return exactly one row, or error.
    pub fn into_single(self) -> Result<T, TealbaseError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut data = self.data;
        match data.len() {
            0 => Err(TealbaseError::NoRows),
            1 => Ok(data.remove(0)),
            n => Err(TealbaseError::MultipleRows(n)),
        }
    }

    /// Consume and return zero or one row.
    pub fn into_maybe_single(self) -> Result<Option<T>, TealbaseError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut data = self.data;
        match data.len() {
            0 => Ok(None),
            1 => Ok(Some(data.remove(0))),
            n => Err(TealbaseError::MultipleRows(n)),
        }
    }
}

impl TealbaseResponse<JsonValue> {
    /// Deserialize every returned JSON value into `T`.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<Vec<T>, TealbaseError> {
        self.into_result()?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(TealbaseError::from))
            .collect()
    }
}

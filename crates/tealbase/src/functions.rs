use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value as JsonValue;
use tracing::debug;
use url::Url;

use tealbase_core::endpoints::endpoint_url;
use tealbase_core::{
    HeaderResolver, StatusCode, TealbaseError, TealbaseResponse, TealbaseResult,
    CLIENT_INFO_HEADER,
};

/// Body of a function invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InvokeBody {
    Json(JsonValue),
    Text(String),
    Bytes(Vec<u8>),
    #[default]
    None,
}

/// Options for [`FunctionsClient::invoke`].
///
/// ```
/// use tealbase::InvokeOptions;
/// use serde_json::json;
///
/// let opts = InvokeOptions::new()
///     .body(json!({"name": "World"}))
///     .header("x-custom", "value");
/// # let _ = opts;
/// ```
#[derive(Debug, Clone)]
pub struct InvokeOptions {
    pub(crate) body: InvokeBody,
    pub(crate) method: Method,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) region: Option<String>,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl InvokeOptions {
    /// POST with no body.
    pub fn new() -> Self {
        Self {
            body: InvokeBody::None,
            method: Method::POST,
            headers: HashMap::new(),
            region: None,
        }
    }

    pub fn body(mut self, value: JsonValue) -> Self {
        self.body = InvokeBody::Json(value);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = InvokeBody::Text(text.into());
        self
    }

    pub fn bytes(mut self, bytes: Vec<u8>) -> Self {
        self.body = InvokeBody::Bytes(bytes);
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Per-call header; overrides the client headers.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sent as `x-region`.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// Client for the functions endpoint (`/functions/v1`).
#[derive(Clone)]
pub struct FunctionsClient {
    url: Url,
    resolver: Arc<HeaderResolver>,
    http: reqwest::Client,
}

impl fmt::Debug for FunctionsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionsClient")
            .field("url", &self.url.as_str())
            .finish()
    }
}

impl FunctionsClient {
    pub(crate) fn new(url: Url, resolver: Arc<HeaderResolver>, http: reqwest::Client) -> Self {
        Self {
            url,
            resolver,
            http,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Invoke the function `name`.
    ///
    /// The reply lands in `data` as a single value: parsed JSON for JSON
    /// replies, a string otherwise. Empty replies carry no data. Relay and
    /// HTTP errors are reported in `error` with the reply status.
    pub async fn invoke(&self, name: &str, options: InvokeOptions) -> TealbaseResponse<JsonValue> {
        let request = match self.build_request(name, options).await {
            Ok(r) => r,
            Err(e) => return TealbaseResponse::error(e),
        };
        debug!(function = name, method = %request.method(), "Invoking function");

        let response = match self.http.execute(request).await {
            Ok(r) => r,
            Err(e) => return TealbaseResponse::error(e.into()),
        };

        let status = response.status().as_u16();
        let relay_error = response
            .headers()
            .get("x-relay-error")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "true")
            .unwrap_or(false);
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/json"))
            .unwrap_or(false);
        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return TealbaseResponse::error(e.into()),
        };

        if relay_error || status >= 400 {
            let message = error_message(&body);
            debug!(function = name, status, relay_error, message = %message, "Function failed");
            return TealbaseResponse::error(TealbaseError::Functions(message))
                .with_status(StatusCode::from_u16(status));
        }

        let data = if body.is_empty() {
            Vec::new()
        } else if is_json {
            match serde_json::from_slice(&body) {
                Ok(value) => vec![value],
                Err(e) => return TealbaseResponse::error(e.into()),
            }
        } else {
            vec![JsonValue::String(String::from_utf8_lossy(&body).into_owned())]
        };
        TealbaseResponse::ok(data).with_status(StatusCode::from_u16(status))
    }

    pub(crate) async fn build_request(
        &self,
        name: &str,
        options: InvokeOptions,
    ) -> TealbaseResult<reqwest::Request> {
        let url = endpoint_url(&self.url, &[name])?;
        let mut headers = self.resolver.resolve().await?;

        let (content_type, body) = match options.body {
            InvokeBody::Json(value) => {
                (Some("application/json"), Some(serde_json::to_vec(&value)?))
            }
            InvokeBody::Text(text) => (Some("text/plain"), Some(text.into_bytes())),
            InvokeBody::Bytes(bytes) => (Some("application/octet-stream"), Some(bytes)),
            InvokeBody::None => (None, None),
        };
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        if let Some(region) = &options.region {
            let value = HeaderValue::from_str(region)
                .map_err(|e| TealbaseError::config(format!("Invalid region: {e}")))?;
            headers.insert(HeaderName::from_static("x-region"), value);
        }
        for (key, value) in &options.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                TealbaseError::config(format!("Invalid header name '{key}': {e}"))
            })?;
            if name.as_str() == CLIENT_INFO_HEADER {
                debug!(header = %key, "Ignoring custom client-identification header");
                continue;
            }
            let value = HeaderValue::from_str(value).map_err(|e| {
                TealbaseError::config(format!("Invalid header value for '{key}': {e}"))
            })?;
            headers.insert(name, value);
        }

        let mut request = self.http.request(options.method, url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }
        Ok(request.build()?)
    }
}

/// Error message from a reply body: a JSON `message`/`error`/`msg` field, or the raw text.
fn error_message(body: &[u8]) -> String {
    if let Ok(JsonValue::Object(map)) = serde_json::from_slice::<JsonValue>(body) {
        for key in ["message", "error", "msg"] {
            if let Some(JsonValue::String(message)) = map.get(key) {
                return message.clone();
            }
        }
    }
    String::from_utf8_lossy(body).into_owned()
}

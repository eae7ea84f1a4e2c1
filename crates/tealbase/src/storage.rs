use std::fmt;
use std::sync::Arc;

use reqwest::header::HeaderMap;
use url::Url;

use tealbase_core::endpoints::endpoint_url;
use tealbase_core::{HeaderResolver, TealbaseResult};

use crate::options::StorageOptions;

/// Handle on the storage endpoint (`/storage/v1`).
///
/// Resolves request headers and object URLs; object transfer is left to
/// whichever storage collaborator consumes them.
#[derive(Clone)]
pub struct StorageClient {
    url: Url,
    resolver: Arc<HeaderResolver>,
    options: StorageOptions,
}

impl fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageClient")
            .field("url", &self.url.as_str())
            .field("options", &self.options)
            .finish()
    }
}

impl StorageClient {
    pub(crate) fn new(url: Url, resolver: Arc<HeaderResolver>, options: StorageOptions) -> Self {
        Self {
            url,
            resolver,
            options,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn options(&self) -> &StorageOptions {
        &self.options
    }

    /// Headers for the next storage request.
    pub async fn headers(&self) -> TealbaseResult<HeaderMap> {
        self.resolver.resolve().await
    }

    /// `{storage}/object/{bucket}/{path}`.
    pub fn object_url(&self, bucket: &str, path: &str) -> TealbaseResult<Url> {
        self.url_under(&["object", bucket], path)
    }

    /// `{storage}/object/public/{bucket}/{path}`.
    pub fn public_url(&self, bucket: &str, path: &str) -> TealbaseResult<Url> {
        self.url_under(&["object", "public", bucket], path)
    }

    fn url_under(&self, prefix: &[&str], path: &str) -> TealbaseResult<Url> {
        let segments: Vec<&str> = prefix
            .iter()
            .copied()
            .chain(path.split('/').filter(|s| !s.is_empty()))
            .collect();
        endpoint_url(&self.url, &segments)
    }
}

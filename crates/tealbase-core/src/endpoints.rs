//! Derivation of the subsystem endpoints from the project base URL.

use url::Url;

use crate::error::{TealbaseError, TealbaseResult};

/// The five subsystem endpoints of a tealbase project.
///
/// Computed once from the base URL; any path prefix on the base is preserved,
/// e.g. `http://host/custom/base` yields `http://host/custom/base/rest/v1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
    rest: Url,
    realtime: Url,
    auth: Url,
    storage: Url,
    functions: Url,
}

impl Endpoints {
    /// Derive every endpoint from `base_url`.
    ///
    /// Both `base_url` and `api_key` are required; the key is only checked
    /// for presence here.
    pub fn derive(base_url: &str, api_key: &str) -> TealbaseResult<Self> {
        if base_url.trim().is_empty() {
            return Err(TealbaseError::config("tealbaseUrl is required."));
        }
        if api_key.trim().is_empty() {
            return Err(TealbaseError::config("tealbaseKey is required."));
        }

        let mut base = Url::parse(base_url.trim())?;
        let ws_scheme = match base.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => {
                return Err(TealbaseError::config(format!(
                    "Unsupported URL scheme: {other}"
                )));
            }
        };
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut realtime = base.join("realtime/v1")?;
        realtime
            .set_scheme(ws_scheme)
            .map_err(|_| TealbaseError::config("Failed to set realtime URL scheme"))?;

        Ok(Self {
            rest: base.join("rest/v1")?,
            auth: base.join("auth/v1")?,
            storage: base.join("storage/v1")?,
            functions: base.join("functions/v1")?,
            realtime,
            base,
        })
    }

    /// The base URL, always ending in `/`.
    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn rest(&self) -> &Url {
        &self.rest
    }

    pub fn realtime(&self) -> &Url {
        &self.realtime
    }

    pub fn auth(&self) -> &Url {
        &self.auth
    }

    pub fn storage(&self) -> &Url {
        &self.storage
    }

    pub fn functions(&self) -> &Url {
        &self.functions
    }

    /// The socket endpoint a realtime transport connects to (`{realtime}/websocket`).
    pub fn realtime_websocket(&self) -> Url {
        let mut url = self.realtime.clone();
        let path = format!("{}/websocket", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url
    }

    /// The project reference: the first label of the host name.
    pub fn project_ref(&self) -> &str {
        self.base
            .host_str()
            .and_then(|host| host.split('.').next())
            .unwrap_or_default()
    }

    /// Storage key used by the auth collaborator when none is configured.
    pub fn default_storage_key(&self) -> String {
        format!("sb-{}-auth-token", self.project_ref())
    }
}

/// Append path `segments` to `base`, percent-encoding each one.
pub fn endpoint_url(base: &Url, segments: &[&str]) -> TealbaseResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| TealbaseError::config(format!("URL cannot be a base: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "some.fake.key";

    #[test]
    fn derive_plain_base() {
        let ep = Endpoints::derive("http://localhost:3000", KEY).unwrap();
        assert_eq!(ep.rest().as_str(), "http://localhost:3000/rest/v1");
        assert_eq!(ep.realtime().as_str(), "ws://localhost:3000/realtime/v1");
        assert_eq!(ep.auth().as_str(), "http://localhost:3000/auth/v1");
        assert_eq!(ep.storage().as_str(), "http://localhost:3000/storage/v1");
        assert_eq!(ep.functions().as_str(), "http://localhost:3000/functions/v1");
    }

    #[test]
    fn derive_preserves_path_prefix() {
        let ep = Endpoints::derive("http://localhost:3000/custom/base", KEY).unwrap();
        assert_eq!(ep.rest().as_str(), "http://localhost:3000/custom/base/rest/v1");
        assert_eq!(
            ep.realtime().as_str(),
            "ws://localhost:3000/custom/base/realtime/v1"
        );
        assert_eq!(ep.auth().as_str(), "http://localhost:3000/custom/base/auth/v1");
        assert_eq!(
            ep.storage().as_str(),
            "http://localhost:3000/custom/base/storage/v1"
        );
        assert_eq!(
            ep.functions().as_str(),
            "http://localhost:3000/custom/base/functions/v1"
        );
    }

    #[test]
    fn derive_trailing_slash_is_not_doubled() {
        let ep = Endpoints::derive("http://localhost:3000/custom/base/", KEY).unwrap();
        assert_eq!(ep.rest().as_str(), "http://localhost:3000/custom/base/rest/v1");
    }

    #[test]
    fn derive_https_maps_to_wss() {
        let ep = Endpoints::derive("https://localhost:3000", KEY).unwrap();
        assert_eq!(ep.realtime().as_str(), "wss://localhost:3000/realtime/v1");
        assert_eq!(ep.rest().as_str(), "https://localhost:3000/rest/v1");
    }

    #[test]
    fn realtime_websocket_endpoint() {
        let ep = Endpoints::derive("http://localhost:3000", KEY).unwrap();
        assert_eq!(
            ep.realtime_websocket().as_str(),
            "ws://localhost:3000/realtime/v1/websocket"
        );
    }

    #[test]
    fn empty_url_is_rejected() {
        let err = Endpoints::derive("", KEY).unwrap_err();
        assert_eq!(err, TealbaseError::config("tealbaseUrl is required."));
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = Endpoints::derive("http://localhost:3000", "").unwrap_err();
        assert_eq!(err, TealbaseError::config("tealbaseKey is required."));
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        assert!(matches!(
            Endpoints::derive("ftp://localhost", KEY),
            Err(TealbaseError::Config(_))
        ));
    }

    #[test]
    fn default_storage_key_uses_project_ref() {
        let ep = Endpoints::derive("https://project-ref.tealbase.co", KEY).unwrap();
        assert_eq!(ep.project_ref(), "project-ref");
        assert_eq!(ep.default_storage_key(), "sb-project-ref-auth-token");
    }

    #[test]
    fn endpoint_url_appends_segments() {
        let ep = Endpoints::derive("http://localhost:3000/custom", KEY).unwrap();
        assert_eq!(
            endpoint_url(ep.rest(), &["users"]).unwrap().as_str(),
            "http://localhost:3000/custom/rest/v1/users"
        );
        assert_eq!(
            endpoint_url(ep.rest(), &["rpc", "add one"]).unwrap().as_str(),
            "http://localhost:3000/custom/rest/v1/rpc/add%20one"
        );
    }
}

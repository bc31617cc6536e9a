//! HTTP transport options for provider requests

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Requests may stream for a long time; two hours
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(7200);

/// PEM client certificate and its private key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCertificate {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Transport options applied to every provider request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub verify_ssl: bool,
    /// Extra PEM bundles to trust
    pub ca_bundle_path: Vec<PathBuf>,
    pub proxy: Option<String>,
    /// Hosts that bypass the proxy
    pub no_proxy: Vec<String>,
    pub headers: BTreeMap<String, String>,
    /// Merged into the JSON body last
    pub extra_body_properties: Map<String, Value>,
    pub client_certificate: Option<ClientCertificate>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            verify_ssl: true,
            ca_bundle_path: Vec::new(),
            proxy: None,
            no_proxy: Vec::new(),
            headers: BTreeMap::new(),
            extra_body_properties: Map::new(),
            client_certificate: None,
        }
    }
}

impl RequestOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = RequestOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(7200));
        assert!(options.verify_ssl);
        assert!(options.proxy.is_none());
    }

    #[test]
    fn humantime_timeout() {
        let options: RequestOptions =
            serde_json::from_str(r#"{"timeout": "90s", "no_proxy": ["localhost"]}"#).unwrap();
        assert_eq!(options.timeout, Duration::from_secs(90));
        assert_eq!(options.no_proxy, vec!["localhost"]);
        assert!(options.verify_ssl);
    }
}

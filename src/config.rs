// Copyright 2016 LambdaStack All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Immutable client configuration, validated once at construction time
//! rather than on every request.

use crate::credentials::{Credentials, CredentialsProvider};
use crate::error::{Error, Result};

const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Endpoint, credentials and transport settings for a [`crate::client::Client`].
/// Read-only after construction: concurrent requests share one `ClientConfig`.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub(crate) endpoint: String,
    pub(crate) port: u16,
    pub(crate) tls: bool,
    pub(crate) credentials: Credentials,
    pub(crate) user_agent: String,
}

impl ClientConfig {
    pub fn builder(endpoint: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(endpoint)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn tls(&self) -> bool {
        self.tls
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// `anonymous` ≡ access key empty OR secret key empty.
    pub fn is_anonymous(&self) -> bool {
        self.credentials.is_anonymous()
    }

    /// The protocol default port (80/443) unless `port` overrides it.
    pub fn effective_port(&self) -> u16 {
        if self.port != 0 {
            self.port
        } else if self.tls {
            443
        } else {
            80
        }
    }

    pub fn scheme(&self) -> &'static str {
        if self.tls { "https" } else { "http" }
    }
}

/// Builds a [`ClientConfig`], validating host/port legality before the
/// client is ever used.
pub struct ClientConfigBuilder {
    endpoint: String,
    port: u32,
    tls: bool,
    credentials: Credentials,
    app_suffix: Option<String>,
}

impl ClientConfigBuilder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        ClientConfigBuilder {
            endpoint: endpoint.into(),
            port: 0,
            tls: true,
            credentials: Credentials::default(),
            app_suffix: None,
        }
    }

    pub fn port(mut self, port: u32) -> Self {
        self.port = port;
        self
    }

    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    pub fn credentials(mut self, access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.credentials = Credentials::new(access_key, secret_key);
        self
    }

    pub fn credentials_from(mut self, provider: &dyn CredentialsProvider) -> Result<Self> {
        self.credentials = provider.credentials()?;
        Ok(self)
    }

    /// Appended to the default `Minio (os; arch) minio-js/version` style
    /// User-Agent, e.g. `"myapp/1.0.0"`.
    pub fn app_info(mut self, app_name: &str, app_version: &str) -> Self {
        self.app_suffix = Some(format!(" {}/{}", app_name, app_version));
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::InvalidEndpoint("endpoint must not be empty".into()));
        }
        if self.endpoint.contains("://") {
            return Err(Error::InvalidEndpoint(format!(
                "endpoint must be a bare host, not a URL: {}",
                self.endpoint
            )));
        }
        let parsed = url::Url::parse(&format!("https://{}/", self.endpoint))
            .map_err(|e| Error::InvalidEndpoint(format!("{} is not a legal host: {}", self.endpoint, e)))?;
        if parsed.path() != "/" || parsed.query().is_some() || parsed.host_str().is_none() {
            return Err(Error::InvalidEndpoint(format!("endpoint must be a bare host: {}", self.endpoint)));
        }
        if self.port > 65535 {
            return Err(Error::InvalidPort(self.port));
        }

        let user_agent = format!(
            "Minio ({}; {}) minio-rs/{}{}",
            std::env::consts::OS,
            std::env::consts::ARCH,
            CRATE_VERSION,
            self.app_suffix.unwrap_or_default(),
        );

        Ok(ClientConfig {
            endpoint: self.endpoint,
            port: self.port as u16,
            tls: self.tls,
            credentials: self.credentials,
            user_agent,
        })
    }
}

/// True when `endpoint` is a stock Amazon S3 host, which is what decides
/// virtual-host vs. path-style addressing.
pub fn is_amazon_endpoint(endpoint: &str) -> bool {
    endpoint.ends_with("amazonaws.com")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_endpoint() {
        let err = ClientConfig::builder("").build().unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint(_)));
    }

    #[test]
    fn rejects_url_as_endpoint() {
        let err = ClientConfig::builder("https://s3.amazonaws.com").build().unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint(_)));
    }

    #[test]
    fn rejects_host_with_illegal_characters() {
        let err = ClientConfig::builder("play min.io").build().unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint(_)));
    }

    #[test]
    fn rejects_out_of_range_port() {
        let err = ClientConfig::builder("localhost").port(70000).build().unwrap_err();
        assert!(matches!(err, Error::InvalidPort(70000)));
    }

    #[test]
    fn anonymous_when_keys_missing() {
        let cfg = ClientConfig::builder("s3.amazonaws.com").build().unwrap();
        assert!(cfg.is_anonymous());
    }

    #[test]
    fn effective_port_defaults_by_scheme() {
        let https = ClientConfig::builder("s3.amazonaws.com").build().unwrap();
        assert_eq!(https.effective_port(), 443);
        let http = ClientConfig::builder("s3.amazonaws.com").tls(false).build().unwrap();
        assert_eq!(http.effective_port(), 80);
        let custom = ClientConfig::builder("localhost").port(9000).build().unwrap();
        assert_eq!(custom.effective_port(), 9000);
    }

    #[test]
    fn detects_amazon_endpoint() {
        assert!(is_amazon_endpoint("s3.amazonaws.com"));
        assert!(is_amazon_endpoint("s3.us-west-2.amazonaws.com"));
        assert!(!is_amazon_endpoint("play.min.io"));
    }
}

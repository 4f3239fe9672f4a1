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

//! Request Builder: turns a [`RequestSpec`] plus
//! [`ClientConfig`] into a concrete host/path/headers triple, picking
//! virtual-host vs. path-style addressing.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::{ClientConfig, is_amazon_endpoint};
use crate::encode::{encode_uri, encode_uri_object_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(method, bucket?, object?, query?, headers?)`.
/// Headers are lower-cased on insertion since SigV4 canonicalization
/// requires stable casing.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub bucket: Option<String>,
    pub object: Option<String>,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
}

impl RequestSpec {
    pub fn new(method: Method) -> Self {
        RequestSpec {
            method,
            bucket: None,
            object: None,
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
        }
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(key.as_ref().to_ascii_lowercase(), value.into());
        self
    }
}

/// The concrete host/path/headers this [`RequestSpec`] translates to for a
/// given region's endpoint; handed to the [`crate::signature::Signer`] and
/// then to the transport.
#[derive(Debug, Clone)]
pub struct BuiltRequest {
    pub method: Method,
    pub host: String,
    /// Path with bucket/object segments escaped, query string appended.
    pub path: String,
    /// Canonical (unescaped-key, escaped-per-SigV4) query string, without a
    /// leading `?`, used both for the request URL and for signing.
    pub canonical_query: String,
    pub headers: BTreeMap<String, String>,
}

impl BuiltRequest {
    pub fn url(&self, scheme: &str, port: u16) -> String {
        let port_str = if (scheme == "https" && port == 443) || (scheme == "http" && port == 80) || port == 0 {
            String::new()
        } else {
            format!(":{}", port)
        };
        let mut url = format!("{}://{}{}{}", scheme, self.host, port_str, self.path);
        if !self.canonical_query.is_empty() {
            url.push('?');
            url.push_str(&self.canonical_query);
        }
        url
    }
}

/// Builds a [`BuiltRequest`] from `spec` against `config`'s endpoint, using
/// `region` only to decide the `Host` header value is not region-qualified
/// here — callers that need a region-specific endpoint pass a
/// region-derived `config`. Virtual-host addressing is used whenever the
/// endpoint is a stock Amazon host and a bucket is present; otherwise
/// path-style.
pub fn build(spec: &RequestSpec, config: &ClientConfig) -> BuiltRequest {
    let virtual_host = is_amazon_endpoint(&config.endpoint) && spec.bucket.is_some();
    build_with_style(spec, config, virtual_host)
}

/// Forces path-style addressing regardless of the endpoint, used by region
/// resolution's `GET /{bucket}?location` call.
pub fn build_path_style(spec: &RequestSpec, config: &ClientConfig) -> BuiltRequest {
    build_with_style(spec, config, false)
}

fn build_with_style(spec: &RequestSpec, config: &ClientConfig, virtual_host: bool) -> BuiltRequest {
    let escaped_object = spec
        .object
        .as_deref()
        .map(encode_uri_object_key)
        .unwrap_or_default();

    let (host, path) = if virtual_host {
        let bucket = spec.bucket.as_deref().unwrap();
        let host = format!("{}.{}", bucket, config.endpoint);
        let path = if escaped_object.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", escaped_object)
        };
        (host, path)
    } else {
        let mut path = String::new();
        if let Some(bucket) = &spec.bucket {
            path.push('/');
            path.push_str(bucket);
        }
        if !escaped_object.is_empty() {
            path.push('/');
            path.push_str(&escaped_object);
        }
        if path.is_empty() {
            path.push('/');
        }
        (config.endpoint.clone(), path)
    };

    let canonical_query = build_canonical_query_string(&spec.query);

    let mut headers = spec.headers.clone();
    let port = config.effective_port();
    let default_port = (config.tls() && port == 443) || (!config.tls() && port == 80);
    let host_header = if default_port {
        host.clone()
    } else {
        format!("{}:{}", host, port)
    };
    headers.insert("host".to_string(), host_header);

    BuiltRequest {
        method: spec.method,
        host,
        path,
        canonical_query,
        headers,
    }
}

/// Query values are fully percent-encoded and joined in key-sorted order
///; `BTreeMap` already yields sorted iteration.
pub fn build_canonical_query_string(query: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (k, v) in query {
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str(&encode_uri(k));
        out.push('=');
        out.push_str(&encode_uri(v));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(endpoint: &str) -> ClientConfig {
        ClientConfig::builder(endpoint).build().unwrap()
    }

    #[test]
    fn virtual_host_style_on_amazon_endpoint() {
        let spec = RequestSpec::new(Method::Get).bucket("mybucket").object("a/b.txt");
        let built = build(&spec, &cfg("s3.amazonaws.com"));
        assert_eq!(built.host, "mybucket.s3.amazonaws.com");
        assert_eq!(built.path, "/a/b.txt");
    }

    #[test]
    fn path_style_on_third_party_endpoint() {
        let spec = RequestSpec::new(Method::Get).bucket("mybucket").object("a/b.txt");
        let built = build(&spec, &cfg("play.min.io"));
        assert_eq!(built.host, "play.min.io");
        assert_eq!(built.path, "/mybucket/a/b.txt");
    }

    #[test]
    fn path_style_bucket_only() {
        let spec = RequestSpec::new(Method::Put).bucket("mybucket");
        let built = build(&spec, &cfg("play.min.io"));
        assert_eq!(built.path, "/mybucket");
    }

    #[test]
    fn no_bucket_no_object_is_root() {
        let spec = RequestSpec::new(Method::Get);
        let built = build(&spec, &cfg("play.min.io"));
        assert_eq!(built.path, "/");
    }

    #[test]
    fn host_header_omits_default_port() {
        let spec = RequestSpec::new(Method::Get).bucket("b");
        let built = build(&spec, &cfg("s3.amazonaws.com"));
        assert_eq!(built.headers.get("host").unwrap(), "b.s3.amazonaws.com");
    }

    #[test]
    fn host_header_includes_nonstandard_port() {
        let cfg = ClientConfig::builder("localhost").tls(false).port(9000).build().unwrap();
        let spec = RequestSpec::new(Method::Get).bucket("b");
        let built = build(&spec, &cfg);
        assert_eq!(built.headers.get("host").unwrap(), "localhost:9000");
    }

    #[test]
    fn build_path_style_ignores_amazon_endpoint() {
        let spec = RequestSpec::new(Method::Get).bucket("mybucket").query("location", "");
        let built = build_path_style(&spec, &cfg("s3.amazonaws.com"));
        assert_eq!(built.host, "s3.amazonaws.com");
        assert_eq!(built.path, "/mybucket");
    }

    #[test]
    fn query_string_is_sorted_and_escaped() {
        let spec = RequestSpec::new(Method::Get)
            .bucket("b")
            .query("prefix", "a b")
            .query("max-keys", "10");
        let built = build(&spec, &cfg("play.min.io"));
        assert_eq!(built.canonical_query, "max-keys=10&prefix=a%20b");
    }
}

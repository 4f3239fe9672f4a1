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

//! Request Executor. Bodies stream both ways: [`execute`] hands back the raw
//! `reqwest::blocking::Response`, leaving buffering to callers that need it
//! (small metadata calls) rather than those that don't (object bodies).

use std::collections::BTreeMap;

use bytes::Bytes;
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::ClientConfig;
use crate::decode;
use crate::error::{Error, Result};
use crate::region::{RegionCache, DEFAULT_REGION};
use crate::request::{self, BuiltRequest, Method, RequestSpec};
use crate::signature::{self, EMPTY_PAYLOAD_SHA256};
use crate::trace::{trace_error, trace_request, trace_response, TraceSink};

/// A request dispatched and confirmed to have the caller's expected status.
/// `response` is still unread; streaming GETs read straight from it, small
/// calls use [`ExecutedResponse::into_bytes`].
pub struct ExecutedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub response: Response,
}

impl ExecutedResponse {
    /// Buffers the remainder of the body. `bytes::Bytes` is a refcounted
    /// view rather than an owned copy, so handing the same buffer to a
    /// decoder and a trace sink doesn't double the allocation.
    pub fn into_bytes(self) -> Result<Bytes> {
        Ok(self.response.bytes()?)
    }
}

/// Owns the executor's collaborators: the
/// transport, the region cache, and (optionally) a trace sink. One instance
/// is held per [`crate::client::Client`].
pub struct RequestExecutor<'a> {
    config: &'a ClientConfig,
    region_cache: &'a RegionCache,
    http: &'a HttpClient,
    trace: Option<&'a dyn TraceSink>,
}

impl<'a> RequestExecutor<'a> {
    pub fn new(
        config: &'a ClientConfig,
        region_cache: &'a RegionCache,
        http: &'a HttpClient,
        trace: Option<&'a dyn TraceSink>,
    ) -> Self {
        RequestExecutor {
            config,
            region_cache,
            http,
            trace,
        }
    }

    /// Looks up `bucket`'s region, issuing `GET ?location` on a cache miss
    ///. Anonymous clients and requests
    /// with no bucket skip the lookup and use [`DEFAULT_REGION`].
    pub fn resolve_region(&self, bucket: Option<&str>) -> Result<String> {
        let bucket = match bucket {
            Some(b) => b,
            None => return Ok(DEFAULT_REGION.to_string()),
        };
        if let Some(region) = self.region_cache.get(bucket) {
            return Ok(region);
        }
        if self.config.is_anonymous() {
            return Ok(DEFAULT_REGION.to_string());
        }

        let spec = RequestSpec::new(Method::Get).bucket(bucket).query("location", "");
        let mut built = request::build_path_style(&spec, self.config);
        signature::sign_request(
            &mut built,
            self.config.credentials(),
            DEFAULT_REGION,
            EMPTY_PAYLOAD_SHA256,
            chrono::Utc::now(),
        );
        let executed = self.send(built, None)?;
        let status = executed.status;
        if status != 200 {
            let body = executed.into_bytes()?;
            return Err(decode::decode_error(status, &body));
        }
        let body = executed.into_bytes()?;
        let region = decode::decode_location_constraint(&body);
        self.region_cache.insert(bucket, &region);
        Ok(region)
    }

    /// Resolves region, signs (unless anonymous), sends, and evicts the
    /// region cache entry on any status other than `expected_status` before
    /// surfacing the decoded `<Error>` document.
    pub fn execute(
        &self,
        spec: RequestSpec,
        body: Option<Vec<u8>>,
        payload_sha256: &str,
        expected_status: u16,
    ) -> Result<ExecutedResponse> {
        let region = self.resolve_region(spec.bucket.as_deref())?;
        let mut built = request::build(&spec, self.config);
        if !self.config.is_anonymous() {
            signature::sign_request(&mut built, self.config.credentials(), &region, payload_sha256, chrono::Utc::now());
        }

        let executed = self.send(built, body)?;
        if executed.status != expected_status {
            if let Some(bucket) = &spec.bucket {
                self.region_cache.evict(bucket);
            }
            let status = executed.status;
            let raw = executed.into_bytes()?;
            return Err(decode::decode_error(status, &raw));
        }
        Ok(executed)
    }

    pub fn execute_buffered(
        &self,
        spec: RequestSpec,
        body: Option<Vec<u8>>,
        payload_sha256: &str,
        expected_status: u16,
    ) -> Result<(Vec<(String, String)>, Bytes)> {
        let executed = self.execute(spec, body, payload_sha256, expected_status)?;
        let headers = executed.headers.clone();
        Ok((headers, executed.into_bytes()?))
    }

    fn send(&self, built: BuiltRequest, body: Option<Vec<u8>>) -> Result<ExecutedResponse> {
        if let Some(sink) = self.trace {
            trace_request(sink, &built);
        }

        let url = built.url(self.config.scheme(), self.config.effective_port());
        let mut header_map = HeaderMap::new();
        for (key, value) in headers_without_host(&built.headers) {
            if let (Ok(name), Ok(val)) = (HeaderName::from_bytes(key.as_bytes()), HeaderValue::from_str(&value)) {
                header_map.insert(name, val);
            }
        }
        header_map.insert(
            reqwest::header::USER_AGENT,
            HeaderValue::from_str(self.config.user_agent()).unwrap_or_else(|_| HeaderValue::from_static("s3-core")),
        );

        let mut request = self.http.request(reqwest_method(built.method), &url).headers(header_map);
        if let Some(bytes) = body {
            request = request.body(bytes);
        }

        let result = request.send();
        let response = match result {
            Ok(r) => r,
            Err(e) => {
                let err = Error::NetworkError(e);
                if let Some(sink) = self.trace {
                    trace_error(sink, &err);
                }
                return Err(err);
            }
        };

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        if let Some(sink) = self.trace {
            trace_response(sink, status, &headers);
        }

        Ok(ExecutedResponse { status, headers, response })
    }
}

fn headers_without_host(headers: &BTreeMap<String, String>) -> impl Iterator<Item = (String, String)> + '_ {
    headers
        .iter()
        .filter(|(k, _)| k.as_str() != "host")
        .map(|(k, v)| (k.clone(), v.clone()))
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Put => reqwest::Method::PUT,
        Method::Post => reqwest::Method::POST,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_header_is_excluded_from_forwarded_headers() {
        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), "example.com".to_string());
        headers.insert("x-amz-date".to_string(), "20230101T000000Z".to_string());
        let forwarded: Vec<_> = headers_without_host(&headers).collect();
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].0, "x-amz-date");
    }

    #[test]
    fn reqwest_method_maps_every_variant() {
        assert_eq!(reqwest_method(Method::Get), reqwest::Method::GET);
        assert_eq!(reqwest_method(Method::Put), reqwest::Method::PUT);
        assert_eq!(reqwest_method(Method::Post), reqwest::Method::POST);
        assert_eq!(reqwest_method(Method::Delete), reqwest::Method::DELETE);
        assert_eq!(reqwest_method(Method::Head), reqwest::Method::HEAD);
    }
}

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

//! Optional request/response tracing. Off by
//! default; a [`crate::client::Client`] with no sink installed never pays
//! for formatting a trace line.

use crate::error::Error;
use crate::request::BuiltRequest;

/// Destination for trace lines. Implement this to forward traces to a log
/// file, a test harness buffer, or anywhere else a `String` can land.
pub trait TraceSink: Send + Sync {
    fn write_line(&self, line: &str);
}

/// Writes `REQUEST {METHOD} {PATH}`, the request headers with
/// `Authorization`'s `Signature=...` redacted, then (after the response is
/// known) `RESPONSE {status}` and its headers.
pub fn trace_request(sink: &dyn TraceSink, built: &BuiltRequest) {
    sink.write_line(&format!("REQUEST {} {}", built.method, built.path));
    for (key, value) in &built.headers {
        sink.write_line(&format!("{}: {}", key, redact_authorization(key, value)));
    }
}

pub fn trace_response(sink: &dyn TraceSink, status: u16, headers: &[(String, String)]) {
    sink.write_line(&format!("RESPONSE {}", status));
    for (key, value) in headers {
        sink.write_line(&format!("{}: {}", key, value));
    }
}

/// On error, a JSON dump of the error rather than the human `Display` form,
/// so traces stay machine-parseable.
pub fn trace_error(sink: &dyn TraceSink, err: &Error) {
    let json = match err {
        Error::ServerError { status, body } => format!(
            "{{\"kind\":\"ServerError\",\"status\":{},\"code\":{:?},\"message\":{:?},\"resource\":{:?},\"requestId\":{:?}}}",
            status, body.code, body.message, body.resource, body.request_id
        ),
        other => format!("{{\"kind\":\"{:?}\",\"message\":{:?}}}", std::mem::discriminant(other), other.to_string()),
    };
    sink.write_line(&json);
}

fn redact_authorization(key: &str, value: &str) -> String {
    if key.eq_ignore_ascii_case("authorization") {
        if let Some(idx) = value.find("Signature=") {
            let mut redacted = value[..idx].to_string();
            redacted.push_str("Signature=**REDACTED**");
            return redacted;
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct BufferSink(Mutex<Vec<String>>);

    impl TraceSink for BufferSink {
        fn write_line(&self, line: &str) {
            self.0.lock().unwrap().push(line.to_string());
        }
    }

    #[test]
    fn redacts_signature_only() {
        let value = "AWS4-HMAC-SHA256 Credential=AKIA/scope, SignedHeaders=host, Signature=deadbeef";
        let redacted = redact_authorization("authorization", value);
        assert!(redacted.ends_with("Signature=**REDACTED**"));
        assert!(redacted.contains("Credential=AKIA/scope"));
    }

    #[test]
    fn non_authorization_headers_pass_through() {
        assert_eq!(redact_authorization("host", "example.com"), "example.com");
    }

    #[test]
    fn trace_request_emits_method_and_path_line() {
        let sink = BufferSink::default();
        let built = BuiltRequest {
            method: crate::request::Method::Get,
            host: "example.com".to_string(),
            path: "/bucket/key".to_string(),
            canonical_query: String::new(),
            headers: Default::default(),
        };
        trace_request(&sink, &built);
        let lines = sink.0.lock().unwrap();
        assert_eq!(lines[0], "REQUEST GET /bucket/key");
    }
}

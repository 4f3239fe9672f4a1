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

//! AWS Signature Version 4: request signing, presigned
//! URLs, and the POST-policy signature. All three share the same HMAC key
//! derivation chain.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::credentials::Credentials;
use crate::request::BuiltRequest;

type HmacSha256 = Hmac<Sha256>;

/// SHA256 of an empty payload, used when no body is sent.
pub const EMPTY_PAYLOAD_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// `YYYYMMDDTHHMMSSZ`, the Amz-Date header/query format.
pub fn amz_date(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

fn date_stamp(amz_date: &str) -> &str {
    &amz_date[0..8]
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// `kSecret -> kDate -> kRegion -> kService -> kSigning`.
fn signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

pub fn credential_scope(date_stamp: &str, region: &str) -> String {
    format!("{}/{}/s3/aws4_request", date_stamp, region)
}

/// Sorted, lower-cased `key:value\n` block plus the `;`-joined signed
/// header list. Header values are trimmed of surrounding whitespace; the
/// crate never emits multi-valued headers so no comma-joining is needed.
fn canonical_headers(headers: &BTreeMap<String, String>) -> (String, String) {
    let mut block = String::new();
    let mut signed = String::new();
    for (k, v) in headers {
        block.push_str(k);
        block.push(':');
        block.push_str(v.trim());
        block.push('\n');
        if !signed.is_empty() {
            signed.push(';');
        }
        signed.push_str(k);
    }
    (block, signed)
}

fn canonical_request(built: &BuiltRequest, signed_headers_block: &str, signed_headers: &str, payload_sha256: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        built.method.as_str(),
        built.path,
        built.canonical_query,
        signed_headers_block,
        signed_headers,
        payload_sha256,
    )
}

fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        scope,
        sha256_hex(canonical_request.as_bytes())
    )
}

/// Stamps `x-amz-date`, `x-amz-content-sha256` and `authorization` onto
/// `built` in place. Not called for anonymous requests.
pub fn sign_request(
    built: &mut BuiltRequest,
    creds: &Credentials,
    region: &str,
    payload_sha256: &str,
    now: DateTime<Utc>,
) {
    let date = amz_date(now);
    built.headers.insert("x-amz-date".to_string(), date.clone());
    built
        .headers
        .insert("x-amz-content-sha256".to_string(), payload_sha256.to_string());

    let (headers_block, signed_headers) = canonical_headers(&built.headers);
    let canon_req = canonical_request(built, &headers_block, &signed_headers, payload_sha256);
    let scope = credential_scope(date_stamp(&date), region);
    let sts = string_to_sign(&date, &scope, &canon_req);
    let key = signing_key(&creds.secret_key, date_stamp(&date), region, "s3");
    let signature = hex::encode(hmac_sha256(&key, sts.as_bytes()));

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
        creds.access_key, scope, signed_headers, signature
    );
    built.headers.insert("authorization".to_string(), authorization);
}

/// Appends `X-Amz-*` query parameters (including the final `Signature`)
/// onto `built.canonical_query` in place, producing a presigned URL when
/// combined with `built.url(..)`.
/// `Authorization` is never set for presigned requests.
pub fn presign_url(
    built: &mut BuiltRequest,
    creds: &Credentials,
    region: &str,
    expires_secs: u32,
    now: DateTime<Utc>,
) {
    let date = amz_date(now);
    let scope = credential_scope(date_stamp(&date), region);
    let credential = format!("{}/{}", creds.access_key, scope);

    // Only Host is signed for a presigned URL; the body is never read.
    let mut signed_subset = BTreeMap::new();
    if let Some(host) = built.headers.get("host") {
        signed_subset.insert("host".to_string(), host.clone());
    }
    let (headers_block, signed_headers) = canonical_headers(&signed_subset);

    let mut query = built.canonical_query.clone();
    let mut push = |k: &str, v: &str| {
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(k);
        query.push('=');
        query.push_str(&crate::encode::encode_uri(v));
    };
    push("X-Amz-Algorithm", "AWS4-HMAC-SHA256");
    push("X-Amz-Credential", &credential);
    push("X-Amz-Date", &date);
    push("X-Amz-Expires", &expires_secs.to_string());
    push("X-Amz-SignedHeaders", &signed_headers);
    built.canonical_query = query;

    let canon_req = canonical_request(built, &headers_block, &signed_headers, "UNSIGNED-PAYLOAD");
    let sts = string_to_sign(&date, &scope, &canon_req);
    let key = signing_key(&creds.secret_key, date_stamp(&date), region, "s3");
    let signature = hex::encode(hmac_sha256(&key, sts.as_bytes()));

    built.canonical_query.push_str("&X-Amz-Signature=");
    built.canonical_query.push_str(&signature);
}

/// HMAC-SHA256 of `base64(policy)` using the signing key for
/// `(region, date, "s3")`.
pub fn post_policy_signature(secret_key: &str, date_stamp: &str, region: &str, policy_base64: &str) -> String {
    let key = signing_key(secret_key, date_stamp, region, "s3");
    hex::encode(hmac_sha256(&key, policy_base64.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Method, RequestSpec, build};
    use crate::config::ClientConfig;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 5, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn signed_request_has_well_formed_authorization_header() {
        let cfg = ClientConfig::builder("s3.amazonaws.com").build().unwrap();
        let spec = RequestSpec::new(Method::Get).bucket("bucket").object("key");
        let mut built = build(&spec, &cfg);
        let creds = Credentials::new("AKIAEXAMPLE", "secretkeyexample");
        sign_request(&mut built, &creds, "us-east-1", EMPTY_PAYLOAD_SHA256, fixed_now());

        let auth = built.headers.get("authorization").unwrap();
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIAEXAMPLE/20230520/us-east-1/s3/aws4_request, SignedHeaders="));
        let sig = auth.rsplit("Signature=").next().unwrap();
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signed_headers_are_sorted_and_lowercased() {
        let cfg = ClientConfig::builder("s3.amazonaws.com").build().unwrap();
        let spec = RequestSpec::new(Method::Put)
            .bucket("bucket")
            .object("key")
            .header("X-Amz-Acl", "private")
            .header("Content-Type", "text/plain");
        let mut built = build(&spec, &cfg);
        let creds = Credentials::new("AKIA", "secret");
        sign_request(&mut built, &creds, "us-east-1", EMPTY_PAYLOAD_SHA256, fixed_now());
        let auth = built.headers.get("authorization").unwrap();
        let signed_headers = auth.split("SignedHeaders=").nth(1).unwrap().split(',').next().unwrap();
        let parts: Vec<&str> = signed_headers.split(';').collect();
        let mut sorted = parts.clone();
        sorted.sort();
        assert_eq!(parts, sorted);
        assert!(parts.iter().all(|p| *p == p.to_ascii_lowercase()));
    }

    #[test]
    fn presign_never_sets_authorization() {
        let cfg = ClientConfig::builder("s3.amazonaws.com").build().unwrap();
        let spec = RequestSpec::new(Method::Get).bucket("bucket").object("key");
        let mut built = build(&spec, &cfg);
        let creds = Credentials::new("AKIA", "secret");
        presign_url(&mut built, &creds, "us-east-1", 3600, fixed_now());
        assert!(built.headers.get("authorization").is_none());
        assert!(built.canonical_query.contains("X-Amz-Expires=3600"));
        assert!(built.canonical_query.contains("X-Amz-Signature="));
    }

    #[test]
    fn empty_payload_hash_matches_known_constant() {
        assert_eq!(sha256_hex(b""), EMPTY_PAYLOAD_SHA256);
    }
}

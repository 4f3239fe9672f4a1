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

//! Presigned URLs and POST policy construction. Both are
//! forbidden for an anonymous client; the [`crate::client::Client`] methods
//! that call into this module raise [`Error::AnonymousRequest`] before
//! doing anything here.

use std::collections::BTreeMap;

use base64::Engine;
use chrono::{DateTime, Utc};

use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::request::{self, BuiltRequest, Method, RequestSpec};
use crate::signature::{self, amz_date, credential_scope};

/// Builds a presigned URL for `method` against `bucket`/`object`,
/// `expires_secs` becoming `X-Amz-Expires`.
pub fn presigned_url(
    config: &ClientConfig,
    creds: &Credentials,
    region: &str,
    method: Method,
    bucket: &str,
    object: &str,
    expires_secs: u32,
    now: DateTime<Utc>,
) -> String {
    let spec = RequestSpec::new(method).bucket(bucket).object(object);
    let mut built: BuiltRequest = request::build(&spec, config);
    signature::presign_url(&mut built, creds, region, expires_secs, now);
    built.url(config.scheme(), config.effective_port())
}

#[derive(Debug, Clone)]
enum Condition {
    Eq { field: String, value: String },
    StartsWith { field: String, value: String },
    ContentLengthRange { min: u64, max: u64 },
}

/// A POST policy under construction: an accumulating condition list plus
/// the `formData` map the finished form would submit.
#[derive(Debug, Clone, Default)]
pub struct PostPolicy {
    bucket: Option<String>,
    expiration: Option<DateTime<Utc>>,
    conditions: Vec<Condition>,
    form_data: BTreeMap<String, String>,
}

impl PostPolicy {
    pub fn new() -> Self {
        PostPolicy::default()
    }

    /// The bucket set by [`PostPolicy::bucket`], if any, so a caller can
    /// resolve that bucket's region before signing.
    pub fn bucket_name(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    pub fn expire_at(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        self.conditions.push(Condition::Eq {
            field: "bucket".to_string(),
            value: bucket.clone(),
        });
        self.form_data.insert("bucket".to_string(), bucket.clone());
        self.bucket = Some(bucket);
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.conditions.push(Condition::Eq {
            field: "key".to_string(),
            value: key.clone(),
        });
        self.form_data.insert("key".to_string(), key);
        self
    }

    pub fn key_starts_with(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.conditions.push(Condition::StartsWith {
            field: "key".to_string(),
            value: prefix.clone(),
        });
        self.form_data.insert("key".to_string(), prefix);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        self.conditions.push(Condition::Eq {
            field: "Content-Type".to_string(),
            value: content_type.clone(),
        });
        self.form_data.insert("Content-Type".to_string(), content_type);
        self
    }

    pub fn content_length_range(mut self, min: u64, max: u64) -> Self {
        self.conditions.push(Condition::ContentLengthRange { min, max });
        self
    }

    fn policy_json(&self, x_amz_date: &str, x_amz_algorithm: &str, x_amz_credential: &str) -> Result<String> {
        let expiration = self
            .expiration
            .ok_or_else(|| Error::InvalidArgument("PostPolicy requires an expiration before signing".into()))?;
        if self.bucket.is_none() {
            return Err(Error::InvalidArgument("PostPolicy requires a bucket condition before signing".into()));
        }

        let mut conditions: Vec<serde_json::Value> = self
            .conditions
            .iter()
            .map(|cond| match cond {
                Condition::Eq { field, value } => serde_json::json!({ field: value }),
                Condition::StartsWith { field, value } => serde_json::json!(["starts-with", format!("${}", field), value]),
                Condition::ContentLengthRange { min, max } => serde_json::json!(["content-length-range", min, max]),
            })
            .collect();
        conditions.push(serde_json::json!({ "x-amz-date": x_amz_date }));
        conditions.push(serde_json::json!({ "x-amz-algorithm": x_amz_algorithm }));
        conditions.push(serde_json::json!({ "x-amz-credential": x_amz_credential }));

        let policy = serde_json::json!({
            "expiration": expiration.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            "conditions": conditions,
        });
        Ok(serde_json::to_string(&policy).map_err(|e| Error::InvalidArgument(e.to_string()))?)
    }
}

/// Mutates `policy` to inject `x-amz-date`/`x-amz-algorithm`/`x-amz-credential`,
/// base64-encodes the JSON document, HMAC-signs it, and returns the
/// completed `formData` map. The caller submits the form; this crate never
/// does.
pub fn presigned_post_policy(policy: &PostPolicy, creds: &Credentials, region: &str, now: DateTime<Utc>) -> Result<BTreeMap<String, String>> {
    let date = amz_date(now);
    let date_stamp = &date[0..8];
    let scope = credential_scope(date_stamp, region);
    let credential = format!("{}/{}", creds.access_key, scope);

    let policy_json = policy.policy_json(&date, "AWS4-HMAC-SHA256", &credential)?;
    let policy_base64 = base64::engine::general_purpose::STANDARD.encode(policy_json.as_bytes());
    let signature = signature::post_policy_signature(&creds.secret_key, date_stamp, region, &policy_base64);

    let mut form_data = policy.form_data.clone();
    form_data.insert("policy".to_string(), policy_base64);
    form_data.insert("x-amz-date".to_string(), date);
    form_data.insert("x-amz-algorithm".to_string(), "AWS4-HMAC-SHA256".to_string());
    form_data.insert("x-amz-credential".to_string(), credential);
    form_data.insert("x-amz-signature".to_string(), signature);
    Ok(form_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 5, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn presigned_url_has_no_authorization_and_has_expiry() {
        let config = ClientConfig::builder("s3.amazonaws.com").build().unwrap();
        let creds = Credentials::new("AKIA", "secret");
        let url = presigned_url(&config, &creds, "us-east-1", Method::Get, "bucket", "key", 3600, fixed_now());
        assert!(url.contains("X-Amz-Expires=3600"));
        assert!(url.contains("X-Amz-Signature="));
        assert!(!url.contains("Authorization"));
    }

    #[test]
    fn policy_requires_expiration_and_bucket() {
        let policy = PostPolicy::new();
        let creds = Credentials::new("AKIA", "secret");
        assert!(presigned_post_policy(&policy, &creds, "us-east-1", fixed_now()).is_err());

        let policy = PostPolicy::new().bucket("b");
        assert!(presigned_post_policy(&policy, &creds, "us-east-1", fixed_now()).is_err());
    }

    #[test]
    fn completed_form_data_carries_signature_and_policy() {
        let policy = PostPolicy::new()
            .bucket("b")
            .key("o")
            .content_length_range(0, 1024)
            .expire_at(fixed_now());
        let creds = Credentials::new("AKIA", "secret");
        let form = presigned_post_policy(&policy, &creds, "us-east-1", fixed_now()).unwrap();
        assert_eq!(form.get("bucket").unwrap(), "b");
        assert_eq!(form.get("key").unwrap(), "o");
        assert!(form.contains_key("policy"));
        assert!(form.contains_key("x-amz-signature"));
    }
}

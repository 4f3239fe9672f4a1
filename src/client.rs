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

//! Object & Bucket API Surface: thin shells over
//! [`RequestExecutor::execute`], plus the file-based `fGet`/`fPut` entry
//! points that lean on [`crate::fs::FileSystem`].

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use chrono::Utc;
use log::{debug, warn};
use reqwest::blocking::Client as HttpClient;

use crate::acl::{self, CannedAcl};
use crate::config::ClientConfig;
use crate::decode::{self, ListingDecoder, XmlListingDecoder};
use crate::error::{Error, Result};
use crate::executor::RequestExecutor;
use crate::fs::{part_file_path, FileSystem, StdFileSystem};
use crate::model::{BucketInfo, ListObjectsPage, ListUploadsPage, ObjectStat};
use crate::multipart;
use crate::presign::{self, PostPolicy};
use crate::region::{is_valid_make_bucket_region, RegionCache, DEFAULT_REGION};
use crate::request::{Method, RequestSpec};
use crate::signature::EMPTY_PAYLOAD_SHA256;
use crate::trace::TraceSink;
use crate::validate::{DefaultNameValidator, NameValidator};

fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(data))
}

/// Process-wide handle: owns the immutable [`ClientConfig`],
/// the only mutable shared state ([`RegionCache`]), and the pluggable
/// collaborators kept outside the core proper. Safe to share
/// across threads; every operation may be called concurrently.
pub struct Client {
    config: ClientConfig,
    region_cache: RegionCache,
    http: HttpClient,
    trace: Option<Box<dyn TraceSink>>,
    validator: Box<dyn NameValidator>,
    file_system: Box<dyn FileSystem>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = HttpClient::builder().build()?;
        Ok(Client {
            config,
            region_cache: RegionCache::new(),
            http,
            trace: None,
            validator: Box::new(DefaultNameValidator),
            file_system: Box::new(StdFileSystem),
        })
    }

    pub fn with_trace_sink(mut self, sink: impl TraceSink + 'static) -> Self {
        self.trace = Some(Box::new(sink));
        self
    }

    pub fn with_name_validator(mut self, validator: impl NameValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn with_file_system(mut self, file_system: impl FileSystem + 'static) -> Self {
        self.file_system = Box::new(file_system);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn executor(&self) -> RequestExecutor<'_> {
        RequestExecutor::new(&self.config, &self.region_cache, &self.http, self.trace.as_deref())
    }

    fn require_credentials(&self) -> Result<()> {
        if self.config.is_anonymous() {
            return Err(Error::AnonymousRequest);
        }
        Ok(())
    }

    // ---- Bucket CRUD -----------------------------------------------------

    /// `PUT /{bucket}` with `x-amz-acl`; a non-default `region` sends a
    /// `CreateBucketConfiguration` body.
    pub fn make_bucket(&self, bucket: &str, acl: CannedAcl, region: &str) -> Result<()> {
        self.validator.validate_bucket_name(bucket)?;
        if !is_valid_make_bucket_region(region) {
            return Err(Error::InvalidArgument(format!("{} is not a region makeBucket accepts", region)));
        }
        let mut spec = RequestSpec::new(Method::Put).bucket(bucket).header("x-amz-acl", acl.header_value());

        let (body, sha) = if region == DEFAULT_REGION {
            (None, EMPTY_PAYLOAD_SHA256.to_string())
        } else {
            let xml = format!(
                "<CreateBucketConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\"><LocationConstraint>{}</LocationConstraint></CreateBucketConfiguration>",
                region
            );
            let sha = sha256_hex(xml.as_bytes());
            (Some(xml.into_bytes()), sha)
        };
        spec = spec.header("content-length", body.as_ref().map(|b| b.len()).unwrap_or(0).to_string());

        self.executor().execute(spec, body, &sha, 200)?;
        self.region_cache.insert(bucket, region);
        debug!("created bucket {} in {}", bucket, region);
        Ok(())
    }

    /// `DELETE /{bucket}`; also evicts the region cache entry, since the bucket no longer exists to have a region.
    pub fn remove_bucket(&self, bucket: &str) -> Result<()> {
        self.validator.validate_bucket_name(bucket)?;
        let spec = RequestSpec::new(Method::Delete).bucket(bucket);
        self.executor().execute(spec, None, EMPTY_PAYLOAD_SHA256, 204)?;
        self.region_cache.evict(bucket);
        Ok(())
    }

    pub fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        let spec = RequestSpec::new(Method::Get);
        let (_, body) = self.executor().execute_buffered(spec, None, EMPTY_PAYLOAD_SHA256, 200)?;
        XmlListingDecoder.decode_buckets(&body)
    }

    // ---- Object CRUD -------------------------------------------------------

    pub fn put_bytes(&self, bucket: &str, object: &str, bytes: &[u8], content_type: Option<&str>, acl: Option<CannedAcl>) -> Result<String> {
        self.validator.validate_bucket_name(bucket)?;
        self.validator.validate_object_name(object)?;
        multipart::put_stream(&self.executor(), bucket, object, bytes, bytes.len() as u64, content_type, acl)
    }

    pub fn put_stream<R: Read>(
        &self,
        bucket: &str,
        object: &str,
        reader: R,
        size: u64,
        content_type: Option<&str>,
        acl: Option<CannedAcl>,
    ) -> Result<String> {
        self.validator.validate_bucket_name(bucket)?;
        self.validator.validate_object_name(object)?;
        multipart::put_stream(&self.executor(), bucket, object, reader, size, content_type, acl)
    }

    /// Uploads the file at `path`, using its on-disk size as the declared
    /// size.
    pub fn f_put(&self, bucket: &str, object: &str, path: &Path, content_type: Option<&str>, acl: Option<CannedAcl>) -> Result<String> {
        self.validator.validate_bucket_name(bucket)?;
        self.validator.validate_object_name(object)?;
        let file = self.file_system.open_read(path)?;
        let size = self.file_system.file_len(path)?;
        multipart::put_stream(&self.executor(), bucket, object, file, size, content_type, acl)
    }

    /// `GET /{bucket}/{object}`, buffered fully into memory.
    pub fn get_object(&self, bucket: &str, object: &str) -> Result<Vec<u8>> {
        self.validator.validate_bucket_name(bucket)?;
        self.validator.validate_object_name(object)?;
        let spec = RequestSpec::new(Method::Get).bucket(bucket).object(object);
        let (_, body) = self.executor().execute_buffered(spec, None, EMPTY_PAYLOAD_SHA256, 200)?;
        Ok(body.to_vec())
    }

    /// `Range: bytes={offset}-{offset+length-1}`, open-ended when `length`
    /// is `0` and `offset > 0`.
    pub fn get_partial_object(&self, bucket: &str, object: &str, offset: u64, length: u64) -> Result<Vec<u8>> {
        self.validator.validate_bucket_name(bucket)?;
        self.validator.validate_object_name(object)?;
        let range = if length == 0 {
            format!("bytes={}-", offset)
        } else {
            format!("bytes={}-{}", offset, offset + length - 1)
        };
        let spec = RequestSpec::new(Method::Get).bucket(bucket).object(object).header("range", range);
        let (_, body) = self.executor().execute_buffered(spec, None, EMPTY_PAYLOAD_SHA256, 206)?;
        Ok(body.to_vec())
    }

    /// Downloads to `{path}.{etag}.part`, resuming from the part file's
    /// current length when one already matches the object's `ETag`, then
    /// renames atomically into place on success.
    pub fn f_get(&self, bucket: &str, object: &str, path: &Path) -> Result<()> {
        self.validator.validate_bucket_name(bucket)?;
        self.validator.validate_object_name(object)?;
        let stat = self.stat_object(bucket, object)?;
        let part_path = part_file_path(path, &stat.etag);
        self.file_system.create_parent_dirs(path)?;

        let existing_len = if self.file_system.exists(&part_path) {
            self.file_system.file_len(&part_path)?
        } else {
            0
        };

        if existing_len as i64 == stat.size {
            self.file_system.rename(&part_path, path)?;
            return Ok(());
        }
        if existing_len as i64 > stat.size {
            warn!("resume artifact for {}/{} is larger than the object, restarting", bucket, object);
            self.file_system.remove_file(&part_path)?;
        }

        let mut dest = self.file_system.open_append(&part_path)?;
        let remaining = stat.size as u64 - existing_len;
        let body = if existing_len > 0 {
            self.get_partial_object(bucket, object, existing_len, remaining)?
        } else {
            self.get_object(bucket, object)?
        };
        dest.write_all(&body)?;
        drop(dest);

        if self.file_system.file_len(&part_path)? != stat.size as u64 {
            return Err(Error::SizeMismatch {
                expected: stat.size as u64,
                actual: self.file_system.file_len(&part_path)?,
            });
        }
        self.file_system.rename(&part_path, path)?;
        Ok(())
    }

    /// `HEAD /{bucket}/{object}`.
    pub fn stat_object(&self, bucket: &str, object: &str) -> Result<ObjectStat> {
        self.validator.validate_bucket_name(bucket)?;
        self.validator.validate_object_name(object)?;
        let spec = RequestSpec::new(Method::Head).bucket(bucket).object(object);
        let executed = self.executor().execute(spec, None, EMPTY_PAYLOAD_SHA256, 200)?;
        let headers = executed.headers.clone();
        let header = |name: &str| headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.clone());
        Ok(ObjectStat {
            size: header("content-length").and_then(|v| v.parse().ok()).unwrap_or(0),
            etag: header("etag").unwrap_or_default().trim_matches('"').to_string(),
            content_type: header("content-type").unwrap_or_default(),
            last_modified: header("last-modified").unwrap_or_default(),
        })
    }

    pub fn remove_object(&self, bucket: &str, object: &str) -> Result<()> {
        self.validator.validate_bucket_name(bucket)?;
        self.validator.validate_object_name(object)?;
        let spec = RequestSpec::new(Method::Delete).bucket(bucket).object(object);
        self.executor().execute(spec, None, EMPTY_PAYLOAD_SHA256, 204)?;
        Ok(())
    }

    /// Locates the upload id via `findUploadId` then `DELETE ?uploadId=...`
    ///.
    pub fn remove_incomplete_upload(&self, bucket: &str, object: &str) -> Result<()> {
        self.validator.validate_bucket_name(bucket)?;
        self.validator.validate_object_name(object)?;
        let executor = self.executor();
        if let Some(upload_id) = multipart::find_upload_id(&executor, bucket, object)? {
            let spec = RequestSpec::new(Method::Delete).bucket(bucket).object(object).query("uploadId", upload_id);
            executor.execute(spec, None, EMPTY_PAYLOAD_SHA256, 204)?;
        }
        Ok(())
    }

    // ---- Listings ----------------------------------------------------------

    pub fn list_objects(&self, bucket: &str, prefix: Option<&str>, marker: Option<&str>, max_keys: Option<u32>) -> Result<ListObjectsPage> {
        self.validator.validate_bucket_name(bucket)?;
        if let Some(prefix) = prefix {
            self.validator.validate_prefix(prefix)?;
        }
        let mut spec = RequestSpec::new(Method::Get).bucket(bucket).query("delimiter", "/");
        if let Some(prefix) = prefix {
            spec = spec.query("prefix", prefix);
        }
        if let Some(marker) = marker {
            spec = spec.query("marker", marker);
        }
        if let Some(max_keys) = max_keys {
            spec = spec.query("max-keys", max_keys.to_string());
        }
        let (_, body) = self.executor().execute_buffered(spec, None, EMPTY_PAYLOAD_SHA256, 200)?;
        XmlListingDecoder.decode_objects(&body)
    }

    pub fn list_incomplete_uploads(&self, bucket: &str, prefix: Option<&str>) -> Result<ListUploadsPage> {
        self.validator.validate_bucket_name(bucket)?;
        let mut spec = RequestSpec::new(Method::Get).bucket(bucket).query("uploads", "");
        if let Some(prefix) = prefix {
            self.validator.validate_prefix(prefix)?;
            spec = spec.query("prefix", prefix);
        }
        let (_, body) = self.executor().execute_buffered(spec, None, EMPTY_PAYLOAD_SHA256, 200)?;
        XmlListingDecoder.decode_uploads(&body)
    }

    // ---- ACL -----------------------------------------------------------------

    /// Reduces the server's grant list to a canned ACL name via
    /// [`acl::reduce_grants`].
    pub fn get_bucket_acl(&self, bucket: &str) -> Result<String> {
        self.validator.validate_bucket_name(bucket)?;
        let spec = RequestSpec::new(Method::Get).bucket(bucket).query("acl", "");
        let (_, body) = self.executor().execute_buffered(spec, None, EMPTY_PAYLOAD_SHA256, 200)?;
        let grants = decode::decode_acl(&body)?;
        Ok(acl::reduce_grants(&grants))
    }

    pub fn put_bucket_acl(&self, bucket: &str, acl: CannedAcl) -> Result<()> {
        self.validator.validate_bucket_name(bucket)?;
        let spec = RequestSpec::new(Method::Put).bucket(bucket).query("acl", "").header("x-amz-acl", acl.header_value());
        self.executor().execute(spec, None, EMPTY_PAYLOAD_SHA256, 200)?;
        Ok(())
    }

    // ---- Presign & POST policy ------------------------------------------------

    pub fn presigned_get_object(&self, bucket: &str, object: &str, expires_secs: u32) -> Result<String> {
        self.require_credentials()?;
        self.validator.validate_bucket_name(bucket)?;
        self.validator.validate_object_name(object)?;
        let region = self.executor().resolve_region(Some(bucket))?;
        Ok(presign::presigned_url(&self.config, self.config.credentials(), &region, Method::Get, bucket, object, expires_secs, Utc::now()))
    }

    pub fn presigned_put_object(&self, bucket: &str, object: &str, expires_secs: u32) -> Result<String> {
        self.require_credentials()?;
        self.validator.validate_bucket_name(bucket)?;
        self.validator.validate_object_name(object)?;
        let region = self.executor().resolve_region(Some(bucket))?;
        Ok(presign::presigned_url(&self.config, self.config.credentials(), &region, Method::Put, bucket, object, expires_secs, Utc::now()))
    }

    pub fn presigned_post_policy(&self, policy: &PostPolicy) -> Result<BTreeMap<String, String>> {
        self.require_credentials()?;
        let bucket = policy
            .bucket_name()
            .ok_or_else(|| Error::InvalidArgument("PostPolicy requires a bucket condition before signing".into()))?;
        let region = self.executor().resolve_region(Some(bucket))?;
        presign::presigned_post_policy(policy, self.config.credentials(), &region, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presign_without_credentials_fails_before_any_io() {
        let config = ClientConfig::builder("play.min.io").build().unwrap();
        let client = Client::new(config).unwrap();
        let err = client.presigned_get_object("bucket", "object", 3600).unwrap_err();
        assert!(matches!(err, Error::AnonymousRequest));
    }

    #[test]
    fn rejects_invalid_bucket_name_before_any_io() {
        let config = ClientConfig::builder("play.min.io").credentials("AKIA", "secret").build().unwrap();
        let client = Client::new(config).unwrap();
        let err = client.get_object("AB", "key").unwrap_err();
        assert!(matches!(err, Error::InvalidBucketName(_)));
    }

    #[test]
    fn make_bucket_rejects_region_outside_vocabulary() {
        let config = ClientConfig::builder("play.min.io").credentials("AKIA", "secret").build().unwrap();
        let client = Client::new(config).unwrap();
        let err = client.make_bucket("my-bucket", CannedAcl::Private, "mars-1").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn presigned_post_policy_requires_a_bucket_before_any_io() {
        let config = ClientConfig::builder("play.min.io").credentials("AKIA", "secret").build().unwrap();
        let client = Client::new(config).unwrap();
        let err = client.presigned_post_policy(&PostPolicy::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}

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

//! Multipart Engine: discover/initiate an upload, chunk the
//! input stream into `partSize`-sized blocks, digest each block, skip parts
//! already uploaded (by MD5 match against the existing `PartRecord`), upload
//! what's missing in ascending part-number order, then complete.
//!
//! Modeled as composable stages: [`PartAggregator`]
//! is the block-chunker, [`upload_part`] is the per-chunk digest-then-send
//! stage, and [`put_stream`] is the linear procedure that drives them.

use std::collections::HashMap;
use std::io::Read;

use base64::Engine;
use md5::{Digest, Md5};
use sha2::Sha256;

use crate::acl::CannedAcl;
use crate::decode::{self, XmlListingDecoder, ListingDecoder};
use crate::error::{Error, Result};
use crate::executor::RequestExecutor;
use crate::model::PartRecord;
use crate::request::{Method, RequestSpec};
use crate::signature::EMPTY_PAYLOAD_SHA256;

pub const MINIMUM_PART_SIZE: u64 = 5 * 1024 * 1024;
pub const MAXIMUM_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;
pub const MAX_OBJECT_SIZE: u64 = 5 * 1024 * 1024 * 1024 * 1024;

/// `ceil(ceil(S/10000)/minimumPartSize) x minimumPartSize`.
pub fn calculate_part_size(size: u64) -> u64 {
    let parts_for_max_count = ceil_div(size, 10_000);
    let part_size_units = ceil_div(parts_for_max_count, MINIMUM_PART_SIZE);
    part_size_units * MINIMUM_PART_SIZE
}

fn ceil_div(a: u64, b: u64) -> u64 {
    if a == 0 {
        0
    } else {
        (a + b - 1) / b
    }
}

fn md5_digest(data: &[u8]) -> (String, String) {
    let digest = Md5::digest(data);
    (hex::encode(digest), base64::engine::general_purpose::STANDARD.encode(digest))
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Reads fixed-size blocks of `part_size` bytes from `reader` until
/// exhausted. A short final block is expected and not an error; a source
/// that somehow hands back more than `part_size` bytes in one block would
/// be an aggregation failure, but since the read buffer itself is capped
/// at `part_size` that case cannot arise here.
pub struct PartAggregator<R: Read> {
    reader: R,
    part_size: u64,
}

impl<R: Read> PartAggregator<R> {
    pub fn new(reader: R, part_size: u64) -> Self {
        PartAggregator { reader, part_size }
    }

    pub fn next_part(&mut self) -> Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; self.part_size as usize];
        let mut filled = 0usize;
        while filled < buf.len() {
            let n = self.reader.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        Ok(Some(buf))
    }
}

fn validate_chunk_size(chunk_len: usize, part_size: u64) -> Result<()> {
    if chunk_len as u64 > part_size {
        return Err(Error::AggregationError(format!(
            "chunk of {} bytes exceeds part size {}",
            chunk_len, part_size
        )));
    }
    Ok(())
}

/// `POST ?uploads`, returning the server-issued upload id.
pub fn initiate_upload(
    executor: &RequestExecutor,
    bucket: &str,
    object: &str,
    content_type: Option<&str>,
    acl: Option<CannedAcl>,
) -> Result<String> {
    let mut spec = RequestSpec::new(Method::Post).bucket(bucket).object(object).query("uploads", "");
    if let Some(ct) = content_type {
        spec = spec.header("content-type", ct);
    }
    if let Some(acl) = acl {
        spec = spec.header("x-amz-acl", acl.header_value());
    }
    let (_, body) = executor.execute_buffered(spec, None, EMPTY_PAYLOAD_SHA256, 200)?;
    decode::decode_initiate_multipart(&body)
}

/// Looks for a prior incomplete upload of `object` to resume.
/// Returns the first match; the wire format does not
/// guarantee recency ordering, so a caller juggling several concurrent
/// uploads of the same key should not rely on this picking a specific one.
pub fn find_upload_id(executor: &RequestExecutor, bucket: &str, object: &str) -> Result<Option<String>> {
    let spec = RequestSpec::new(Method::Get)
        .bucket(bucket)
        .query("uploads", "")
        .query("prefix", object)
        .query("max-uploads", "1000");
    let (_, body) = executor.execute_buffered(spec, None, EMPTY_PAYLOAD_SHA256, 200)?;
    let page = XmlListingDecoder.decode_uploads(&body)?;
    Ok(page.uploads.into_iter().find(|u| u.key == object).map(|u| u.upload_id))
}

/// `GET ?uploadId=...`, the existing `PartRecord`s an upload can resume from.
pub fn list_existing_parts(executor: &RequestExecutor, bucket: &str, object: &str, upload_id: &str) -> Result<Vec<PartRecord>> {
    let spec = RequestSpec::new(Method::Get).bucket(bucket).object(object).query("uploadId", upload_id);
    let (_, body) = executor.execute_buffered(spec, None, EMPTY_PAYLOAD_SHA256, 200)?;
    Ok(XmlListingDecoder.decode_parts(&body, upload_id)?.parts)
}

/// `PUT ?partNumber=N&uploadId=...` for one chunk; the returned `ETag` is
/// the part's MD5 hex (quotes stripped), which is also what a future resume
/// attempt compares against to decide whether to skip this part.
pub fn upload_part(
    executor: &RequestExecutor,
    bucket: &str,
    object: &str,
    upload_id: &str,
    part_number: u32,
    chunk: &[u8],
) -> Result<PartRecord> {
    let (_, md5_b64) = md5_digest(chunk);
    let sha_hex = sha256_hex(chunk);
    let spec = RequestSpec::new(Method::Put)
        .bucket(bucket)
        .object(object)
        .query("partNumber", part_number.to_string())
        .query("uploadId", upload_id)
        .header("content-md5", md5_b64);

    let executed = executor.execute(spec, Some(chunk.to_vec()), &sha_hex, 200)?;
    let etag = executed
        .headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("etag"))
        .map(|(_, v)| v.trim_matches('"').to_string())
        .unwrap_or_default();
    Ok(PartRecord {
        part_number,
        etag,
        size: chunk.len() as u64,
    })
}

/// `POST ?uploadId=...` with the ordered `<Part>` manifest; returns the
/// final object ETag.
pub fn complete_upload(executor: &RequestExecutor, bucket: &str, object: &str, upload_id: &str, parts: &[PartRecord]) -> Result<String> {
    let mut xml = String::from("<CompleteMultipartUpload>");
    for part in parts {
        xml.push_str(&format!(
            "<Part><PartNumber>{}</PartNumber><ETag>\"{}\"</ETag></Part>",
            part.part_number, part.etag
        ));
    }
    xml.push_str("</CompleteMultipartUpload>");
    let body = xml.into_bytes();
    let sha = sha256_hex(&body);

    let spec = RequestSpec::new(Method::Post).bucket(bucket).object(object).query("uploadId", upload_id);
    let (_, resp_body) = executor.execute_buffered(spec, Some(body), &sha, 200)?;
    decode::decode_complete_multipart(&resp_body)
}

/// Single-shot `PUT` for objects at or below [`MINIMUM_PART_SIZE`]; returns
/// the object's ETag.
pub fn put_single_shot(
    executor: &RequestExecutor,
    bucket: &str,
    object: &str,
    bytes: &[u8],
    content_type: Option<&str>,
    acl: Option<CannedAcl>,
) -> Result<String> {
    let (_, md5_b64) = md5_digest(bytes);
    let sha_hex = sha256_hex(bytes);
    let mut spec = RequestSpec::new(Method::Put)
        .bucket(bucket)
        .object(object)
        .header("content-md5", md5_b64)
        .header("content-length", bytes.len().to_string());
    if let Some(ct) = content_type {
        spec = spec.header("content-type", ct);
    }
    if let Some(acl) = acl {
        spec = spec.header("x-amz-acl", acl.header_value());
    }
    let executed = executor.execute(spec, Some(bytes.to_vec()), &sha_hex, 200)?;
    Ok(executed
        .headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("etag"))
        .map(|(_, v)| v.trim_matches('"').to_string())
        .unwrap_or_default())
}

/// The full pipeline: single-shot below [`MINIMUM_PART_SIZE`], otherwise
/// discover-or-initiate, resume-skip already-uploaded parts by MD5 match,
/// upload the rest in order, then complete. Returns the final ETag.
pub fn put_stream<R: Read>(
    executor: &RequestExecutor,
    bucket: &str,
    object: &str,
    mut reader: R,
    size: u64,
    content_type: Option<&str>,
    acl: Option<CannedAcl>,
) -> Result<String> {
    if size <= MINIMUM_PART_SIZE {
        let mut buf = Vec::with_capacity(size as usize);
        reader.read_to_end(&mut buf)?;
        if buf.len() as u64 != size {
            return Err(Error::SizeMismatch {
                expected: size,
                actual: buf.len() as u64,
            });
        }
        return put_single_shot(executor, bucket, object, &buf, content_type, acl);
    }

    let part_size = calculate_part_size(size);
    let upload_id = match find_upload_id(executor, bucket, object)? {
        Some(id) => id,
        None => initiate_upload(executor, bucket, object, content_type, acl)?,
    };
    let existing: HashMap<u32, PartRecord> = list_existing_parts(executor, bucket, object, &upload_id)?
        .into_iter()
        .map(|p| (p.part_number, p))
        .collect();

    let mut aggregator = PartAggregator::new(&mut reader, part_size);
    let mut part_number = 1u32;
    let mut completed = Vec::new();
    let mut uploaded_size = 0u64;

    while let Some(chunk) = aggregator.next_part()? {
        validate_chunk_size(chunk.len(), part_size)?;
        let (md5_hex, _) = md5_digest(&chunk);

        if let Some(existing_part) = existing.get(&part_number) {
            if existing_part.etag == md5_hex {
                uploaded_size += chunk.len() as u64;
                completed.push(existing_part.clone());
                part_number += 1;
                continue;
            }
        }

        let record = upload_part(executor, bucket, object, &upload_id, part_number, &chunk)?;
        uploaded_size += record.size;
        completed.push(record);
        part_number += 1;
    }

    if uploaded_size != size {
        return Err(Error::SizeMismatch {
            expected: size,
            actual: uploaded_size,
        });
    }

    complete_upload(executor, bucket, object, &upload_id, &completed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_size_formula_matches_known_scenario() {
        assert_eq!(calculate_part_size(5 * 1024 * 1024 * 1024 * 1024), 525 * 1024 * 1024);
    }

    #[test]
    fn part_size_never_below_minimum() {
        assert_eq!(calculate_part_size(1), MINIMUM_PART_SIZE);
        assert_eq!(calculate_part_size(MINIMUM_PART_SIZE), MINIMUM_PART_SIZE);
    }

    #[test]
    fn aggregator_yields_fixed_size_blocks_then_a_short_tail() {
        let data = vec![7u8; 25];
        let mut agg = PartAggregator::new(&data[..], 10);
        assert_eq!(agg.next_part().unwrap().unwrap().len(), 10);
        assert_eq!(agg.next_part().unwrap().unwrap().len(), 10);
        assert_eq!(agg.next_part().unwrap().unwrap().len(), 5);
        assert!(agg.next_part().unwrap().is_none());
    }

    #[test]
    fn aggregator_on_empty_input_yields_nothing() {
        let data: Vec<u8> = vec![];
        let mut agg = PartAggregator::new(&data[..], 10);
        assert!(agg.next_part().unwrap().is_none());
    }

    #[test]
    fn validate_chunk_rejects_oversize_chunk() {
        assert!(validate_chunk_size(11, 10).is_err());
        assert!(validate_chunk_size(10, 10).is_ok());
    }
}

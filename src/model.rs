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

//! Typed records the core hands back to callers. These are
//! plain data — the XML parsing that produces them lives in [`crate::decode`].

/// Result of `statObject` / a successful `getObject`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStat {
    pub size: i64,
    /// Hex, surrounding quotes stripped.
    pub etag: String,
    pub content_type: String,
    /// RFC-1123 string, as returned by the server.
    pub last_modified: String,
}

/// One part of a multipart upload. `size` is not part of the
/// spec's minimal `PartRecord` but is carried through from `ListParts` so
/// the multipart engine can report progress without a second round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRecord {
    pub part_number: u32,
    pub etag: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketInfo {
    pub name: String,
    pub creation_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub etag: String,
    pub last_modified: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompleteUpload {
    pub key: String,
    pub upload_id: String,
    pub initiated: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsPage {
    pub is_truncated: bool,
    pub next_marker: Option<String>,
    pub contents: Vec<ObjectInfo>,
    pub common_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListUploadsPage {
    pub is_truncated: bool,
    pub next_key_marker: Option<String>,
    pub next_upload_id_marker: Option<String>,
    pub uploads: Vec<IncompleteUpload>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPartsPage {
    pub upload_id: String,
    pub is_truncated: bool,
    pub next_part_number_marker: Option<u32>,
    pub parts: Vec<PartRecord>,
}

/// One `<Grant>` entry from a `GetBucketAcl`/`GetObjectAcl` response, before
/// reduction to a [`crate::acl::CannedAcl`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub grantee_uri: Option<String>,
    pub grantee_id: Option<String>,
    pub permission: String,
}

pub const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";
pub const AUTHENTICATED_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";

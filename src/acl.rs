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

//! Canned ACL vocabulary and the Grant-list reduction table
//! `getBucketACL` applies to turn a server-returned grant list back into
//! one of the four names.

use std::fmt;

use crate::error::Error;
use crate::model::{Grant, ALL_USERS_URI, AUTHENTICATED_USERS_URI};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CannedAcl {
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
}

impl CannedAcl {
    pub fn header_value(self) -> &'static str {
        match self {
            CannedAcl::Private => "private",
            CannedAcl::PublicRead => "public-read",
            CannedAcl::PublicReadWrite => "public-read-write",
            CannedAcl::AuthenticatedRead => "authenticated-read",
        }
    }

    pub fn parse(value: &str) -> Result<Self, Error> {
        match value {
            "private" => Ok(CannedAcl::Private),
            "public-read" => Ok(CannedAcl::PublicRead),
            "public-read-write" => Ok(CannedAcl::PublicReadWrite),
            "authenticated-read" => Ok(CannedAcl::AuthenticatedRead),
            other => Err(Error::InvalidAcl(other.to_string())),
        }
    }
}

impl fmt::Display for CannedAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_value())
    }
}

/// A grant list that does not collapse to one of the four canned names.
pub const UNSUPPORTED_ACL: &str = "unsupported-acl";

/// Reduces a `GetBucketAcl`/`GetObjectAcl` grant list to a canned ACL name
/// per the canonical grant-combination table, or [`UNSUPPORTED_ACL`] when the
/// combination of read/write grants to `AllUsers`/`AuthenticatedUsers`
/// doesn't match one of the four recognized shapes.
pub fn reduce_grants(grants: &[Grant]) -> String {
    let has = |uri: &str, perm: &str| {
        grants.iter().any(|g| {
            g.grantee_uri.as_deref() == Some(uri) && (g.permission == perm || g.permission == "FULL_CONTROL")
        })
    };

    let public_read = has(ALL_USERS_URI, "READ");
    let public_write = has(ALL_USERS_URI, "WRITE");
    let auth_read = has(AUTHENTICATED_USERS_URI, "READ");
    let auth_write = has(AUTHENTICATED_USERS_URI, "WRITE");

    match (public_read, public_write, auth_read, auth_write) {
        (true, true, false, false) => CannedAcl::PublicReadWrite.header_value().to_string(),
        (true, false, false, false) => CannedAcl::PublicRead.header_value().to_string(),
        (false, false, true, false) => CannedAcl::AuthenticatedRead.header_value().to_string(),
        (false, false, false, false) => CannedAcl::Private.header_value().to_string(),
        _ => UNSUPPORTED_ACL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(uri: &str, permission: &str) -> Grant {
        Grant {
            grantee_uri: Some(uri.to_string()),
            grantee_id: None,
            permission: permission.to_string(),
        }
    }

    #[test]
    fn parses_and_renders_canned_names() {
        assert_eq!(CannedAcl::parse("public-read").unwrap(), CannedAcl::PublicRead);
        assert_eq!(CannedAcl::PublicReadWrite.to_string(), "public-read-write");
        assert!(CannedAcl::parse("bogus").is_err());
    }

    #[test]
    fn reduces_public_read_write() {
        let grants = vec![grant(ALL_USERS_URI, "READ"), grant(ALL_USERS_URI, "WRITE")];
        assert_eq!(reduce_grants(&grants), "public-read-write");
    }

    #[test]
    fn reduces_public_read() {
        let grants = vec![grant(ALL_USERS_URI, "READ")];
        assert_eq!(reduce_grants(&grants), "public-read");
    }

    #[test]
    fn reduces_authenticated_read() {
        let grants = vec![grant(AUTHENTICATED_USERS_URI, "READ")];
        assert_eq!(reduce_grants(&grants), "authenticated-read");
    }

    #[test]
    fn reduces_private_when_no_public_or_authenticated_grants() {
        let grants = vec![Grant {
            grantee_uri: None,
            grantee_id: Some("owner".to_string()),
            permission: "FULL_CONTROL".to_string(),
        }];
        assert_eq!(reduce_grants(&grants), "private");
    }

    #[test]
    fn unsupported_combination_falls_through() {
        let grants = vec![grant(ALL_USERS_URI, "WRITE")];
        assert_eq!(reduce_grants(&grants), UNSUPPORTED_ACL);
    }
}

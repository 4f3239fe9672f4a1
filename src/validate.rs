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

//! Bucket/object/prefix legality checks, kept as an external collaborator
//! consumed by interface only, so [`NameValidator`]
//! is the seam: [`DefaultNameValidator`] applies the vocabulary most
//! S3-compatible servers enforce, but a [`crate::client::Client`] can be
//! built with a stricter or looser one.

use regex::Regex;

use crate::error::{Error, Result};

/// Lowercase letters, digits, dots and hyphens, anchored so a prefix/suffix
/// match can't sneak disallowed characters past `find`.
const BUCKET_NAME_PATTERN: &str = r"^[a-z0-9][a-z0-9.\-]{1,61}[a-z0-9]$";

pub trait NameValidator: Send + Sync {
    fn validate_bucket_name(&self, name: &str) -> Result<()>;
    fn validate_object_name(&self, name: &str) -> Result<()>;
    fn validate_prefix(&self, prefix: &str) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNameValidator;

impl NameValidator for DefaultNameValidator {
    /// DNS-compatible bucket naming: 3-63 characters, lowercase letters,
    /// digits, dots and hyphens, starting and ending with a letter or digit.
    fn validate_bucket_name(&self, name: &str) -> Result<()> {
        if name.len() < 3 || name.len() > 63 {
            return Err(Error::InvalidBucketName(format!("{} must be 3-63 characters", name)));
        }
        let pattern = Regex::new(BUCKET_NAME_PATTERN).expect("BUCKET_NAME_PATTERN is a valid regex");
        if !pattern.is_match(name) {
            return Err(Error::InvalidBucketName(format!(
                "{} must start/end with a letter or digit and contain only lowercase letters, digits, dots and hyphens",
                name
            )));
        }
        if name.contains("..") || name.parse::<std::net::Ipv4Addr>().is_ok() {
            return Err(Error::InvalidBucketName(format!("{} is not a legal bucket name", name)));
        }
        Ok(())
    }

    fn validate_object_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidObjectName("object name must not be empty".into()));
        }
        if name.len() > 1024 {
            return Err(Error::InvalidObjectName(format!("{} exceeds 1024 bytes", name)));
        }
        Ok(())
    }

    fn validate_prefix(&self, prefix: &str) -> Result<()> {
        if prefix.len() > 1024 {
            return Err(Error::InvalidPrefix(format!("{} exceeds 1024 bytes", prefix)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_bucket_names() {
        let v = DefaultNameValidator;
        assert!(v.validate_bucket_name("my-bucket.1").is_ok());
    }

    #[test]
    fn rejects_short_and_uppercase_bucket_names() {
        let v = DefaultNameValidator;
        assert!(v.validate_bucket_name("ab").is_err());
        assert!(v.validate_bucket_name("MyBucket").is_err());
    }

    #[test]
    fn rejects_underscore_in_bucket_name() {
        let v = DefaultNameValidator;
        assert!(v.validate_bucket_name("my_bucket").is_err());
    }

    #[test]
    fn rejects_ip_shaped_bucket_name() {
        let v = DefaultNameValidator;
        assert!(v.validate_bucket_name("192.168.1.1").is_err());
    }

    #[test]
    fn rejects_empty_object_name() {
        let v = DefaultNameValidator;
        assert!(v.validate_object_name("").is_err());
        assert!(v.validate_object_name("a/b.txt").is_ok());
    }
}

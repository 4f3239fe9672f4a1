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

//! Region vocabulary and the per-bucket region cache.

use std::collections::HashMap;
use std::sync::Mutex;

/// Default region used for bucket-listing and bucket-creation calls when no
/// bucket has been specified yet, and the fallback for an empty
/// `<LocationConstraint>` body.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Region codes `makeBucket` accepts. Third-party S3-compatible
/// endpoints are free to use any region string for everything else; this
/// vocabulary only gates bucket creation.
pub const MAKE_BUCKET_REGIONS: &[&str] = &[
    "us-east-1",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "eu-central-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "sa-east-1",
];

pub fn is_valid_make_bucket_region(region: &str) -> bool {
    MAKE_BUCKET_REGIONS.contains(&region)
}

/// Maps bucket name to region code, the only mutable shared state a
/// [`crate::client::Client`] owns. Empty on construction;
/// populated lazily by [`crate::client::Client::resolve_region`] and
/// invalidated on any unexpected-status response for that bucket.
#[derive(Default)]
pub struct RegionCache {
    entries: Mutex<HashMap<String, String>>,
}

impl RegionCache {
    pub fn new() -> Self {
        RegionCache {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, bucket: &str) -> Option<String> {
        self.entries.lock().unwrap().get(bucket).cloned()
    }

    pub fn insert(&self, bucket: &str, region: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(bucket.to_string(), region.to_string());
    }

    /// Evicted whenever a request to `bucket` returns an unexpected status,
    /// or on successful bucket deletion, so the next request re-discovers
    /// the region.
    pub fn evict(&self, bucket: &str) {
        self.entries.lock().unwrap().remove(bucket);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_on_construction() {
        let cache = RegionCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.get("bucket"), None);
    }

    #[test]
    fn insert_then_evict() {
        let cache = RegionCache::new();
        cache.insert("bucket", "eu-west-1");
        assert_eq!(cache.get("bucket").as_deref(), Some("eu-west-1"));
        cache.evict("bucket");
        assert_eq!(cache.get("bucket"), None);
    }

    #[test]
    fn region_vocabulary() {
        assert!(is_valid_make_bucket_region("us-east-1"));
        assert!(is_valid_make_bucket_region("sa-east-1"));
        assert!(!is_valid_make_bucket_region("mars-central-1"));
    }
}

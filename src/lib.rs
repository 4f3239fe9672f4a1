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

//! Core request pipeline for an S3-compatible object storage client.
//!
//! [`Client`] is the entry point: build a [`ClientConfig`], wrap it in a
//! [`Client`], and call its bucket/object operations. Everything below that
//! is the plumbing the operations share — request construction, SigV4
//! signing, per-bucket region caching, response decoding and the resumable
//! multipart upload engine.

pub mod acl;
pub mod client;
pub mod config;
pub mod credentials;
pub mod decode;
pub mod encode;
pub mod error;
pub mod executor;
pub mod fs;
pub mod model;
pub mod multipart;
pub mod presign;
pub mod region;
pub mod request;
pub mod signature;
pub mod trace;
pub mod validate;

pub use acl::CannedAcl;
pub use client::Client;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use credentials::{ChainProvider, Credentials, CredentialsProvider, EnvironmentProvider, StaticProvider};
pub use error::{Error, Result};
pub use model::{BucketInfo, Grant, IncompleteUpload, ListObjectsPage, ListPartsPage, ListUploadsPage, ObjectInfo, ObjectStat, PartRecord};
pub use presign::PostPolicy;

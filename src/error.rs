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

//! Error kinds surfaced by every operation in the crate, collapsed into
//! variants of one enum rather than split across several small error
//! structs, since every call site here returns a single `Result<_, Error>`.

use thiserror::Error;

/// The server-decoded `<Error>` document returned by S3 on an unexpected
/// status code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerErrorBody {
    pub code: String,
    pub message: String,
    pub resource: String,
    pub request_id: String,
}

/// All errors this crate can return.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("invalid port: {0}")]
    InvalidPort(u32),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid bucket name: {0}")]
    InvalidBucketName(String),

    #[error("invalid object name: {0}")]
    InvalidObjectName(String),

    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    #[error("invalid acl: {0}")]
    InvalidAcl(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("operation requires credentials but the client is anonymous")]
    AnonymousRequest,

    #[error("server error {status}: {body:?}")]
    ServerError {
        status: u16,
        body: ServerErrorBody,
    },

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("declared size {expected} did not match {actual} bytes streamed")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("aggregation error: {0}")]
    AggregationError(String),

    #[error("xml decode error: {0}")]
    XmlDecode(#[from] quick_xml::DeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

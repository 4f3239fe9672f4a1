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

//! Percent-encoding according to the S3 / SigV4 specification.
//!
//! * URI encode every byte except the unreserved characters: 'A'-'Z',
//!   'a'-'z', '0'-'9', '-', '.', '_' and '~'.
//! * The space character must be encoded as "%20" (never "+").
//! * Hex digits in the encoded form must be uppercase, e.g. "%1A".
//!
//! source: <https://docs.aws.amazon.com/AmazonS3/latest/API/sig-v4-header-based-auth.html>

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

const UNRESERVED: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'!')
    .add(b'"')
    .add(b'#')
    .add(b'$')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'=')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b']');

const UNRESERVED_KEEP_SLASH: &AsciiSet = &UNRESERVED.remove(b'/');

/// Encode every byte of `uri` that isn't in the S3 unreserved set, including `/`.
#[inline]
pub fn encode_uri(uri: &str) -> String {
    utf8_percent_encode(uri, UNRESERVED).to_string()
}

/// Same as [`encode_uri`] but leaves `/` untouched, for object key path segments.
#[inline]
pub fn encode_uri_object_key(uri: &str) -> String {
    utf8_percent_encode(uri, UNRESERVED_KEEP_SLASH).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_space_and_plus_and_slash() {
        assert_eq!("a%20%2Bbb%2Fc", encode_uri("a +bb/c"));
    }

    #[test]
    fn object_key_leaves_slash_alone() {
        assert_eq!("a%20%2Bbb/c", encode_uri_object_key("a +bb/c"));
    }

    #[test]
    fn unreserved_characters_pass_through() {
        assert_eq!("abcXYZ09-._~", encode_uri("abcXYZ09-._~"));
    }
}

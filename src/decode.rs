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

//! Response Decoders: streaming XML turned into the typed
//! records in [`crate::model`].
//!
//! The XML-to-record decoders for each listing response are kept as an
//! external collaborator the core only consumes by interface.
//! [`ListingDecoder`] is that interface; [`XmlListingDecoder`]
//! is the default implementation wired into [`crate::client::Client`], kept
//! here as the one concrete implementation on offer, but swappable by any
//! caller who has a faster or schema-validating decoder. The non-listing
//! decoders (multipart-init, multipart-complete, ACL, location, error) are
//! core and are plain functions.

use serde::Deserialize;

use crate::error::{Error, Result, ServerErrorBody};
use crate::model::{BucketInfo, Grant, IncompleteUpload, ListObjectsPage, ListPartsPage, ListUploadsPage, ObjectInfo, PartRecord};
use crate::region::DEFAULT_REGION;

fn strip_quotes(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

fn body_str(body: &[u8]) -> Result<&str> {
    std::str::from_utf8(body).map_err(|e| Error::XmlDecode(quick_xml::DeError::Custom(e.to_string())))
}

/// Interface for decoding listing responses into typed pages. See the
/// module doc for why this is a trait rather than a free function.
pub trait ListingDecoder: Send + Sync {
    fn decode_buckets(&self, body: &[u8]) -> Result<Vec<BucketInfo>>;
    fn decode_objects(&self, body: &[u8]) -> Result<ListObjectsPage>;
    fn decode_uploads(&self, body: &[u8]) -> Result<ListUploadsPage>;
    fn decode_parts(&self, body: &[u8], upload_id: &str) -> Result<ListPartsPage>;
}

/// The default [`ListingDecoder`], built on `quick-xml`'s serde integration.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlListingDecoder;

impl ListingDecoder for XmlListingDecoder {
    fn decode_buckets(&self, body: &[u8]) -> Result<Vec<BucketInfo>> {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct BucketXml {
            name: String,
            #[serde(default)]
            creation_date: String,
        }
        #[derive(Deserialize, Default)]
        struct BucketsXml {
            #[serde(default, rename = "Bucket")]
            bucket: Vec<BucketXml>,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct ListAllMyBucketsResult {
            #[serde(default)]
            buckets: BucketsXml,
        }

        let parsed: ListAllMyBucketsResult = quick_xml::de::from_str(body_str(body)?)?;
        Ok(parsed
            .buckets
            .bucket
            .into_iter()
            .map(|b| BucketInfo {
                name: b.name,
                creation_date: b.creation_date,
            })
            .collect())
    }

    fn decode_objects(&self, body: &[u8]) -> Result<ListObjectsPage> {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct ContentsXml {
            key: String,
            #[serde(default)]
            last_modified: String,
            #[serde(default)]
            e_tag: String,
            #[serde(default)]
            size: u64,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct CommonPrefixXml {
            prefix: String,
        }
        #[derive(Deserialize, Default)]
        #[serde(rename_all = "PascalCase")]
        struct ListBucketResult {
            #[serde(default)]
            is_truncated: bool,
            #[serde(default)]
            next_marker: Option<String>,
            #[serde(default, rename = "Contents")]
            contents: Vec<ContentsXml>,
            #[serde(default, rename = "CommonPrefixes")]
            common_prefixes: Vec<CommonPrefixXml>,
        }

        let parsed: ListBucketResult = quick_xml::de::from_str(body_str(body)?)?;
        Ok(ListObjectsPage {
            is_truncated: parsed.is_truncated,
            next_marker: parsed.next_marker,
            contents: parsed
                .contents
                .into_iter()
                .map(|c| ObjectInfo {
                    key: c.key,
                    size: c.size,
                    etag: strip_quotes(&c.e_tag),
                    last_modified: c.last_modified,
                })
                .collect(),
            common_prefixes: parsed.common_prefixes.into_iter().map(|p| p.prefix).collect(),
        })
    }

    fn decode_uploads(&self, body: &[u8]) -> Result<ListUploadsPage> {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct UploadXml {
            key: String,
            upload_id: String,
            #[serde(default)]
            initiated: String,
        }
        #[derive(Deserialize, Default)]
        #[serde(rename_all = "PascalCase")]
        struct ListMultipartUploadsResult {
            #[serde(default)]
            is_truncated: bool,
            #[serde(default)]
            next_key_marker: Option<String>,
            #[serde(default)]
            next_upload_id_marker: Option<String>,
            #[serde(default, rename = "Upload")]
            upload: Vec<UploadXml>,
        }

        let parsed: ListMultipartUploadsResult = quick_xml::de::from_str(body_str(body)?)?;
        Ok(ListUploadsPage {
            is_truncated: parsed.is_truncated,
            next_key_marker: parsed.next_key_marker,
            next_upload_id_marker: parsed.next_upload_id_marker,
            uploads: parsed
                .upload
                .into_iter()
                .map(|u| IncompleteUpload {
                    key: u.key,
                    upload_id: u.upload_id,
                    initiated: u.initiated,
                })
                .collect(),
        })
    }

    fn decode_parts(&self, body: &[u8], upload_id: &str) -> Result<ListPartsPage> {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct PartXml {
            part_number: u32,
            #[serde(default)]
            e_tag: String,
            #[serde(default)]
            size: u64,
        }
        #[derive(Deserialize, Default)]
        #[serde(rename_all = "PascalCase")]
        struct ListPartsResult {
            #[serde(default)]
            is_truncated: bool,
            #[serde(default)]
            next_part_number_marker: Option<u32>,
            #[serde(default, rename = "Part")]
            part: Vec<PartXml>,
        }

        let parsed: ListPartsResult = quick_xml::de::from_str(body_str(body)?)?;
        Ok(ListPartsPage {
            upload_id: upload_id.to_string(),
            is_truncated: parsed.is_truncated,
            next_part_number_marker: parsed.next_part_number_marker,
            parts: parsed
                .part
                .into_iter()
                .map(|p| PartRecord {
                    part_number: p.part_number,
                    etag: strip_quotes(&p.e_tag),
                    size: p.size,
                })
                .collect(),
        })
    }
}

/// `<Error><Code/><Message/><Resource/><RequestId/></Error>`.
pub fn decode_error(status: u16, body: &[u8]) -> Error {
    #[derive(Deserialize, Default)]
    #[serde(rename_all = "PascalCase")]
    struct ErrorXml {
        #[serde(default)]
        code: String,
        #[serde(default)]
        message: String,
        #[serde(default)]
        resource: String,
        #[serde(default)]
        request_id: String,
    }

    let parsed: ErrorXml = std::str::from_utf8(body)
        .ok()
        .and_then(|s| quick_xml::de::from_str(s).ok())
        .unwrap_or_default();

    Error::ServerError {
        status,
        body: ServerErrorBody {
            code: parsed.code,
            message: parsed.message,
            resource: parsed.resource,
            request_id: parsed.request_id,
        },
    }
}

/// `<LocationConstraint>region</LocationConstraint>`; an empty or absent
/// body means `us-east-1`.
pub fn decode_location_constraint(body: &[u8]) -> String {
    let text = match std::str::from_utf8(body) {
        Ok(s) => s.trim(),
        Err(_) => return DEFAULT_REGION.to_string(),
    };
    if text.is_empty() {
        return DEFAULT_REGION.to_string();
    }

    let mut reader = quick_xml::Reader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Text(t)) => {
                let value = t.unescape().unwrap_or_default().trim().to_string();
                if !value.is_empty() {
                    return value;
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    DEFAULT_REGION.to_string()
}

/// `<InitiateMultipartUploadResult><UploadId/></InitiateMultipartUploadResult>`.
pub fn decode_initiate_multipart(body: &[u8]) -> Result<String> {
    #[derive(Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct InitiateMultipartUploadResult {
        upload_id: String,
    }
    let parsed: InitiateMultipartUploadResult = quick_xml::de::from_str(body_str(body)?)?;
    Ok(parsed.upload_id)
}

/// `<CompleteMultipartUploadResult><ETag/></CompleteMultipartUploadResult>`.
pub fn decode_complete_multipart(body: &[u8]) -> Result<String> {
    #[derive(Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct CompleteMultipartUploadResult {
        e_tag: String,
    }
    let parsed: CompleteMultipartUploadResult = quick_xml::de::from_str(body_str(body)?)?;
    Ok(strip_quotes(&parsed.e_tag))
}

/// `<AccessControlPolicy><AccessControlList><Grant>...`.
pub fn decode_acl(body: &[u8]) -> Result<Vec<Grant>> {
    #[derive(Deserialize)]
    struct GranteeXml {
        #[serde(default, rename = "URI")]
        uri: Option<String>,
        #[serde(default, rename = "ID")]
        id: Option<String>,
    }
    #[derive(Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct GrantXml {
        grantee: GranteeXml,
        permission: String,
    }
    #[derive(Deserialize, Default)]
    struct AccessControlListXml {
        #[serde(default, rename = "Grant")]
        grant: Vec<GrantXml>,
    }
    #[derive(Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct AccessControlPolicy {
        #[serde(default)]
        access_control_list: AccessControlListXml,
    }

    let parsed: AccessControlPolicy = quick_xml::de::from_str(body_str(body)?)?;
    Ok(parsed
        .access_control_list
        .grant
        .into_iter()
        .map(|g| Grant {
            grantee_uri: g.grantee.uri,
            grantee_id: g.grantee.id,
            permission: g.permission,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_error_document() {
        let xml = br#"<Error><Code>NoSuchBucket</Code><Message>missing</Message><Resource>/b</Resource><RequestId>abc</RequestId></Error>"#;
        let err = decode_error(404, xml);
        match err {
            Error::ServerError { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body.code, "NoSuchBucket");
                assert_eq!(body.request_id, "abc");
            }
            _ => panic!("expected ServerError"),
        }
    }

    #[test]
    fn location_constraint_empty_body_is_default_region() {
        assert_eq!(decode_location_constraint(b""), DEFAULT_REGION);
    }

    #[test]
    fn location_constraint_parses_region() {
        let xml = br#"<LocationConstraint xmlns="http://s3.amazonaws.com/doc/2006-03-01/">eu-west-1</LocationConstraint>"#;
        assert_eq!(decode_location_constraint(xml), "eu-west-1");
    }

    #[test]
    fn decodes_initiate_and_complete_multipart() {
        let init = br#"<InitiateMultipartUploadResult><Bucket>b</Bucket><Key>k</Key><UploadId>abc123</UploadId></InitiateMultipartUploadResult>"#;
        assert_eq!(decode_initiate_multipart(init).unwrap(), "abc123");

        let complete = br#"<CompleteMultipartUploadResult><Location>l</Location><Bucket>b</Bucket><Key>k</Key><ETag>"deadbeef"</ETag></CompleteMultipartUploadResult>"#;
        assert_eq!(decode_complete_multipart(complete).unwrap(), "deadbeef");
    }

    #[test]
    fn decodes_object_listing_page() {
        let xml = br#"<ListBucketResult>
            <IsTruncated>true</IsTruncated>
            <NextMarker>next.txt</NextMarker>
            <Contents><Key>a.txt</Key><LastModified>2023-01-01T00:00:00.000Z</LastModified><ETag>"abc"</ETag><Size>10</Size></Contents>
            <CommonPrefixes><Prefix>dir/</Prefix></CommonPrefixes>
        </ListBucketResult>"#;
        let page = XmlListingDecoder.decode_objects(xml).unwrap();
        assert!(page.is_truncated);
        assert_eq!(page.next_marker.as_deref(), Some("next.txt"));
        assert_eq!(page.contents.len(), 1);
        assert_eq!(page.contents[0].etag, "abc");
        assert_eq!(page.common_prefixes, vec!["dir/".to_string()]);
    }

    #[test]
    fn decodes_parts_listing() {
        let xml = br#"<ListPartsResult>
            <IsTruncated>false</IsTruncated>
            <Part><PartNumber>1</PartNumber><ETag>"aaa"</ETag><Size>5242880</Size></Part>
            <Part><PartNumber>2</PartNumber><ETag>"bbb"</ETag><Size>1024</Size></Part>
        </ListPartsResult>"#;
        let page = XmlListingDecoder.decode_parts(xml, "upload-1").unwrap();
        assert_eq!(page.upload_id, "upload-1");
        assert_eq!(page.parts.len(), 2);
        assert_eq!(page.parts[0].part_number, 1);
        assert_eq!(page.parts[1].etag, "bbb");
    }

    #[test]
    fn decodes_acl_grants() {
        let xml = br#"<AccessControlPolicy>
            <Owner><ID>owner</ID></Owner>
            <AccessControlList>
                <Grant><Grantee xsi:type="Group"><URI>http://acs.amazonaws.com/groups/global/AllUsers</URI></Grantee><Permission>READ</Permission></Grant>
                <Grant><Grantee xsi:type="CanonicalUser"><ID>owner</ID></Grantee><Permission>FULL_CONTROL</Permission></Grant>
            </AccessControlList>
        </AccessControlPolicy>"#;
        let grants = decode_acl(xml).unwrap();
        assert_eq!(grants.len(), 2);
        assert_eq!(grants[0].grantee_uri.as_deref(), Some("http://acs.amazonaws.com/groups/global/AllUsers"));
        assert_eq!(grants[1].grantee_id.as_deref(), Some("owner"));
    }
}

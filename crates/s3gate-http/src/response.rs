//! S3 Output struct to HTTP response serialization.
//!
//! This module provides the [`IntoS3Response`] trait and implementations for converting
//! typed S3 Output structs from `s3gate-model` into HTTP responses.
//!
//! Response categories:
//! - **XML body**: `ListBuckets`, `ListObjectsV2` and `GetBucketAcl`.
//! - **Header-only**: `HeadObject`.
//! - **Streaming body**: `GetObject`, 200 or 206 depending on `Content-Range`.

use bytes::Bytes;
use http::header::HeaderValue;
use s3gate_model::error::S3Error;
use s3gate_model::output::{
    GetBucketAclOutput, GetObjectOutput, HeadObjectOutput, ListBucketsOutput, ListObjectsV2Output,
};
use s3gate_xml::{S3Serialize, to_xml};

use crate::body::S3ResponseBody;

/// Content type of every XML document the gateway returns.
pub const XML_CONTENT_TYPE: &str = "application/xml";

/// Trait for converting an S3 output struct into an HTTP response.
pub trait IntoS3Response {
    /// Convert this output into an HTTP response.
    ///
    /// # Errors
    ///
    /// Returns an `S3Error` if the response cannot be constructed (e.g. XML
    /// serialization fails).
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error>;
}

// ---------------------------------------------------------------------------
// Helper functions for building responses
// ---------------------------------------------------------------------------

/// Set an optional header on a response builder if the value is `Some`.
fn set_optional_header(
    builder: http::response::Builder,
    name: &str,
    value: Option<&str>,
) -> http::response::Builder {
    if let Some(v) = value {
        if let Ok(hv) = HeaderValue::from_str(v) {
            return builder.header(name, hv);
        }
    }
    builder
}

/// Set an optional integer header.
fn set_optional_int_header(
    builder: http::response::Builder,
    name: &str,
    value: Option<i64>,
) -> http::response::Builder {
    if let Some(v) = value {
        return builder.header(name, v);
    }
    builder
}

/// Set an optional HTTP date header from a `DateTime<Utc>`.
fn set_optional_timestamp_header(
    builder: http::response::Builder,
    name: &str,
    value: Option<&chrono::DateTime<chrono::Utc>>,
) -> http::response::Builder {
    if let Some(v) = value {
        let formatted = v.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        if let Ok(hv) = HeaderValue::from_str(&formatted) {
            return builder.header(name, hv);
        }
    }
    builder
}

/// Build a response from a builder, converting build errors to `S3Error`.
fn build_response(
    builder: http::response::Builder,
    body: S3ResponseBody,
) -> Result<http::Response<S3ResponseBody>, S3Error> {
    builder
        .body(body)
        .map_err(|e| S3Error::internal_error(format!("failed to build HTTP response: {e}")))
}

/// Render `value` as an XML document under `root` and wrap it in a 200 response.
fn xml_response<T: S3Serialize>(
    root: &str,
    value: &T,
) -> Result<http::Response<S3ResponseBody>, S3Error> {
    let xml = to_xml(root, value)
        .map_err(|e| S3Error::internal_error(format!("failed to serialize {root}: {e}")))?;
    let builder = http::Response::builder()
        .status(http::StatusCode::OK)
        .header("Content-Type", XML_CONTENT_TYPE);
    build_response(builder, S3ResponseBody::from_xml(xml))
}

/// Apply the object metadata headers shared by `GetObject` and `HeadObject`.
fn set_object_headers(
    mut builder: http::response::Builder,
    head: &HeadObjectOutput,
) -> http::response::Builder {
    builder = set_optional_header(builder, "Accept-Ranges", head.accept_ranges.as_deref());
    builder = set_optional_header(
        builder,
        "Content-Disposition",
        head.content_disposition.as_deref(),
    );
    builder = set_optional_int_header(builder, "Content-Length", head.content_length);
    builder = set_optional_header(builder, "Content-Type", head.content_type.as_deref());
    builder = set_optional_header(builder, "ETag", head.e_tag.as_deref());
    set_optional_timestamp_header(builder, "Last-Modified", head.last_modified.as_ref())
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

impl IntoS3Response for ListBucketsOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        xml_response("ListAllMyBucketsResult", &self)
    }
}

impl IntoS3Response for ListObjectsV2Output {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        xml_response("ListBucketResult", &self)
    }
}

impl IntoS3Response for GetBucketAclOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        xml_response("AccessControlPolicy", &self)
    }
}

impl IntoS3Response for HeadObjectOutput {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let builder = http::Response::builder().status(http::StatusCode::OK);
        let builder = set_object_headers(builder, &self);
        build_response(builder, S3ResponseBody::empty())
    }
}

/// `GetObject` headers paired with the streamed content.
impl IntoS3Response for (GetObjectOutput, S3ResponseBody) {
    fn into_s3_response(self) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let (output, body) = self;
        let status = if output.content_range.is_some() {
            http::StatusCode::PARTIAL_CONTENT
        } else {
            http::StatusCode::OK
        };
        let builder = http::Response::builder().status(status);
        let builder = set_object_headers(builder, &output.head);
        let builder = set_optional_header(builder, "Content-Range", output.content_range.as_deref());
        build_response(builder, body)
    }
}

// --- S3Error to HTTP response ---

/// Convert an S3Error into an HTTP error response with an XML body.
///
/// Extra headers carried by the error (`Content-Range` on 416, `Allow` on 405) are
/// copied onto the response.
#[must_use]
pub fn error_to_response(err: &S3Error, request_id: &str) -> http::Response<S3ResponseBody> {
    let xml_bytes = s3gate_xml::error_to_xml(err, request_id);

    let mut builder = http::Response::builder()
        .status(err.status_code)
        .header("Content-Type", XML_CONTENT_TYPE);
    for (name, value) in &err.headers {
        if let Ok(hv) = HeaderValue::from_str(value) {
            builder = builder.header(*name, hv);
        }
    }

    builder
        .body(S3ResponseBody::from_bytes(Bytes::from(xml_bytes)))
        .unwrap_or_else(|_| {
            let mut fallback = http::Response::new(S3ResponseBody::empty());
            *fallback.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use s3gate_model::error::S3ErrorCode;
    use s3gate_model::types::{Bucket, CommonPrefix, Object, Owner};

    use super::*;

    fn header<'a>(resp: &'a http::Response<S3ResponseBody>, name: &str) -> Option<&'a str> {
        resp.headers().get(name).and_then(|v| v.to_str().ok())
    }

    fn body_text(resp: http::Response<S3ResponseBody>) -> String {
        let bytes = tokio_test::block_on(resp.into_body().collect())
            .expect("collect")
            .to_bytes();
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    fn head() -> HeadObjectOutput {
        HeadObjectOutput {
            accept_ranges: Some("bytes".to_owned()),
            content_length: Some(100),
            content_type: Some("image/jpeg".to_owned()),
            e_tag: Some("\"abc\"".to_owned()),
            last_modified: chrono::DateTime::from_timestamp(1_700_000_000, 0),
            ..Default::default()
        }
    }

    #[test]
    fn test_should_create_list_buckets_response() {
        let output = ListBucketsOutput {
            buckets: vec![Bucket {
                creation_date: chrono::DateTime::from_timestamp(0, 0),
                name: Some("photos".to_owned()),
            }],
            owner: Some(Owner {
                display_name: Some("unknown".to_owned()),
                id: Some("1".to_owned()),
            }),
        };
        let resp = output.into_s3_response().expect("should build response");
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(header(&resp, "Content-Type"), Some("application/xml"));
        let xml = body_text(resp);
        assert!(xml.contains("<ListAllMyBucketsResult"));
        assert!(xml.contains("<Name>photos</Name>"));
    }

    #[test]
    fn test_should_create_list_objects_v2_response() {
        let output = ListObjectsV2Output {
            name: Some("photos".to_owned()),
            contents: vec![Object {
                key: Some("a.jpg".to_owned()),
                size: Some(5),
                ..Default::default()
            }],
            common_prefixes: vec![CommonPrefix {
                prefix: Some("2024/".to_owned()),
            }],
            is_truncated: Some(false),
            ..Default::default()
        };
        let xml = body_text(output.into_s3_response().expect("should build response"));
        assert!(xml.contains("<ListBucketResult"));
        assert!(xml.contains("<Key>a.jpg</Key>"));
        assert!(xml.contains("<Prefix>2024/</Prefix>"));
    }

    #[test]
    fn test_should_create_head_object_response() {
        let resp = head().into_s3_response().expect("should build response");
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(header(&resp, "Content-Length"), Some("100"));
        assert_eq!(header(&resp, "ETag"), Some("\"abc\""));
        assert_eq!(header(&resp, "Accept-Ranges"), Some("bytes"));
        assert_eq!(
            header(&resp, "Last-Modified"),
            Some("Tue, 14 Nov 2023 22:13:20 GMT")
        );
    }

    #[test]
    fn test_should_create_partial_get_object_response() {
        let output = GetObjectOutput {
            head: HeadObjectOutput {
                content_length: Some(10),
                ..head()
            },
            content_range: Some("bytes 0-9/100".to_owned()),
        };
        let resp = (output, S3ResponseBody::from_string("0123456789"))
            .into_s3_response()
            .expect("should build response");
        assert_eq!(resp.status(), http::StatusCode::PARTIAL_CONTENT);
        assert_eq!(header(&resp, "Content-Range"), Some("bytes 0-9/100"));
        assert_eq!(header(&resp, "Content-Length"), Some("10"));
        assert_eq!(body_text(resp), "0123456789");
    }

    #[test]
    fn test_should_create_error_response_with_extra_headers() {
        let err = S3Error::invalid_range("bytes=200-", 100);
        let resp = error_to_response(&err, "req-123");
        assert_eq!(resp.status(), http::StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(header(&resp, "Content-Range"), Some("bytes */100"));
        assert_eq!(header(&resp, "Content-Type"), Some("application/xml"));
        let xml = body_text(resp);
        assert!(xml.contains("<Code>InvalidRange</Code>"));
        assert!(xml.contains("<RequestId>req-123</RequestId>"));
    }

    #[test]
    fn test_should_create_not_found_error_response() {
        let err = S3Error::no_such_bucket("missing");
        let resp = error_to_response(&err, "req-1");
        assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);
        assert!(body_text(resp).contains(S3ErrorCode::NoSuchBucket.as_str()));
    }
}

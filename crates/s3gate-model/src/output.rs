//! Operation outputs handed to the XML and header marshalers.

use crate::types::{Bucket, CommonPrefix, EncodingType, Grant, Object, Owner};

/// S3 ListBucketsOutput.
#[derive(Debug, Clone, Default)]
pub struct ListBucketsOutput {
    pub buckets: Vec<Bucket>,
    pub owner: Option<Owner>,
}

/// S3 ListObjectsV2Output.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsV2Output {
    pub common_prefixes: Vec<CommonPrefix>,
    pub contents: Vec<Object>,
    pub continuation_token: Option<String>,
    pub delimiter: Option<String>,
    pub encoding_type: Option<EncodingType>,
    pub is_truncated: Option<bool>,
    pub key_count: Option<i32>,
    pub max_keys: Option<i32>,
    pub name: Option<String>,
    pub next_continuation_token: Option<String>,
    pub prefix: Option<String>,
    pub start_after: Option<String>,
}

/// S3 GetBucketAclOutput.
#[derive(Debug, Clone, Default)]
pub struct GetBucketAclOutput {
    pub grants: Vec<Grant>,
    pub owner: Option<Owner>,
}

/// Headers shared by `GetObject` and `HeadObject` responses.
#[derive(Debug, Clone, Default)]
pub struct HeadObjectOutput {
    /// HTTP header: `accept-ranges`.
    pub accept_ranges: Option<String>,
    /// HTTP header: `Content-Disposition`.
    pub content_disposition: Option<String>,
    /// HTTP header: `Content-Length`.
    pub content_length: Option<i64>,
    /// HTTP header: `Content-Type`.
    pub content_type: Option<String>,
    /// HTTP header: `ETag`.
    pub e_tag: Option<String>,
    /// HTTP header: `Last-Modified`.
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

/// Headers of a `GetObject` response. The body travels separately as a stream.
#[derive(Debug, Clone, Default)]
pub struct GetObjectOutput {
    /// Headers shared with `HeadObject`.
    pub head: HeadObjectOutput,
    /// HTTP header: `Content-Range`. Present iff the response is partial.
    pub content_range: Option<String>,
}

//! Operation inputs, populated by the HTTP layer from the request URI and headers.

use crate::types::EncodingType;

/// S3 ListBucketsInput. The gateway takes no parameters for `GET /`.
#[derive(Debug, Clone, Default)]
pub struct ListBucketsInput {}

/// S3 ListObjectsV2Input.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsV2Input {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP query: `continuation-token`.
    pub continuation_token: Option<String>,
    /// HTTP query: `delimiter`.
    pub delimiter: Option<String>,
    /// HTTP query: `encoding-type`.
    pub encoding_type: Option<EncodingType>,
    /// HTTP query: `max-keys`.
    pub max_keys: Option<i32>,
    /// HTTP query: `prefix`.
    pub prefix: Option<String>,
    /// HTTP query: `start-after`.
    pub start_after: Option<String>,
}

/// S3 GetBucketAclInput.
#[derive(Debug, Clone, Default)]
pub struct GetBucketAclInput {
    /// HTTP label (URI path).
    pub bucket: String,
}

/// S3 GetObjectInput.
#[derive(Debug, Clone, Default)]
pub struct GetObjectInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP label (URI path).
    pub key: String,
    /// HTTP header: `Range`.
    pub range: Option<String>,
}

/// S3 HeadObjectInput.
#[derive(Debug, Clone, Default)]
pub struct HeadObjectInput {
    /// HTTP label (URI path).
    pub bucket: String,
    /// HTTP label (URI path).
    pub key: String,
}

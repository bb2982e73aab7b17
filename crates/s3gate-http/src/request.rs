//! HTTP request to S3 Input struct deserialization.
//!
//! This module provides the [`FromS3Request`] trait and implementations for converting
//! raw HTTP request parts (headers, query parameters, URI labels) into typed S3 Input
//! structs defined in `s3gate-model`. The gateway serves GET and HEAD only, so request
//! bodies are never read.

use std::num::IntErrorKind;

use s3gate_model::error::{S3Error, S3ErrorCode};
use s3gate_model::input::{
    GetBucketAclInput, GetObjectInput, HeadObjectInput, ListBucketsInput, ListObjectsV2Input,
};
use s3gate_model::types::EncodingType;

/// Trait for extracting an S3 input struct from HTTP request components.
pub trait FromS3Request: Sized {
    /// Extract the input from HTTP request parts.
    ///
    /// # Arguments
    /// - `parts` - The HTTP request head (method, URI, headers).
    /// - `bucket` - The resolved bucket name, if any.
    /// - `key` - The resolved object key, if any.
    /// - `query_params` - Parsed query parameters from the URI.
    ///
    /// # Errors
    ///
    /// Returns an `S3Error` if required fields are missing or field values
    /// cannot be parsed.
    fn from_s3_request(
        parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        query_params: &[(String, String)],
    ) -> Result<Self, S3Error>;
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Extract a header value as a string.
pub fn header_str(parts: &http::request::Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned)
}

/// Get a query parameter value by name.
#[must_use]
pub fn query_param(params: &[(String, String)], name: &str) -> Option<String> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
}

/// Parse `max-keys`. Integers outside the `i32` range saturate instead of failing, so an
/// oversized value is clamped like any other and a hugely negative one is still negative.
fn parse_max_keys(params: &[(String, String)]) -> Result<Option<i32>, S3Error> {
    let Some(value) = query_param(params, "max-keys") else {
        return Ok(None);
    };
    match value.trim().parse::<i32>() {
        Ok(n) => Ok(Some(n)),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => Ok(Some(i32::MAX)),
        Err(e) if *e.kind() == IntErrorKind::NegOverflow => Ok(Some(i32::MIN)),
        Err(_) => Err(S3Error::invalid_argument(format!(
            "Invalid value for max-keys: {value}"
        ))),
    }
}

/// Require a bucket name from the routing context, returning an error if absent.
fn require_bucket(bucket: Option<&str>) -> Result<String, S3Error> {
    bucket.map(ToOwned::to_owned).ok_or_else(|| {
        S3Error::with_message(S3ErrorCode::InvalidRequest, "Bucket name is required")
    })
}

/// Require an object key from the routing context, returning an error if absent.
fn require_key(key: Option<&str>) -> Result<String, S3Error> {
    key.map(ToOwned::to_owned)
        .ok_or_else(|| S3Error::with_message(S3ErrorCode::InvalidRequest, "Object key is required"))
}

fn parse_encoding_type(params: &[(String, String)]) -> Result<Option<EncodingType>, S3Error> {
    query_param(params, "encoding-type")
        .filter(|v| !v.is_empty())
        .map(|v| {
            EncodingType::parse(&v)
                .ok_or_else(|| S3Error::invalid_argument(format!("Invalid Encoding Method specified in Request: {v}")))
        })
        .transpose()
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

impl FromS3Request for ListBucketsInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        _bucket: Option<&str>,
        _key: Option<&str>,
        _query_params: &[(String, String)],
    ) -> Result<Self, S3Error> {
        Ok(Self {})
    }
}

impl FromS3Request for ListObjectsV2Input {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        _key: Option<&str>,
        query_params: &[(String, String)],
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            continuation_token: query_param(query_params, "continuation-token")
                .filter(|t| !t.is_empty()),
            delimiter: query_param(query_params, "delimiter"),
            encoding_type: parse_encoding_type(query_params)?,
            max_keys: parse_max_keys(query_params)?,
            prefix: query_param(query_params, "prefix"),
            start_after: query_param(query_params, "start-after").filter(|s| !s.is_empty()),
        })
    }
}

impl FromS3Request for GetBucketAclInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        _key: Option<&str>,
        _query_params: &[(String, String)],
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
        })
    }
}

impl FromS3Request for GetObjectInput {
    fn from_s3_request(
        parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        _query_params: &[(String, String)],
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            key: require_key(key)?,
            range: header_str(parts, "range"),
        })
    }
}

impl FromS3Request for HeadObjectInput {
    fn from_s3_request(
        _parts: &http::request::Parts,
        bucket: Option<&str>,
        key: Option<&str>,
        _query_params: &[(String, String)],
    ) -> Result<Self, S3Error> {
        Ok(Self {
            bucket: require_bucket(bucket)?,
            key: require_key(key)?,
        })
    }
}

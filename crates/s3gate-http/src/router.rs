//! S3 request routing: bucket addressing and operation identification.
//!
//! The [`S3Router`] maps incoming HTTP requests to S3 operations by examining:
//!
//! - The HTTP method (only GET and HEAD are served)
//! - Whether a bucket name is present (from the Host header or the path)
//! - Whether an object key is present (from the URI path)
//! - Query parameters that select a sub-resource (`?acl`, `?list-type=2`)
//!
//! With virtual hosting, `photos.s3.example.org` names the `photos` bucket and the whole
//! path is the key. The bare base host and `www.{base}` fall back to path-style
//! addressing, so `GET /` on them lists buckets. Any other host is rejected.

use http::Method;
use percent_encoding::percent_decode_str;
use s3gate_model::error::{S3Error, S3ErrorCode};
use s3gate_model::operations::S3Operation;

/// Methods the gateway answers. Reported in the `Allow` header of 405 responses.
pub const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";

/// Configuration for S3 request routing.
#[derive(Debug, Clone)]
pub struct S3Router {
    /// The public host for virtual-hosted-style requests (e.g. `s3.example.org`).
    pub base_host: Option<String>,
    /// Whether to resolve the bucket from the Host subdomain.
    pub virtual_hosting: bool,
}

/// The result of routing an HTTP request to an S3 operation.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    /// The resolved bucket name, if any.
    pub bucket: Option<String>,
    /// The resolved object key, if any. Never empty.
    pub key: Option<String>,
    /// The identified S3 operation.
    pub operation: S3Operation,
    /// Parsed query parameters from the request URI.
    pub query_params: Vec<(String, String)>,
}

impl RoutingContext {
    /// The value of a query parameter.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        query_value(&self.query_params, name)
    }

    /// The bucket name, or an empty string at the service level.
    #[must_use]
    pub fn bucket_name(&self) -> &str {
        self.bucket.as_deref().unwrap_or_default()
    }
}

/// Where a Host header points.
#[derive(Debug, PartialEq, Eq)]
enum HostMatch {
    /// The base host itself or `www.{base}`: path-style addressing applies.
    Base,
    /// A bucket subdomain.
    Bucket(String),
}

impl S3Router {
    /// Create a router. `base_host` is required for virtual hosting to match anything.
    #[must_use]
    pub fn new(base_host: Option<String>, virtual_hosting: bool) -> Self {
        Self {
            base_host: base_host.map(|h| h.to_ascii_lowercase()),
            virtual_hosting,
        }
    }

    /// Resolve an HTTP request to a routing context.
    ///
    /// # Errors
    ///
    /// `MethodNotAllowed` for write methods, `InvalidRequest` for a Host that does not
    /// belong to the base host under virtual hosting, `InvalidArgument` for an unsupported
    /// `list-type`.
    pub fn resolve<B>(&self, req: &http::Request<B>) -> Result<RoutingContext, S3Error> {
        let method = req.method();
        let uri = req.uri();
        let query_params = parse_query_params(uri.query().unwrap_or(""));

        if *method != Method::GET && *method != Method::HEAD {
            return Err(S3Error::method_not_allowed(method.as_str())
                .with_header("Allow", ALLOWED_METHODS));
        }

        let path = uri.path();
        let (bucket, key) = match self.match_host(req)? {
            Some(HostMatch::Bucket(bucket)) => {
                let raw_key = path.strip_prefix('/').unwrap_or(path);
                let key = (!raw_key.is_empty()).then(|| decode_uri_component(raw_key));
                (Some(bucket), key)
            }
            Some(HostMatch::Base) | None => parse_path(path),
        };

        let operation = identify_operation(method, bucket.as_ref(), key.as_ref(), &query_params)?;

        Ok(RoutingContext {
            bucket,
            key,
            operation,
            query_params,
        })
    }

    fn match_host<B>(&self, req: &http::Request<B>) -> Result<Option<HostMatch>, S3Error> {
        if !self.virtual_hosting {
            return Ok(None);
        }
        let Some(base) = self.base_host.as_deref() else {
            return Ok(None);
        };
        let host = request_host(req).ok_or_else(|| {
            S3Error::with_message(S3ErrorCode::InvalidRequest, "Missing Host header")
        })?;
        match_virtual_host(&host, base).map(Some).ok_or_else(|| {
            S3Error::with_message(
                S3ErrorCode::InvalidRequest,
                format!("Host {host} does not match {base}"),
            )
        })
    }
}

/// Host of the request without port, lowercased. HTTP/2 requests carry it in the URI.
fn request_host<B>(req: &http::Request<B>) -> Option<String> {
    let raw = req
        .headers()
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().host())?;
    Some(strip_port(raw).to_ascii_lowercase())
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.split(':').next().unwrap_or(host)
}

/// Match `host` against `base`. `None` when the host belongs elsewhere.
fn match_virtual_host(host: &str, base: &str) -> Option<HostMatch> {
    if host == base || host.strip_prefix("www.") == Some(base) {
        return Some(HostMatch::Base);
    }
    let bucket = host.strip_suffix(base)?.strip_suffix('.')?;
    (!bucket.is_empty()).then(|| HostMatch::Bucket(bucket.to_owned()))
}

/// Parse the URI path into an optional bucket and optional key.
///
/// Path format: `/{bucket}`, `/{bucket}/` or `/{bucket}/{key...}`.
fn parse_path(path: &str) -> (Option<String>, Option<String>) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return (None, None);
    }

    match trimmed.split_once('/') {
        Some((bucket, key_raw)) => {
            let key = (!key_raw.is_empty()).then(|| decode_uri_component(key_raw));
            (Some(decode_uri_component(bucket)), key)
        }
        None => (Some(decode_uri_component(trimmed)), None),
    }
}

/// Decode a percent-encoded URI path component.
fn decode_uri_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Decode a query component: `+` is a space, then percent-decoding applies.
fn decode_query_component(s: &str) -> String {
    decode_uri_component(&s.replace('+', " "))
}

/// Parse a query string into key-value pairs.
fn parse_query_params(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode_query_component(key), decode_query_component(value)),
            None => (decode_query_component(pair), String::new()),
        })
        .collect()
}

fn query_has_key(params: &[(String, String)], key: &str) -> bool {
    params.iter().any(|(k, _)| k == key)
}

fn query_value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Identify the S3 operation from the method, path structure and query params.
fn identify_operation(
    method: &Method,
    bucket: Option<&String>,
    key: Option<&String>,
    params: &[(String, String)],
) -> Result<S3Operation, S3Error> {
    match (method, bucket.is_some(), key.is_some()) {
        (&Method::GET, false, false) => Ok(S3Operation::ListBuckets),
        (&Method::GET, true, false) => identify_bucket_get(params),
        (&Method::GET, true, true) => Ok(S3Operation::GetObject),
        (&Method::HEAD, true, true) => Ok(S3Operation::HeadObject),
        (&Method::HEAD, true, false) => Err(S3Error::not_implemented("HeadBucket")),
        (_, false, true) => Err(S3Error::with_message(
            S3ErrorCode::InvalidRequest,
            "Object key specified without bucket",
        )),
        (method, false, false) => Err(S3Error::method_not_allowed(method.as_str())
            .with_header("Allow", "GET, OPTIONS")),
        (method, ..) => Err(S3Error::method_not_allowed(method.as_str())
            .with_header("Allow", ALLOWED_METHODS)),
    }
}

/// Identify a GET operation on a bucket.
fn identify_bucket_get(params: &[(String, String)]) -> Result<S3Operation, S3Error> {
    if let Some(list_type) = query_value(params, "list-type") {
        return if list_type == "2" {
            Ok(S3Operation::ListObjectsV2)
        } else {
            Err(S3Error::invalid_argument(format!(
                "Unsupported list-type: {list_type}"
            )))
        };
    }
    if query_has_key(params, "acl") {
        return Ok(S3Operation::GetBucketAcl);
    }
    Ok(S3Operation::BrowseBucket)
}

//! Gateway error taxonomy.
//!
//! [`GatewayError`] is what storage clients, the listing engine and the streaming engine
//! return. At the HTTP boundary it is converted into an [`S3Error`] carrying the S3 error
//! code, status and any extra headers.
//!
//! ```
//! use s3gate_core::error::GatewayError;
//! use s3gate_model::S3ErrorCode;
//!
//! let err = GatewayError::NoSuchKey { key: "a/b.txt".to_owned() };
//! assert_eq!(err.into_s3_error().code, S3ErrorCode::NoSuchKey);
//! ```

use s3gate_model::{S3Error, S3ErrorCode};

/// Errors produced while serving a request.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No target with this name is configured.
    #[error("The specified bucket does not exist: {bucket}")]
    NoSuchBucket {
        /// The requested bucket name.
        bucket: String,
    },

    /// The key does not exist, is a directory, or lies outside the target prefix.
    #[error("The specified key does not exist: {key}")]
    NoSuchKey {
        /// The requested key, relative to the target.
        key: String,
    },

    /// The `Range` header cannot be satisfied for an object of `size` bytes.
    #[error("The requested range is not satisfiable: {range} (size {size})")]
    InvalidRange {
        /// The raw `Range` header value.
        range: String,
        /// The object size.
        size: u64,
    },

    /// The remote backend for a target could not be reached or refused the request.
    #[error("backend for target {target} is unavailable: {message}")]
    BackendUnavailable {
        /// The target name.
        target: String,
        /// What went wrong.
        message: String,
    },

    /// A target definition cannot be turned into a working client.
    #[error("target {target} is misconfigured: {message}")]
    Configuration {
        /// The target name.
        target: String,
        /// What is wrong with it.
        message: String,
    },

    /// A request parameter is invalid.
    #[error("{0}")]
    InvalidArgument(String),

    /// A filesystem error not covered by the variants above.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other failure.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    /// Whether this error means the addressed object is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoSuchBucket { .. } | Self::NoSuchKey { .. })
    }

    /// Convert into the wire-level [`S3Error`].
    #[must_use]
    pub fn into_s3_error(self) -> S3Error {
        match self {
            Self::NoSuchBucket { bucket } => S3Error::no_such_bucket(bucket),
            Self::NoSuchKey { key } => S3Error::no_such_key(key),
            Self::InvalidRange { range, size } => S3Error::invalid_range(range, size),
            Self::BackendUnavailable { target, message } => {
                S3Error::service_unavailable(target, message)
            }
            Self::InvalidArgument(message) => S3Error::invalid_argument(message),
            Self::Configuration { target, message } => {
                S3Error::with_message(S3ErrorCode::InternalError, message).with_resource(target)
            }
            Self::Io(e) => S3Error::internal_error(e.to_string()),
            Self::Internal(e) => S3Error::internal_error(format!("{e:#}")),
        }
    }
}

impl From<GatewayError> for S3Error {
    fn from(err: GatewayError) -> Self {
        err.into_s3_error()
    }
}

/// Convenience result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

//! Streaming engine: `Range` validation and the tracked object body.
//!
//! Object bytes are never buffered in full. A storage client produces a lazy
//! [`ByteStream`](crate::storage::ByteStream); [`ObjectBody`] wraps it for the HTTP layer,
//! converting errors to [`std::io::Error`] and recording how the transfer ended:
//!
//! ```text
//! Streaming --(inner stream ends)------> Completed
//!           --(inner stream errors)----> BackendError
//!           --(body dropped early)-----> Cancelled
//! ```
//!
//! Dropping the body drops the inner stream, which releases the open file handle or the
//! pooled backend connection it owns. No further chunks are pulled after that.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use tracing::{debug, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::storage::ByteStream;

// ---------------------------------------------------------------------------
// Range
// ---------------------------------------------------------------------------

/// A validated, inclusive byte span of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte served.
    pub start: u64,
    /// Last byte served (inclusive).
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes in the span.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false; a validated range holds at least one byte.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `Content-Range` header value for an object of `size` bytes.
    #[must_use]
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{size}", self.start, self.end)
    }
}

/// Parse and validate a `Range` header against an object of `size` bytes.
///
/// Supports `bytes=a-b` (end clamped to the object), `bytes=a-` and `bytes=-n` (suffix,
/// clamped to the whole object). Only the first of several comma-separated ranges is
/// honoured. Anything malformed or unsatisfiable is [`GatewayError::InvalidRange`].
///
/// # Examples
///
/// ```
/// use s3gate_core::streaming::{ByteRange, parse_range};
///
/// assert_eq!(parse_range("bytes=0-99", 150).unwrap(), ByteRange { start: 0, end: 99 });
/// assert_eq!(parse_range("bytes=-500", 150).unwrap(), ByteRange { start: 0, end: 149 });
/// assert!(parse_range("bytes=150-160", 150).is_err());
/// ```
pub fn parse_range(header: &str, size: u64) -> GatewayResult<ByteRange> {
    let invalid = || GatewayError::InvalidRange {
        range: header.to_owned(),
        size,
    };

    let spec = header.trim().strip_prefix("bytes=").ok_or_else(invalid)?;
    let first = spec.split(',').next().unwrap_or_default().trim();
    let (start, end) = first.split_once('-').ok_or_else(invalid)?;
    let (start, end) = (start.trim(), end.trim());

    if size == 0 {
        return Err(invalid());
    }
    let last = size - 1;

    let range = match (start.is_empty(), end.is_empty()) {
        // bytes=-n
        (true, false) => {
            let n: u64 = end.parse().map_err(|_| invalid())?;
            if n == 0 {
                return Err(invalid());
            }
            ByteRange {
                start: size.saturating_sub(n),
                end: last,
            }
        }
        // bytes=a-
        (false, true) => {
            let start: u64 = start.parse().map_err(|_| invalid())?;
            ByteRange { start, end: last }
        }
        // bytes=a-b
        (false, false) => {
            let start: u64 = start.parse().map_err(|_| invalid())?;
            let end: u64 = end.parse().map_err(|_| invalid())?;
            if start > end {
                return Err(invalid());
            }
            ByteRange {
                start,
                end: end.min(last),
            }
        }
        (true, true) => return Err(invalid()),
    };

    if range.start >= size {
        return Err(invalid());
    }
    Ok(range)
}

// ---------------------------------------------------------------------------
// ObjectBody
// ---------------------------------------------------------------------------

/// How a body transfer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Every byte was delivered.
    Completed,
    /// The receiver went away before the end.
    Cancelled,
    /// The backend failed mid-stream.
    BackendError,
}

impl StreamOutcome {
    /// Lowercase label used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::BackendError => "backend_error",
        }
    }
}

struct TransferLog {
    target: String,
    key: String,
    expected: u64,
    sent: u64,
    outcome: Option<StreamOutcome>,
}

impl TransferLog {
    fn finish(&mut self, outcome: StreamOutcome) {
        self.outcome = Some(outcome);
        match outcome {
            StreamOutcome::BackendError => warn!(
                target_name = %self.target,
                key = %self.key,
                sent = self.sent,
                expected = self.expected,
                outcome = outcome.as_str(),
                "object stream ended"
            ),
            _ => debug!(
                target_name = %self.target,
                key = %self.key,
                sent = self.sent,
                expected = self.expected,
                outcome = outcome.as_str(),
                "object stream ended"
            ),
        }
    }
}

impl Drop for TransferLog {
    fn drop(&mut self) {
        if self.outcome.is_none() {
            self.finish(StreamOutcome::Cancelled);
        }
    }
}

pin_project! {
    /// Response body for GET object. Yields chunks as the backend produces them.
    pub struct ObjectBody {
        #[pin]
        inner: ByteStream,
        log: TransferLog,
    }
}

impl fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectBody")
            .field("target", &self.log.target)
            .field("key", &self.log.key)
            .field("expected", &self.log.expected)
            .field("sent", &self.log.sent)
            .finish_non_exhaustive()
    }
}

impl ObjectBody {
    /// Wrap a backend stream expected to deliver `expected` bytes.
    #[must_use]
    pub fn new(
        inner: ByteStream,
        target: impl Into<String>,
        key: impl Into<String>,
        expected: u64,
    ) -> Self {
        Self {
            inner,
            log: TransferLog {
                target: target.into(),
                key: key.into(),
                expected,
                sent: 0,
                outcome: None,
            },
        }
    }

    /// How the transfer ended, or `None` while it is still running.
    #[must_use]
    pub fn outcome(&self) -> Option<StreamOutcome> {
        self.log.outcome
    }

    /// Bytes delivered so far.
    #[must_use]
    pub fn bytes_sent(&self) -> u64 {
        self.log.sent
    }
}

impl Stream for ObjectBody {
    type Item = Result<Bytes, std::io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if this.log.outcome.is_some() {
            return Poll::Ready(None);
        }
        match ready!(this.inner.poll_next(cx)) {
            Some(Ok(chunk)) => {
                this.log.sent += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(e)) => {
                this.log.finish(StreamOutcome::BackendError);
                Poll::Ready(Some(Err(std::io::Error::other(e))))
            }
            None => {
                this.log.finish(StreamOutcome::Completed);
                Poll::Ready(None)
            }
        }
    }
}

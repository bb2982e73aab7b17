//! S3 response body types supporting buffered, streaming and empty modes.
//!
//! - **Buffered**: XML documents, error bodies and other small payloads.
//! - **Streaming**: `GetObject` bytes, pulled from the backend as hyper asks for them.
//! - **Empty**: HEAD responses and preflights.
//!
//! A streaming body is polled only when the connection can take more data, so a slow
//! client slows the backend read down instead of growing a buffer. Dropping the body (on
//! client disconnect) drops the underlying stream.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use http_body_util::Full;

/// A chunked byte stream with an optional known length.
pub struct StreamingBody {
    stream: BoxStream<'static, Result<Bytes, std::io::Error>>,
    remaining: Option<u64>,
    done: bool,
}

impl fmt::Debug for StreamingBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingBody")
            .field("remaining", &self.remaining)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

/// S3 response body.
///
/// Implements [`http_body::Body`] so it can be used directly with hyper responses.
#[derive(Debug, Default)]
pub enum S3ResponseBody {
    /// Buffered body for small responses.
    Buffered(Full<Bytes>),
    /// Streamed object content.
    Streaming(StreamingBody),
    /// No content.
    #[default]
    Empty,
}

impl S3ResponseBody {
    /// Create a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Create a buffered body from a UTF-8 string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::Buffered(Full::new(Bytes::from(s.into())))
    }

    /// Create a buffered body from an XML byte vector.
    #[must_use]
    pub fn from_xml(xml: Vec<u8>) -> Self {
        Self::Buffered(Full::new(Bytes::from(xml)))
    }

    /// Create a streaming body. `length` is the exact number of bytes the stream will
    /// yield, when known.
    pub fn from_stream<S>(stream: S, length: Option<u64>) -> Self
    where
        S: futures::Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static,
    {
        Self::Streaming(StreamingBody {
            stream: stream.boxed(),
            remaining: length,
            done: false,
        })
    }
}

impl http_body::Body for S3ResponseBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Streaming(body) => {
                if body.done {
                    return Poll::Ready(None);
                }
                match body.stream.poll_next_unpin(cx) {
                    Poll::Ready(Some(Ok(chunk))) => {
                        if let Some(remaining) = body.remaining.as_mut() {
                            *remaining = remaining.saturating_sub(chunk.len() as u64);
                        }
                        Poll::Ready(Some(Ok(http_body::Frame::data(chunk))))
                    }
                    Poll::Ready(Some(Err(e))) => {
                        body.done = true;
                        Poll::Ready(Some(Err(e)))
                    }
                    Poll::Ready(None) => {
                        body.done = true;
                        Poll::Ready(None)
                    }
                    Poll::Pending => Poll::Pending,
                }
            }
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Streaming(body) => body.done,
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Streaming(body) => body
                .remaining
                .map_or_else(http_body::SizeHint::default, http_body::SizeHint::with_exact),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}

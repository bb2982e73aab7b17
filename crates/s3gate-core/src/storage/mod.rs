//! Storage clients: one read-only object-store view per target.
//!
//! Every backend implements [`StorageClient`]. A backend only has to provide three
//! primitives:
//!
//! - [`head`](StorageClient::head): metadata for one key;
//! - [`scan`](StorageClient::scan): a lazy, lexicographically ordered stream of [`Entry`]
//!   values under a prefix;
//! - [`read`](StorageClient::read): a lazy byte stream for a whole object or a validated
//!   [`ByteRange`].
//!
//! Listing pagination and `Range` validation are built on top of these in the provided
//! [`list`](StorageClient::list) and [`get`](StorageClient::get) methods, so they behave the
//! same for every backend.

pub mod file;
pub mod remote;
pub mod scoped;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::config::{ClientKind, EtagMode};
use crate::error::GatewayResult;
use crate::listing::{self, ListPage, ListParams};
use crate::streaming::{ByteRange, parse_range};

pub use file::FileClient;
pub use remote::RemoteClient;
pub use scoped::ScopedClient;

/// Lazy stream of object bytes.
pub type ByteStream = BoxStream<'static, GatewayResult<Bytes>>;

/// Lazy stream of listing entries, ordered by key.
pub type EntryStream = BoxStream<'static, GatewayResult<Entry>>;

/// Metadata of one object. `key` is relative to the client that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageObject {
    /// Object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Quoted ETag.
    pub etag: String,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
}

/// One item of a scan: an object, or a common prefix a backend already folded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A leaf object.
    Object(StorageObject),
    /// A folded common prefix, ending with the delimiter.
    Prefix(String),
}

impl Entry {
    /// The key or prefix used for ordering.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Object(object) => &object.key,
            Self::Prefix(prefix) => prefix,
        }
    }
}

/// Result of [`StorageClient::get`]: metadata resolved before the body is opened.
pub struct ObjectRead {
    /// Object metadata.
    pub object: StorageObject,
    /// The validated span being served, when the request carried a `Range`.
    pub range: Option<ByteRange>,
    /// The object bytes.
    pub body: ByteStream,
}

impl fmt::Debug for ObjectRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRead")
            .field("object", &self.object)
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}

impl ObjectRead {
    /// Number of bytes the body will deliver.
    #[must_use]
    pub fn content_length(&self) -> u64 {
        self.range.map_or(self.object.size, |r| r.len())
    }
}

/// Uniform read-only object-store operations over one target.
#[async_trait]
pub trait StorageClient: Send + Sync + fmt::Debug {
    /// Which backend family this client belongs to.
    fn kind(&self) -> ClientKind;

    /// ETag mode in effect, for backends that compute their own ETags.
    fn etag_mode(&self) -> Option<EtagMode> {
        None
    }

    /// Metadata for `key`. Missing keys and directories are `NoSuchKey`.
    async fn head(&self, key: &str) -> GatewayResult<StorageObject>;

    /// Stream entries under `prefix` in strictly increasing key order.
    ///
    /// With `delimiter`, a backend may fold keys into [`Entry::Prefix`] values; it may also
    /// return unfolded objects and leave folding to the listing engine. `start_after` is a
    /// pruning hint: entries at or before it may be skipped.
    async fn scan(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        start_after: Option<&str>,
    ) -> GatewayResult<EntryStream>;

    /// Open a byte stream over `object`, restricted to `range` when given.
    async fn read(&self, object: &StorageObject, range: Option<ByteRange>)
    -> GatewayResult<ByteStream>;

    /// One page of a ListObjectsV2-style listing.
    async fn list(&self, params: &ListParams) -> GatewayResult<ListPage> {
        listing::list(self, params).await
    }

    /// Resolve metadata, validate `range` against it, then open the body.
    async fn get(&self, key: &str, range: Option<&str>) -> GatewayResult<ObjectRead> {
        let object = self.head(key).await?;
        let range = range
            .map(|header| parse_range(header, object.size))
            .transpose()?;
        let body = self.read(&object, range).await?;
        Ok(ObjectRead {
            object,
            range,
            body,
        })
    }
}

/// Whether `key` is safe to hand to a backend: non-empty, relative, and free of `.` and `..`
/// segments. Empty segments are left to the backend; object stores treat `a//b` as its own key.
#[must_use]
pub fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('/')
        && key
            .split('/')
            .all(|segment| segment != ".." && segment != ".")
}


#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::testing::MemoryClient;
    use super::*;
    use crate::error::GatewayError;

    #[test]
    fn test_should_reject_unsafe_keys() {
        assert!(is_safe_key("a/b.txt"));
        assert!(is_safe_key("a b/c..d"));
        assert!(!is_safe_key(""));
        assert!(!is_safe_key("/etc/passwd"));
        assert!(!is_safe_key("a/../../etc/passwd"));
        assert!(!is_safe_key("./a"));
        assert!(is_safe_key("a//b.txt"));
    }

    #[tokio::test]
    async fn test_should_get_whole_object() {
        let client = MemoryClient::new([("a/b.txt", b"hello".as_slice())]);
        let read = client.get("a/b.txt", None).await.expect("get");
        assert_eq!(read.content_length(), 5);
        assert_eq!(read.range, None);

        let body: Vec<Bytes> = read
            .body
            .map(|chunk| chunk.expect("chunk"))
            .collect()
            .await;
        assert_eq!(body.concat(), b"hello");
    }

    #[tokio::test]
    async fn test_should_get_range_with_same_metadata_as_head() {
        let data = vec![7u8; 150];
        let client = MemoryClient::new([("big.bin", data.as_slice())]);

        let head = client.head("big.bin").await.expect("head");
        let read = client
            .get("big.bin", Some("bytes=0-99"))
            .await
            .expect("get");
        assert_eq!(read.object, head);
        assert_eq!(read.content_length(), 100);

        let body: Vec<Bytes> = read
            .body
            .map(|chunk| chunk.expect("chunk"))
            .collect()
            .await;
        assert_eq!(body.concat().len(), 100);
    }

    #[tokio::test]
    async fn test_should_reject_range_before_opening_body() {
        let data = vec![7u8; 150];
        let client = MemoryClient::new([("big.bin", data.as_slice())]);

        let err = client
            .get("big.bin", Some("bytes=150-160"))
            .await
            .expect_err("range must be rejected");
        assert!(matches!(err, GatewayError::InvalidRange { size: 150, .. }));
        assert_eq!(
            client
                .chunks_read
                .load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }

    #[tokio::test]
    async fn test_should_report_missing_key() {
        let client = MemoryClient::with_keys(&["a"]);
        let err = client.get("b", None).await.expect_err("missing");
        assert!(err.is_not_found());
    }
}

//! ETag computation for filesystem-backed objects.
//!
//! Two flavours are produced:
//!
//! - a *cheap* ETag derived from size and modification time, which never reads file content
//!   and is therefore only as precise as the filesystem's timestamp resolution;
//! - a *strong* ETag in S3 multipart style: the MD5 of the concatenated binary MD5 digests of
//!   each [`ETAG_PART_SIZE`] part, formatted as `"<hex>-<parts>"`.
//!
//! Strong hashing is blocking and is meant to run on the blocking pool via
//! [`tokio::task::spawn_blocking`].

use std::io::Read;
use std::path::Path;

use md5::{Digest, Md5};

/// Part size used when computing strong ETags.
pub const ETAG_PART_SIZE: usize = 8 * 1024 * 1024;

/// Buffer size for reading files while hashing.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Compute the hex-encoded MD5 digest of `data`.
///
/// # Examples
///
/// ```
/// use s3gate_core::checksums::compute_md5;
///
/// let digest = compute_md5(b"hello");
/// assert_eq!(digest, "5d41402abc4b2a76b9719d911017c592");
/// ```
#[must_use]
pub fn compute_md5(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Cheap ETag from file size and modification time (seconds and nanoseconds since epoch).
///
/// ```
/// use s3gate_core::checksums::compute_cheap_etag;
///
/// let a = compute_cheap_etag(5, 1_700_000_000, 0);
/// assert_eq!(a, compute_cheap_etag(5, 1_700_000_000, 0));
/// assert_ne!(a, compute_cheap_etag(6, 1_700_000_000, 0));
/// ```
#[must_use]
pub fn compute_cheap_etag(size: u64, mtime_secs: i64, mtime_nanos: u32) -> String {
    let seed = format!("{size}:{mtime_secs}.{mtime_nanos:09}");
    format!("\"{}\"", compute_md5(seed.as_bytes()))
}

/// Combine per-part raw MD5 digests into a multipart ETag.
#[must_use]
pub fn compute_multipart_etag(part_digests: &[[u8; 16]]) -> String {
    let mut combined = Vec::with_capacity(part_digests.len() * 16);
    for digest in part_digests {
        combined.extend_from_slice(digest);
    }
    let final_md5 = hex::encode(Md5::digest(&combined));
    format!("\"{final_md5}-{}\"", part_digests.len())
}

/// Incremental multipart hasher. Feed bytes with [`update`](Self::update) and obtain the
/// ETag with [`finish`](Self::finish).
#[derive(Debug, Clone)]
pub struct MultipartHasher {
    part_size: usize,
    current: Md5,
    current_len: usize,
    parts: Vec<[u8; 16]>,
}

impl Default for MultipartHasher {
    fn default() -> Self {
        Self::new(ETAG_PART_SIZE)
    }
}

impl MultipartHasher {
    /// Create a hasher splitting input into parts of `part_size` bytes.
    #[must_use]
    pub fn new(part_size: usize) -> Self {
        Self {
            part_size: part_size.max(1),
            current: Md5::new(),
            current_len: 0,
            parts: Vec::new(),
        }
    }

    /// Feed more bytes.
    pub fn update(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            let room = self.part_size - self.current_len;
            let take = room.min(data.len());
            self.current.update(&data[..take]);
            self.current_len += take;
            data = &data[take..];
            if self.current_len == self.part_size {
                self.seal_part();
            }
        }
    }

    /// Finish hashing and return the quoted multipart ETag.
    ///
    /// Empty input yields a single part holding the MD5 of no bytes.
    #[must_use]
    pub fn finish(mut self) -> String {
        if self.current_len > 0 || self.parts.is_empty() {
            self.seal_part();
        }
        compute_multipart_etag(&self.parts)
    }

    fn seal_part(&mut self) {
        let digest = std::mem::replace(&mut self.current, Md5::new()).finalize();
        let mut raw = [0u8; 16];
        raw.copy_from_slice(&digest[..]);
        self.parts.push(raw);
        self.current_len = 0;
    }
}

/// Hash a file from disk into a strong ETag. Blocking.
pub fn compute_file_etag(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = MultipartHasher::default();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finish())
}

//! Filesystem storage client.
//!
//! A directory tree is exposed as a flat key space: `/` is both the path separator and the
//! emulated delimiter. Scans walk the tree lazily, one directory at a time, in the order S3
//! would list the keys (a directory `d` sorts as `d/`). With the `/` delimiter the walk stays
//! at one level and reports subdirectories as common prefixes.
//!
//! All filesystem access goes through `tokio::fs`, which runs the blocking syscalls on the
//! runtime's blocking pool. Strong ETag hashing runs there too.

use std::fs::Metadata;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::{StreamExt, stream};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

use super::{ByteStream, Entry, EntryStream, StorageClient, StorageObject, is_safe_key};
use crate::checksums::{compute_cheap_etag, compute_file_etag};
use crate::config::{ClientKind, DEFAULT_CHUNK_SIZE, EtagMode, TargetOptions};
use crate::error::{GatewayError, GatewayResult};
use crate::streaming::ByteRange;

#[derive(Debug, Clone)]
struct CachedEtag {
    size: u64,
    modified: SystemTime,
    etag: String,
}

/// Storage client over a local directory.
///
/// # Examples
///
/// ```
/// use s3gate_core::config::EtagMode;
/// use s3gate_core::storage::{FileClient, StorageClient};
///
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
///
/// let client = FileClient::new(dir.path(), 8192, EtagMode::Cheap);
/// # tokio_test::block_on(async {
/// let object = client.head("a.txt").await.unwrap();
/// assert_eq!(object.size, 5);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct FileClient {
    root: PathBuf,
    chunk_size: usize,
    etag_mode: EtagMode,
    etags: Arc<DashMap<PathBuf, CachedEtag>>,
}

impl FileClient {
    /// Create a client rooted at `root`. The directory is not checked.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, chunk_size: usize, etag_mode: EtagMode) -> Self {
        Self {
            root: root.into(),
            chunk_size: chunk_size.max(1),
            etag_mode,
            etags: Arc::new(DashMap::new()),
        }
    }

    /// Build a client from target options, checking that the root is a readable directory.
    pub async fn open(target: &str, options: &TargetOptions) -> GatewayResult<Self> {
        let misconfigured = |message: String| GatewayError::Configuration {
            target: target.to_owned(),
            message,
        };

        let root = options
            .path
            .clone()
            .ok_or_else(|| misconfigured("filesystem target requires `path`".to_owned()))?;
        let meta = tokio::fs::metadata(&root)
            .await
            .map_err(|e| misconfigured(format!("cannot access {}: {e}", root.display())))?;
        if !meta.is_dir() {
            return Err(misconfigured(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let chunk_size = options.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            return Err(misconfigured("`chunkSize` must be positive".to_owned()));
        }

        Ok(Self::new(root, chunk_size, options.effective_etag_mode()))
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> GatewayResult<PathBuf> {
        if !is_file_key(key) {
            return Err(no_such_key(key));
        }
        Ok(self.root.join(key))
    }

    async fn describe(
        &self,
        key: String,
        path: &Path,
        meta: &Metadata,
    ) -> GatewayResult<StorageObject> {
        let size = meta.len();
        let modified = meta.modified()?;
        let etag = match self.etag_mode {
            EtagMode::Cheap => {
                let since = modified.duration_since(UNIX_EPOCH).unwrap_or_default();
                let secs = i64::try_from(since.as_secs()).unwrap_or(i64::MAX);
                compute_cheap_etag(size, secs, since.subsec_nanos())
            }
            EtagMode::Strong => self.strong_etag(path, size, modified).await?,
        };
        Ok(StorageObject {
            key,
            size,
            etag,
            last_modified: DateTime::<Utc>::from(modified),
        })
    }

    async fn strong_etag(
        &self,
        path: &Path,
        size: u64,
        modified: SystemTime,
    ) -> GatewayResult<String> {
        if let Some(hit) = self.etags.get(path) {
            if hit.size == size && hit.modified == modified {
                return Ok(hit.etag.clone());
            }
        }

        let owned = path.to_path_buf();
        let etag = tokio::task::spawn_blocking(move || compute_file_etag(&owned))
            .await
            .map_err(|e| GatewayError::Internal(anyhow::anyhow!("etag task failed: {e}")))??;

        debug!(path = %path.display(), %etag, "computed strong etag");
        self.etags.insert(
            path.to_path_buf(),
            CachedEtag {
                size,
                modified,
                etag: etag.clone(),
            },
        );
        Ok(etag)
    }
}

/// A safe key that names exactly one path: the filesystem collapses empty segments, so
/// `a//b` and `a/b/` would alias `a/b`.
fn is_file_key(key: &str) -> bool {
    is_safe_key(key) && !key.split('/').any(str::is_empty)
}

fn no_such_key(key: &str) -> GatewayError {
    GatewayError::NoSuchKey {
        key: key.to_owned(),
    }
}

fn map_open_error(key: &str, err: std::io::Error) -> GatewayError {
    match err.kind() {
        ErrorKind::NotFound | ErrorKind::NotADirectory => no_such_key(key),
        _ => GatewayError::Io(err),
    }
}

// ---------------------------------------------------------------------------
// Directory walk
// ---------------------------------------------------------------------------

struct Child {
    name: String,
    meta: Metadata,
    /// Reached through a symbolic link. Linked directories are never descended into.
    linked: bool,
}

impl Child {
    fn sort_key(&self) -> String {
        if self.meta.is_dir() {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }
}

struct Frame {
    dir_key: String,
    children: std::vec::IntoIter<Child>,
}

struct Walk {
    client: FileClient,
    shallow: bool,
    start_after: Option<String>,
    stack: Vec<Frame>,
}

/// Children of `dir` whose name starts with `filter`, in listing order. A missing directory
/// has no children.
async fn read_children(dir: &Path, filter: &str) -> GatewayResult<Vec<Child>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut children = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            debug!(dir = %dir.display(), "skipping non UTF-8 file name");
            continue;
        };
        if !name.starts_with(filter) {
            continue;
        }
        let linked = match entry.file_type().await {
            Ok(file_type) => file_type.is_symlink(),
            Err(e) => {
                debug!(path = %entry.path().display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let meta = if linked {
            tokio::fs::metadata(entry.path()).await
        } else {
            entry.metadata().await
        };
        match meta {
            Ok(meta) => children.push(Child { name, meta, linked }),
            Err(e) => debug!(path = %entry.path().display(), error = %e, "skipping unreadable entry"),
        }
    }
    children.sort_by_cached_key(Child::sort_key);
    Ok(children)
}

impl Walk {
    fn skips_dir(&self, dir_key: &str) -> bool {
        self.start_after
            .as_deref()
            .is_some_and(|sa| sa >= dir_key && !sa.starts_with(dir_key))
    }

    async fn next_entry(&mut self) -> GatewayResult<Option<Entry>> {
        loop {
            let Some(frame) = self.stack.last_mut() else {
                return Ok(None);
            };
            let Some(child) = frame.children.next() else {
                self.stack.pop();
                continue;
            };
            let key = format!("{}{}", frame.dir_key, child.name);

            if child.meta.is_dir() {
                let dir_key = key + "/";
                if self.skips_dir(&dir_key) {
                    continue;
                }
                if self.shallow {
                    return Ok(Some(Entry::Prefix(dir_key)));
                }
                if child.linked {
                    debug!(key = %dir_key, "not descending into linked directory");
                    continue;
                }
                let children = read_children(&self.client.root.join(&dir_key), "").await?;
                self.stack.push(Frame {
                    dir_key,
                    children: children.into_iter(),
                });
            } else if child.meta.is_file() {
                if self.start_after.as_deref().is_some_and(|sa| key.as_str() <= sa) {
                    continue;
                }
                let path = self.client.root.join(&key);
                let object = self.client.describe(key, &path, &child.meta).await?;
                return Ok(Some(Entry::Object(object)));
            }
        }
    }
}

#[async_trait]
impl StorageClient for FileClient {
    fn kind(&self) -> ClientKind {
        ClientKind::File
    }

    fn etag_mode(&self) -> Option<EtagMode> {
        Some(self.etag_mode)
    }

    async fn head(&self, key: &str) -> GatewayResult<StorageObject> {
        let path = self.resolve(key)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| map_open_error(key, e))?;
        if !meta.is_file() {
            return Err(no_such_key(key));
        }
        self.describe(key.to_owned(), &path, &meta).await
    }

    async fn scan(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        start_after: Option<&str>,
    ) -> GatewayResult<EntryStream> {
        let (dir_key, filter) = match prefix.rfind('/') {
            Some(at) => prefix.split_at(at + 1),
            None => ("", prefix),
        };
        if !dir_key.is_empty() && !dir_key.strip_suffix('/').is_some_and(is_file_key) {
            return Ok(stream::empty().boxed());
        }

        let children = read_children(&self.root.join(dir_key), filter).await?;
        let walk = Walk {
            client: self.clone(),
            shallow: delimiter == Some("/"),
            start_after: start_after.map(str::to_owned),
            stack: vec![Frame {
                dir_key: dir_key.to_owned(),
                children: children.into_iter(),
            }],
        };

        let entries = stream::unfold(walk, |mut walk| async move {
            match walk.next_entry().await {
                Ok(Some(entry)) => Some((Ok(entry), walk)),
                Ok(None) => None,
                Err(e) => {
                    walk.stack.clear();
                    Some((Err(e), walk))
                }
            }
        });
        Ok(entries.boxed())
    }

    async fn read(
        &self,
        object: &StorageObject,
        range: Option<ByteRange>,
    ) -> GatewayResult<ByteStream> {
        let path = self.resolve(&object.key)?;
        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| map_open_error(&object.key, e))?;

        let (start, len) = range.map_or((0, object.size), |r| (r.start, r.len()));
        if start > 0 {
            file.seek(SeekFrom::Start(start)).await?;
        }

        let chunk_size = self.chunk_size;
        let chunks = stream::unfold(Some(file.take(len)), move |reader| async move {
            let mut reader = reader?;
            let mut buf = BytesMut::with_capacity(chunk_size);
            match reader.read_buf(&mut buf).await {
                Ok(0) => None,
                Ok(_) => Some((Ok(buf.freeze()), Some(reader))),
                Err(e) => Some((Err(GatewayError::Io(e)), None)),
            }
        });
        Ok(chunks.boxed())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use bytes::Bytes;
    use futures::TryStreamExt;
    use tempfile::TempDir;

    use super::*;
    use crate::listing::ListParams;

    fn fixture(files: &[(&str, &[u8])]) -> TempDir {
        let dir = TempDir::new().expect("temp dir");
        for (key, data) in files {
            let path = dir.path().join(key);
            fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            fs::write(path, data).expect("write");
        }
        dir
    }

    fn client(dir: &TempDir) -> FileClient {
        FileClient::new(dir.path(), 2, EtagMode::Cheap)
    }

    async fn scan_keys(client: &FileClient, prefix: &str, delimiter: Option<&str>) -> Vec<String> {
        client
            .scan(prefix, delimiter, None)
            .await
            .expect("scan")
            .map_ok(|e| e.key().to_owned())
            .try_collect()
            .await
            .expect("entries")
    }

    #[tokio::test]
    async fn test_should_list_hello_fixture() {
        let dir = fixture(&[("a/b.txt", b"hello")]);
        let client = client(&dir);

        let root = client
            .list(&ListParams::builder().delimiter("/").build())
            .await
            .expect("list");
        assert_eq!(root.common_prefixes, vec!["a/".to_owned()]);
        assert!(root.objects.is_empty());

        let inner = client
            .list(&ListParams::builder().prefix("a/").delimiter("/").build())
            .await
            .expect("list");
        assert!(inner.common_prefixes.is_empty());
        assert_eq!(inner.objects.len(), 1);
        assert_eq!(inner.objects[0].key, "a/b.txt");
        assert_eq!(inner.objects[0].size, 5);

        let read = client.get("a/b.txt", None).await.expect("get");
        let chunks: Vec<Bytes> = read.body.try_collect().await.expect("body");
        assert!(chunks.iter().all(|c| c.len() <= 2));
        assert_eq!(chunks.concat(), b"hello");
    }

    #[tokio::test]
    async fn test_should_walk_in_s3_key_order() {
        let dir = fixture(&[
            ("a.txt", b"1"),
            ("a/x", b"2"),
            ("a-b", b"3"),
            ("b/c/d", b"4"),
            ("b0", b"5"),
        ]);
        let keys = scan_keys(&client(&dir), "", None).await;
        assert_eq!(keys, vec!["a-b", "a.txt", "a/x", "b/c/d", "b0"]);

        let shallow = scan_keys(&client(&dir), "", Some("/")).await;
        assert_eq!(shallow, vec!["a-b", "a.txt", "a/", "b/", "b0"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_should_not_descend_into_linked_directories() {
        let dir = fixture(&[("a/f", b"1"), ("shared/g", b"2")]);
        std::os::unix::fs::symlink(dir.path(), dir.path().join("a/loop")).expect("loop link");
        std::os::unix::fs::symlink(dir.path().join("shared"), dir.path().join("a/shared"))
            .expect("dir link");
        std::os::unix::fs::symlink(dir.path().join("shared/g"), dir.path().join("a/g"))
            .expect("file link");
        let client = client(&dir);

        let keys = scan_keys(&client, "", None).await;
        assert_eq!(keys, vec!["a/f", "a/g", "shared/g"]);

        let page = client
            .list(&ListParams::builder().max_keys(1000).build())
            .await
            .expect("list");
        assert_eq!(page.objects.len(), 3);
        assert!(page.next_continuation_token.is_none());

        let shallow = scan_keys(&client, "a/", Some("/")).await;
        assert_eq!(shallow, vec!["a/f", "a/g", "a/loop/", "a/shared/"]);

        assert_eq!(client.head("a/g").await.expect("linked file").size, 1);
    }

    #[tokio::test]
    async fn test_should_filter_by_partial_name() {
        let dir = fixture(&[("data/img1.tif", b"1"), ("data/img2.tif", b"2"), ("data/x", b"3")]);
        let keys = scan_keys(&client(&dir), "data/img", None).await;
        assert_eq!(keys, vec!["data/img1.tif", "data/img2.tif"]);

        assert!(scan_keys(&client(&dir), "missing/", None).await.is_empty());
    }

    #[tokio::test]
    async fn test_should_prune_subtrees_before_start_after() {
        let dir = fixture(&[("a/1", b"1"), ("a/2", b"2"), ("b/1", b"3"), ("c", b"4")]);
        let keys: Vec<String> = client(&dir)
            .scan("", None, Some("a/1"))
            .await
            .expect("scan")
            .map_ok(|e| e.key().to_owned())
            .try_collect()
            .await
            .expect("entries");
        assert_eq!(keys, vec!["a/2", "b/1", "c"]);
    }

    #[tokio::test]
    async fn test_should_paginate_directory_listing() {
        let dir = fixture(&[
            ("p/a", b"1"),
            ("p/b/1", b"2"),
            ("p/c", b"3"),
            ("p/d/1", b"4"),
            ("p/e", b"5"),
        ]);
        let client = client(&dir);
        let mut params = ListParams::builder().prefix("p/").delimiter("/").max_keys(2).build();
        let mut seen = Vec::new();
        loop {
            let page = client.list(&params).await.expect("list");
            seen.extend(page.objects.iter().map(|o| o.key.clone()));
            seen.extend(page.common_prefixes.iter().cloned());
            match page.next_continuation_token {
                Some(token) => params.continuation_token = Some(token),
                None => break,
            }
        }
        seen.sort();
        assert_eq!(seen, vec!["p/a", "p/b/", "p/c", "p/d/", "p/e"]);
    }

    #[tokio::test]
    async fn test_should_read_range() {
        let data: Vec<u8> = (0..=255).collect();
        let dir = fixture(&[("bin/data", &data)]);
        let client = FileClient::new(dir.path(), 7, EtagMode::Cheap);

        let read = client
            .get("bin/data", Some("bytes=10-29"))
            .await
            .expect("get");
        assert_eq!(read.content_length(), 20);
        let chunks: Vec<Bytes> = read.body.try_collect().await.expect("body");
        assert_eq!(chunks.concat(), &data[10..30]);
    }

    #[tokio::test]
    async fn test_should_treat_directories_and_traversal_as_missing() {
        let dir = fixture(&[("a/b.txt", b"hello")]);
        let client = client(&dir);

        assert!(client.head("a").await.expect_err("dir").is_not_found());
        assert!(client.head("a/").await.expect_err("dir").is_not_found());
        assert!(client.head("a/missing").await.expect_err("missing").is_not_found());
        assert!(client.head("a/b.txt/x").await.expect_err("file as dir").is_not_found());
        assert!(client.head("../etc/passwd").await.expect_err("escape").is_not_found());
        assert!(client.head("a//b.txt").await.expect_err("empty segment").is_not_found());
        assert!(client.head("/a/b.txt").await.expect_err("leading slash").is_not_found());
    }

    #[tokio::test]
    async fn test_should_match_head_and_get_metadata() {
        let dir = fixture(&[("a/b.txt", b"hello")]);
        let client = client(&dir);
        let head = client.head("a/b.txt").await.expect("head");
        let read = client.get("a/b.txt", None).await.expect("get");
        assert_eq!(read.object, head);
    }

    #[tokio::test]
    async fn test_should_cache_strong_etags_until_content_changes() {
        let dir = fixture(&[("f", b"hello")]);
        let client = FileClient::new(dir.path(), 8192, EtagMode::Strong);
        assert_eq!(client.etag_mode(), Some(EtagMode::Strong));

        let first = client.head("f").await.expect("head");
        assert!(first.etag.ends_with("-1\""));
        assert_eq!(client.etags.len(), 1);
        assert_eq!(client.head("f").await.expect("head").etag, first.etag);

        fs::write(dir.path().join("f"), b"hello world").expect("rewrite");
        let second = client.head("f").await.expect("head");
        assert_ne!(second.etag, first.etag);
        assert_eq!(second.size, 11);
    }

    #[tokio::test]
    async fn test_should_reject_missing_root() {
        let options = TargetOptions::builder()
            .path(PathBuf::from("/definitely/not/here"))
            .build();
        let err = FileClient::open("local", &options).await.expect_err("missing root");
        assert!(matches!(err, GatewayError::Configuration { .. }));

        let err = FileClient::open("local", &TargetOptions::default())
            .await
            .expect_err("no path");
        assert!(matches!(err, GatewayError::Configuration { .. }));
    }
}

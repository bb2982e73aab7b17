//! Prefix scoping: confine a storage client to a key prefix.
//!
//! Keys from callers are joined onto the prefix before they reach the backend. Keys coming
//! back have the prefix stripped, and anything the backend returns outside the prefix is
//! dropped, whatever the backend did.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{StreamExt, future};

use super::{ByteStream, Entry, EntryStream, StorageClient, StorageObject, is_safe_key};
use crate::config::{ClientKind, EtagMode};
use crate::error::{GatewayError, GatewayResult};
use crate::streaming::ByteRange;

/// A client that sees only the keys under `root` of an inner client.
#[derive(Debug, Clone)]
pub struct ScopedClient {
    root: String,
    inner: Arc<dyn StorageClient>,
}

impl ScopedClient {
    /// Scope `inner` to `prefix`. A missing trailing `/` is added; leading slashes are
    /// dropped.
    #[must_use]
    pub fn new(inner: Arc<dyn StorageClient>, prefix: &str) -> Self {
        let trimmed = prefix.trim_matches('/');
        let root = if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}/")
        };
        Self { root, inner }
    }

    /// The normalized prefix, ending with `/` unless empty.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    fn join(&self, key: &str) -> String {
        format!("{}{key}", self.root)
    }

    fn relative_error(&self, err: GatewayError) -> GatewayError {
        match err {
            GatewayError::NoSuchKey { key } => GatewayError::NoSuchKey {
                key: key
                    .strip_prefix(self.root.as_str())
                    .map_or(key.clone(), str::to_owned),
            },
            other => other,
        }
    }
}

fn strip_entry(root: &str, entry: Entry) -> Option<Entry> {
    match entry {
        Entry::Object(mut object) => {
            object.key = object.key.strip_prefix(root)?.to_owned();
            (!object.key.is_empty()).then_some(Entry::Object(object))
        }
        Entry::Prefix(prefix) => {
            let relative = prefix.strip_prefix(root)?;
            (!relative.is_empty()).then(|| Entry::Prefix(relative.to_owned()))
        }
    }
}

#[async_trait]
impl StorageClient for ScopedClient {
    fn kind(&self) -> ClientKind {
        self.inner.kind()
    }

    fn etag_mode(&self) -> Option<EtagMode> {
        self.inner.etag_mode()
    }

    async fn head(&self, key: &str) -> GatewayResult<StorageObject> {
        if !is_safe_key(key) {
            return Err(GatewayError::NoSuchKey {
                key: key.to_owned(),
            });
        }
        let mut object = self
            .inner
            .head(&self.join(key))
            .await
            .map_err(|e| self.relative_error(e))?;
        object.key = key.to_owned();
        Ok(object)
    }

    async fn scan(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        start_after: Option<&str>,
    ) -> GatewayResult<EntryStream> {
        let full_start = start_after.map(|s| self.join(s));
        let entries = self
            .inner
            .scan(&self.join(prefix), delimiter, full_start.as_deref())
            .await?;

        let root = self.root.clone();
        let scoped = entries.filter_map(move |item| {
            future::ready(match item {
                Ok(entry) => strip_entry(&root, entry).map(Ok),
                Err(e) => Some(Err(e)),
            })
        });
        Ok(scoped.boxed())
    }

    async fn read(
        &self,
        object: &StorageObject,
        range: Option<ByteRange>,
    ) -> GatewayResult<ByteStream> {
        if !is_safe_key(&object.key) {
            return Err(GatewayError::NoSuchKey {
                key: object.key.clone(),
            });
        }
        let full = StorageObject {
            key: self.join(&object.key),
            ..object.clone()
        };
        self.inner
            .read(&full, range)
            .await
            .map_err(|e| self.relative_error(e))
    }
}

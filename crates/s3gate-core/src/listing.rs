//! Listing engine: ListObjectsV2 pagination over any [`StorageClient`].
//!
//! Entries come from [`StorageClient::scan`] in key order. Objects whose key contains the
//! delimiter after the request prefix are folded into a common prefix, and repeated
//! prefixes collapse into one entry. Objects and common prefixes both count toward
//! `max_keys`; a common prefix is a single entry, so it is never split across pages.
//!
//! Pagination is stateless. The continuation token carries the last key or common prefix
//! returned; the next call re-scans from that boundary and skips everything at or before it
//! (and, for a common prefix boundary, everything under it). Nothing is held between calls,
//! so a backend that changes between pages may show the change on a later page.

use futures::TryStreamExt;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};
use crate::storage::{Entry, StorageClient, StorageObject};
use crate::utils::{decode_continuation_token, encode_continuation_token};

/// Upper bound on entries per page.
pub const MAX_KEYS_LIMIT: usize = 1000;

/// Parameters of one listing call.
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct ListParams {
    /// Only keys starting with this prefix are listed.
    #[builder(default, setter(into))]
    pub prefix: String,
    /// Fold keys at the first occurrence of this string after the prefix.
    #[builder(default, setter(strip_option, into))]
    pub delimiter: Option<String>,
    /// Token from a previous truncated page.
    #[builder(default, setter(strip_option, into))]
    pub continuation_token: Option<String>,
    /// Start listing after this key. Ignored when a continuation token is present.
    #[builder(default, setter(strip_option, into))]
    pub start_after: Option<String>,
    /// Maximum number of objects plus common prefixes to return.
    #[builder(default = MAX_KEYS_LIMIT)]
    pub max_keys: usize,
}

impl Default for ListParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// One page of results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Objects, in key order.
    pub objects: Vec<StorageObject>,
    /// Common prefixes, in key order.
    pub common_prefixes: Vec<String>,
    /// Whether more entries exist past this page.
    pub is_truncated: bool,
    /// Token resuming after this page, set when truncated.
    pub next_continuation_token: Option<String>,
}

impl ListPage {
    /// Objects plus common prefixes on this page.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.objects.len() + self.common_prefixes.len()
    }
}

/// The common prefix `key` folds into, if any.
///
/// ```
/// use s3gate_core::listing::common_prefix;
///
/// assert_eq!(common_prefix("a/b/c.txt", "a/", "/").as_deref(), Some("a/b/"));
/// assert_eq!(common_prefix("a/c.txt", "a/", "/"), None);
/// ```
#[must_use]
pub fn common_prefix(key: &str, prefix: &str, delimiter: &str) -> Option<String> {
    let rest = key.strip_prefix(prefix)?;
    let at = rest.find(delimiter)?;
    Some(key[..prefix.len() + at + delimiter.len()].to_owned())
}

fn fold(entry: Entry, prefix: &str, delimiter: Option<&str>) -> Entry {
    match (entry, delimiter) {
        (Entry::Object(object), Some(delimiter)) => {
            match common_prefix(&object.key, prefix, delimiter) {
                Some(cp) => Entry::Prefix(cp),
                None => Entry::Object(object),
            }
        }
        (entry, _) => entry,
    }
}

/// Whether `entry` lies at or before `boundary` and must be skipped. A prefix that contains
/// the boundary is kept since part of it may follow the boundary.
fn is_before(entry: &Entry, boundary: &str, skip_under: bool) -> bool {
    let key = entry.key();
    if skip_under && key.starts_with(boundary) {
        return true;
    }
    match entry {
        Entry::Object(_) => key <= boundary,
        Entry::Prefix(p) => p.as_str() <= boundary && !boundary.starts_with(p.as_str()),
    }
}

/// Produce one page of a listing.
pub async fn list<C>(client: &C, params: &ListParams) -> GatewayResult<ListPage>
where
    C: StorageClient + ?Sized,
{
    let prefix = params.prefix.as_str();
    let delimiter = params.delimiter.as_deref().filter(|d| !d.is_empty());
    let max_keys = params.max_keys.min(MAX_KEYS_LIMIT);

    let (boundary, from_token) = match params.continuation_token.as_deref() {
        Some(token) => {
            let boundary = decode_continuation_token(token)?;
            if !boundary.starts_with(prefix) {
                return Err(GatewayError::InvalidArgument(
                    "The continuation token provided is incorrect".to_owned(),
                ));
            }
            (Some(boundary), true)
        }
        None => (
            params.start_after.clone().filter(|s| !s.is_empty()),
            false,
        ),
    };

    if max_keys == 0 {
        return Ok(ListPage::default());
    }

    // A boundary that is itself a common prefix covers every key under it.
    let skip_under = from_token
        && boundary.as_deref().is_some_and(|b| {
            delimiter.is_some_and(|d| common_prefix(b, prefix, d).as_deref() == Some(b))
        });

    let mut entries = client
        .scan(prefix, delimiter, boundary.as_deref())
        .await?;

    let mut page = ListPage::default();
    let mut last: Option<String> = None;

    while let Some(entry) = entries.try_next().await? {
        if !entry.key().starts_with(prefix) {
            continue;
        }
        if let Some(b) = boundary.as_deref() {
            if is_before(&entry, b, skip_under) {
                continue;
            }
        }
        let entry = fold(entry, prefix, delimiter);
        let key = entry.key();
        if matches!(entry, Entry::Prefix(_)) && last.as_deref() == Some(key) {
            continue;
        }
        if page.key_count() == max_keys {
            page.is_truncated = true;
            break;
        }
        last = Some(key.to_owned());
        match entry {
            Entry::Object(object) => page.objects.push(object),
            Entry::Prefix(cp) => page.common_prefixes.push(cp),
        }
    }

    if page.is_truncated {
        page.next_continuation_token = last.as_deref().map(encode_continuation_token);
    }

    debug!(
        prefix,
        delimiter = delimiter.unwrap_or_default(),
        objects = page.objects.len(),
        common_prefixes = page.common_prefixes.len(),
        is_truncated = page.is_truncated,
        "listing page built"
    );
    Ok(page)
}

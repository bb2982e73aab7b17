//! `list_objects_v2` handler.

use s3gate_model::S3Error;
use s3gate_model::input::ListObjectsV2Input;
use s3gate_model::output::ListObjectsV2Output;
use s3gate_model::types::{CommonPrefix, EncodingType, Object};
use tracing::debug;

use crate::listing::{ListParams, MAX_KEYS_LIMIT};
use crate::provider::S3Gateway;
use crate::storage::StorageObject;
use crate::utils::url_encode;

/// Storage class reported for every object.
pub const STORAGE_CLASS: &str = "STANDARD";

fn effective_max_keys(requested: Option<i32>) -> Result<usize, S3Error> {
    match requested {
        None => Ok(MAX_KEYS_LIMIT),
        Some(n) if n < 0 => Err(S3Error::invalid_argument(format!(
            "max-keys must be a non-negative integer, got {n}"
        ))),
        Some(n) => Ok(usize::try_from(n).map_or(MAX_KEYS_LIMIT, |n| n.min(MAX_KEYS_LIMIT))),
    }
}

#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
fn to_s3_object(object: StorageObject, encode: &dyn Fn(String) -> String) -> Object {
    Object {
        e_tag: Some(object.etag),
        key: Some(encode(object.key)),
        last_modified: Some(object.last_modified),
        size: Some(object.size as i64),
        storage_class: Some(STORAGE_CLASS.to_owned()),
    }
}

#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
impl S3Gateway {
    /// List the keys of a target, one page at a time.
    pub async fn handle_list_objects_v2(
        &self,
        input: ListObjectsV2Input,
    ) -> Result<ListObjectsV2Output, S3Error> {
        let max_keys = effective_max_keys(input.max_keys)?;
        let (target, client) = self.registry.current().resolve(&input.bucket)?;

        let params = ListParams {
            prefix: input.prefix.clone().unwrap_or_default(),
            delimiter: input.delimiter.clone().filter(|d| !d.is_empty()),
            continuation_token: input.continuation_token.clone(),
            start_after: input.start_after.clone(),
            max_keys,
        };
        let page = client.list(&params).await?;

        let url = input.encoding_type == Some(EncodingType::Url);
        let encode = move |value: String| if url { url_encode(&value) } else { value };

        let key_count = page.key_count();
        let contents: Vec<Object> = page
            .objects
            .into_iter()
            .map(|o| to_s3_object(o, &encode))
            .collect();
        let common_prefixes: Vec<CommonPrefix> = page
            .common_prefixes
            .into_iter()
            .map(|p| CommonPrefix {
                prefix: Some(encode(p)),
            })
            .collect();

        debug!(
            bucket = %target.name,
            prefix = %params.prefix,
            count = key_count,
            is_truncated = page.is_truncated,
            "list_objects_v2 completed"
        );

        Ok(ListObjectsV2Output {
            common_prefixes,
            contents,
            continuation_token: input.continuation_token,
            delimiter: input.delimiter.map(&encode),
            encoding_type: input.encoding_type,
            is_truncated: Some(page.is_truncated),
            key_count: Some(key_count as i32),
            max_keys: Some(max_keys as i32),
            name: Some(input.bucket),
            next_continuation_token: page.next_continuation_token,
            prefix: Some(encode(params.prefix)),
            start_after: input.start_after.map(&encode),
        })
    }
}

//! Object handlers: `get_object` and `head_object`.
//!
//! Both resolve metadata first, so a missing key or an unsatisfiable range is reported
//! before any body byte is read. `GetObject` returns the headers together with an
//! [`ObjectBody`] that streams the content as the backend delivers it.

use s3gate_model::S3Error;
use s3gate_model::input::{GetObjectInput, HeadObjectInput};
use s3gate_model::output::{GetObjectOutput, HeadObjectOutput};
use tracing::debug;

use crate::provider::S3Gateway;
use crate::storage::StorageObject;
use crate::streaming::ObjectBody;
use crate::utils::{content_disposition, guess_content_type};

#[allow(clippy::cast_possible_wrap)]
fn head_output(object: &StorageObject, content_length: u64) -> HeadObjectOutput {
    let content_type = guess_content_type(&object.key);
    HeadObjectOutput {
        accept_ranges: Some("bytes".to_owned()),
        content_disposition: content_disposition(&object.key, &content_type),
        content_length: Some(content_length as i64),
        content_type: Some(content_type),
        e_tag: Some(object.etag.clone()),
        last_modified: Some(object.last_modified),
    }
}

impl S3Gateway {
    /// Fetch an object, or the byte span named by `input.range`.
    pub async fn handle_get_object(
        &self,
        input: GetObjectInput,
    ) -> Result<(GetObjectOutput, ObjectBody), S3Error> {
        let (target, client) = self.registry.current().resolve(&input.bucket)?;
        let read = client.get(&input.key, input.range.as_deref()).await?;

        let content_length = read.content_length();
        let output = GetObjectOutput {
            head: head_output(&read.object, content_length),
            content_range: read.range.map(|r| r.content_range(read.object.size)),
        };

        debug!(
            bucket = %target.name,
            key = %input.key,
            size = read.object.size,
            content_length,
            partial = read.range.is_some(),
            "get_object started"
        );

        let body = ObjectBody::new(read.body, target.name.clone(), input.key, content_length);
        Ok((output, body))
    }

    /// Object metadata without the body.
    pub async fn handle_head_object(
        &self,
        input: HeadObjectInput,
    ) -> Result<HeadObjectOutput, S3Error> {
        let (target, client) = self.registry.current().resolve(&input.bucket)?;
        let object = client.head(&input.key).await?;

        debug!(bucket = %target.name, key = %input.key, size = object.size, "head_object completed");

        Ok(head_output(&object, object.size))
    }
}

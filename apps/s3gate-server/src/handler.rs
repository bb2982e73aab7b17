//! S3 operation handler implementation for [`S3Gateway`].
//!
//! Bridges the HTTP layer (`s3gate-http`) and the gateway (`s3gate-core`) by implementing
//! [`S3Handler`]. Each operation is parsed with [`FromS3Request`], handed to the matching
//! `handle_*` method and rendered with [`IntoS3Response`].

use std::future::Future;

use s3gate_core::S3Gateway;
use s3gate_http::body::S3ResponseBody;
use s3gate_http::dispatch::{HandlerFuture, S3Handler};
use s3gate_http::request::FromS3Request;
use s3gate_http::response::IntoS3Response;
use s3gate_http::router::RoutingContext;
use s3gate_model::S3Operation;
use s3gate_model::error::S3Error;
use s3gate_model::input::GetObjectInput;

/// Wrapper that implements [`S3Handler`] by delegating to [`S3Gateway`].
#[derive(Debug, Clone)]
pub struct GatewayHandler(pub S3Gateway);

impl S3Handler for GatewayHandler {
    fn handle_operation(
        &self,
        op: S3Operation,
        parts: http::request::Parts,
        ctx: RoutingContext,
    ) -> HandlerFuture {
        let gateway = self.0.clone();
        Box::pin(async move {
            match op {
                S3Operation::ListBuckets => {
                    dispatch_output(&parts, &ctx, |input| gateway.handle_list_buckets(input)).await
                }
                S3Operation::ListObjectsV2 => {
                    dispatch_output(&parts, &ctx, |input| gateway.handle_list_objects_v2(input))
                        .await
                }
                S3Operation::GetBucketAcl => {
                    dispatch_output(&parts, &ctx, |input| gateway.handle_get_bucket_acl(input))
                        .await
                }
                S3Operation::HeadObject => {
                    dispatch_output(&parts, &ctx, |input| gateway.handle_head_object(input)).await
                }
                S3Operation::GetObject => get_object(&gateway, &parts, &ctx).await,
                S3Operation::BrowseBucket => Err(S3Error::no_such_bucket(ctx.bucket_name())),
            }
        })
    }
}

/// Parse the input, run the operation and render its output.
async fn dispatch_output<I, O, F, Fut>(
    parts: &http::request::Parts,
    ctx: &RoutingContext,
    f: F,
) -> Result<http::Response<S3ResponseBody>, S3Error>
where
    I: FromS3Request,
    O: IntoS3Response,
    F: FnOnce(I) -> Fut,
    Fut: Future<Output = Result<O, S3Error>>,
{
    let input = I::from_s3_request(
        parts,
        ctx.bucket.as_deref(),
        ctx.key.as_deref(),
        &ctx.query_params,
    )?;
    f(input).await?.into_s3_response()
}

async fn get_object(
    gateway: &S3Gateway,
    parts: &http::request::Parts,
    ctx: &RoutingContext,
) -> Result<http::Response<S3ResponseBody>, S3Error> {
    let input = GetObjectInput::from_s3_request(
        parts,
        ctx.bucket.as_deref(),
        ctx.key.as_deref(),
        &ctx.query_params,
    )?;
    let (output, body) = gateway.handle_get_object(input).await?;
    let length = output
        .head
        .content_length
        .and_then(|len| u64::try_from(len).ok());
    (output, S3ResponseBody::from_stream(body, length)).into_s3_response()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use http_body_util::BodyExt;
    use s3gate_core::TargetRegistry;
    use s3gate_core::config::{ClientKind, GatewayConfig, TargetConfig, TargetOptions};
    use s3gate_model::error::S3ErrorCode;
    use tempfile::TempDir;

    use super::*;

    async fn handler() -> (TempDir, GatewayHandler) {
        let dir = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("docs")).expect("mkdir");
        std::fs::write(dir.path().join("docs/readme.txt"), b"hello world").expect("write");

        let config = GatewayConfig::builder()
            .targets(vec![
                TargetConfig::builder()
                    .name("files")
                    .client(ClientKind::File)
                    .options(
                        TargetOptions::builder()
                            .path(PathBuf::from(dir.path()))
                            .build(),
                    )
                    .build(),
            ])
            .build();
        let registry = TargetRegistry::build(&config).await;
        (dir, GatewayHandler(S3Gateway::new(registry)))
    }

    fn request(uri: &str, range: Option<&str>) -> http::request::Parts {
        let mut builder = http::Request::builder().method(http::Method::GET).uri(uri);
        if let Some(range) = range {
            builder = builder.header("Range", range);
        }
        builder.body(()).expect("valid request").into_parts().0
    }

    fn ctx(op: S3Operation, bucket: Option<&str>, key: Option<&str>) -> RoutingContext {
        RoutingContext {
            bucket: bucket.map(ToOwned::to_owned),
            key: key.map(ToOwned::to_owned),
            operation: op,
            query_params: vec![("list-type".to_owned(), "2".to_owned())],
        }
    }

    async fn body_text(resp: http::Response<S3ResponseBody>) -> String {
        let bytes = resp.into_body().collect().await.expect("collect").to_bytes();
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    #[tokio::test]
    async fn test_should_list_buckets_as_xml() {
        let (_dir, handler) = handler().await;
        let resp = handler
            .handle_operation(
                S3Operation::ListBuckets,
                request("/", None),
                ctx(S3Operation::ListBuckets, None, None),
            )
            .await
            .expect("list buckets");
        let xml = body_text(resp).await;
        assert!(xml.contains("<Name>files</Name>"));
    }

    #[tokio::test]
    async fn test_should_list_objects_in_target() {
        let (_dir, handler) = handler().await;
        let resp = handler
            .handle_operation(
                S3Operation::ListObjectsV2,
                request("/files?list-type=2", None),
                ctx(S3Operation::ListObjectsV2, Some("files"), None),
            )
            .await
            .expect("list objects");
        let xml = body_text(resp).await;
        assert!(xml.contains("<Key>docs/readme.txt</Key>"));
        assert!(xml.contains("<KeyCount>1</KeyCount>"));
    }

    #[tokio::test]
    async fn test_should_stream_ranged_object() {
        let (_dir, handler) = handler().await;
        let resp = handler
            .handle_operation(
                S3Operation::GetObject,
                request("/files/docs/readme.txt", Some("bytes=6-")),
                ctx(S3Operation::GetObject, Some("files"), Some("docs/readme.txt")),
            )
            .await
            .expect("get object");
        assert_eq!(resp.status(), http::StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            resp.headers()
                .get("Content-Range")
                .and_then(|v| v.to_str().ok()),
            Some("bytes 6-10/11")
        );
        assert_eq!(body_text(resp).await, "world");
    }

    #[tokio::test]
    async fn test_should_head_object_without_body() {
        let (_dir, handler) = handler().await;
        let resp = handler
            .handle_operation(
                S3Operation::HeadObject,
                request("/files/docs/readme.txt", None),
                ctx(S3Operation::HeadObject, Some("files"), Some("docs/readme.txt")),
            )
            .await
            .expect("head object");
        assert_eq!(
            resp.headers()
                .get("Content-Length")
                .and_then(|v| v.to_str().ok()),
            Some("11")
        );
        assert!(body_text(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_should_answer_browse_with_no_such_bucket() {
        let (_dir, handler) = handler().await;
        let err = handler
            .handle_operation(
                S3Operation::BrowseBucket,
                request("/files/", None),
                ctx(S3Operation::BrowseBucket, Some("files"), None),
            )
            .await
            .expect_err("no browsing");
        assert_eq!(err.code, S3ErrorCode::NoSuchBucket);
    }

    #[tokio::test]
    async fn test_should_return_no_such_key_for_missing_object() {
        let (_dir, handler) = handler().await;
        let err = handler
            .handle_operation(
                S3Operation::GetObject,
                request("/files/nope.txt", None),
                ctx(S3Operation::GetObject, Some("files"), Some("nope.txt")),
            )
            .await
            .expect_err("missing");
        assert_eq!(err.code, S3ErrorCode::NoSuchKey);
    }
}

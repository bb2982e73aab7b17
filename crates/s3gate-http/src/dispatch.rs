//! S3 operation dispatch: routes a resolved operation to the handler.
//!
//! [`dispatch_operation`] bridges the routing layer with the business logic. The
//! [`S3Handler`] implementation (in the server binary) deserializes the typed input via
//! [`FromS3Request`](crate::request::FromS3Request), calls the gateway, and serializes the
//! output via [`IntoS3Response`](crate::response::IntoS3Response).

use std::future::Future;
use std::pin::Pin;

use s3gate_model::S3Operation;
use s3gate_model::error::S3Error;

use crate::body::S3ResponseBody;
use crate::router::RoutingContext;

/// Boxed future returned by [`S3Handler::handle_operation`].
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<S3ResponseBody>, S3Error>> + Send>>;

/// Trait that the business logic provider must implement.
///
/// This is the boundary between the HTTP layer and the gateway. The returned future is
/// `'static` so the service can be shared as `Arc<H>` across connections.
pub trait S3Handler: Send + Sync + 'static {
    /// Handle an S3 operation and produce an HTTP response.
    fn handle_operation(
        &self,
        op: S3Operation,
        parts: http::request::Parts,
        ctx: RoutingContext,
    ) -> HandlerFuture;
}

/// Dispatch a routed S3 request to the handler.
pub async fn dispatch_operation<H: S3Handler>(
    handler: &H,
    parts: http::request::Parts,
    ctx: RoutingContext,
) -> Result<http::Response<S3ResponseBody>, S3Error> {
    let op = ctx.operation;
    tracing::debug!(operation = %op, bucket = ?ctx.bucket, key = ?ctx.key, "dispatching S3 operation");
    handler.handle_operation(op, parts, ctx).await
}

/// A handler that returns `NotImplemented` for every operation.
///
/// Useful for testing the routing layer in isolation.
#[derive(Debug, Clone, Default)]
pub struct NotImplementedHandler;

impl S3Handler for NotImplementedHandler {
    fn handle_operation(
        &self,
        op: S3Operation,
        _parts: http::request::Parts,
        _ctx: RoutingContext,
    ) -> HandlerFuture {
        Box::pin(async move { Err(S3Error::not_implemented(op.as_str())) })
    }
}

//! The S3 HTTP service implementing hyper's `Service` trait.
//!
//! [`S3HttpService`] ties routing, dispatch, and response formatting into a single
//! hyper-compatible service. It handles:
//!
//! 1. Health check interception (`GET /health`, `GET /_health`)
//! 2. `GET /robots.txt`
//! 3. CORS preflight requests (`OPTIONS`)
//! 4. S3 request routing via [`S3Router`]
//! 5. Operation dispatch to the [`S3Handler`]
//! 6. Common response headers (`x-amz-request-id`, `Server`, CORS)
//! 7. Error response formatting
//!
//! Request bodies are never read: every served operation is a GET or HEAD.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::header::HeaderValue;
use hyper::service::Service;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::body::S3ResponseBody;
use crate::dispatch::{S3Handler, dispatch_operation};
use crate::response::error_to_response;
use crate::router::{RoutingContext, S3Router};

/// Body of `GET /robots.txt`.
pub const ROBOTS_TXT: &str = "User-agent: *\nDisallow: /\n";

/// Response headers readable by cross-origin scripts.
const EXPOSE_HEADERS: &str = "Range, Content-Range, Content-Length, ETag, x-amz-request-id";

/// Configuration for the S3 HTTP service.
#[derive(Debug, Clone)]
pub struct S3HttpConfig {
    /// Public host used for virtual-hosted-style requests (e.g. `s3.example.org`).
    pub base_host: Option<String>,
    /// Whether to resolve the bucket from the Host subdomain.
    pub virtual_hosting: bool,
    /// Value of the `Server` response header.
    pub server_name: String,
}

impl Default for S3HttpConfig {
    fn default() -> Self {
        Self {
            base_host: None,
            virtual_hosting: false,
            server_name: "s3gate".to_owned(),
        }
    }
}

/// The S3 HTTP service that implements hyper's `Service` trait.
///
/// # Type Parameters
///
/// - `H`: The business logic handler implementing [`S3Handler`].
#[derive(Debug)]
pub struct S3HttpService<H: S3Handler> {
    handler: Arc<H>,
    router: S3Router,
    config: Arc<S3HttpConfig>,
}

impl<H: S3Handler> S3HttpService<H> {
    /// Create a new S3 HTTP service with the given handler and configuration.
    #[must_use]
    pub fn new(handler: H, config: S3HttpConfig) -> Self {
        Self::from_shared(Arc::new(handler), config)
    }

    /// Create a new S3 HTTP service from an `Arc<H>` handler and configuration.
    #[must_use]
    pub fn from_shared(handler: Arc<H>, config: S3HttpConfig) -> Self {
        let router = S3Router::new(config.base_host.clone(), config.virtual_hosting);
        Self {
            handler,
            router,
            config: Arc::new(config),
        }
    }
}

impl<H: S3Handler> Clone for S3HttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            router: self.router.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

/// Outcome of the synchronous part of request processing.
enum Prepared {
    /// Answered without the handler.
    Done(http::Response<S3ResponseBody>),
    /// Routed; the handler produces the response.
    Dispatch(http::request::Parts, RoutingContext),
}

impl<H: S3Handler, B> Service<http::Request<B>> for S3HttpService<H> {
    type Response = http::Response<S3ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let request_id = Uuid::new_v4().to_string();
        let prepared = prepare_request(req, &self.router, &request_id);
        let handler = Arc::clone(&self.handler);
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let response = match prepared {
                Prepared::Done(response) => response,
                Prepared::Dispatch(parts, ctx) => {
                    match dispatch_operation(handler.as_ref(), parts, ctx).await {
                        Ok(response) => response,
                        Err(err) => {
                            debug!(error = %err, request_id = %request_id, "S3 operation returned error");
                            error_to_response(&err, &request_id)
                        }
                    }
                }
            };
            Ok(add_common_headers(response, &request_id, &config.server_name))
        })
    }
}

/// Intercept the non-S3 endpoints and route everything else.
fn prepare_request<B>(req: http::Request<B>, router: &S3Router, request_id: &str) -> Prepared {
    let method = req.method().clone();
    let uri = req.uri().clone();
    debug!(%method, %uri, request_id, "processing S3 request");

    if method == http::Method::OPTIONS {
        return Prepared::Done(cors_preflight_response(req.headers()));
    }
    if method == http::Method::GET {
        match uri.path() {
            "/health" | "/_health" => return Prepared::Done(health_check_response()),
            "/robots.txt" => return Prepared::Done(robots_response()),
            _ => {}
        }
    }

    let ctx = match router.resolve(&req) {
        Ok(ctx) => ctx,
        Err(err) => {
            warn!(%method, %uri, error = %err, request_id, "failed to route S3 request");
            return Prepared::Done(error_to_response(&err, request_id));
        }
    };

    info!(
        operation = %ctx.operation,
        bucket = ?ctx.bucket,
        key = ?ctx.key,
        request_id,
        "routed S3 request"
    );

    let (parts, _body) = req.into_parts();
    Prepared::Dispatch(parts, ctx)
}

fn static_response(
    status: http::StatusCode,
    content_type: &'static str,
    body: &'static str,
) -> http::Response<S3ResponseBody> {
    let mut response = http::Response::new(S3ResponseBody::from_string(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(http::header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Produce a health check response.
fn health_check_response() -> http::Response<S3ResponseBody> {
    static_response(
        http::StatusCode::OK,
        "application/json",
        r#"{"status":"running","service":"s3gate"}"#,
    )
}

fn robots_response() -> http::Response<S3ResponseBody> {
    static_response(http::StatusCode::OK, "text/plain", ROBOTS_TXT)
}

/// Produce a CORS preflight response allowing reads from any origin.
fn cors_preflight_response(request_headers: &http::HeaderMap) -> http::Response<S3ResponseBody> {
    let mut response = http::Response::new(S3ResponseBody::empty());
    let headers = response.headers_mut();
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, HEAD"),
    );
    let allow_headers = request_headers
        .get("Access-Control-Request-Headers")
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*"));
    headers.insert("Access-Control-Allow-Headers", allow_headers);
    headers.insert("Access-Control-Max-Age", HeaderValue::from_static("86400"));
    response
}

/// Add common response headers to every response.
fn add_common_headers(
    mut response: http::Response<S3ResponseBody>,
    request_id: &str,
    server_name: &str,
) -> http::Response<S3ResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = HeaderValue::from_str(request_id) {
        headers.insert("x-amz-request-id", hv.clone());
        headers.insert("x-amz-id-2", hv);
    }
    if let Ok(hv) = HeaderValue::from_str(server_name) {
        headers.insert(http::header::SERVER, hv);
    }
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_static("*"),
    );
    headers.insert(
        "Access-Control-Expose-Headers",
        HeaderValue::from_static(EXPOSE_HEADERS),
    );

    response
}

//! S3 HTTP routing, response marshaling, and hyper service for s3gate.
//!
//! This crate provides the HTTP layer of the gateway. It handles:
//!
//! - **Routing** ([`router`]): Maps a request to a target name, an object key and one of
//!   the read-only S3 operations. Supports path-style and virtual-hosted-style addressing.
//!
//! - **Request parsing** ([`request`]): Converts request parts into typed S3 Input structs
//!   from `s3gate-model`.
//!
//! - **Response marshaling** ([`response`]): Converts typed S3 Output structs into HTTP
//!   responses with status codes, headers and XML or streamed bodies.
//!
//! - **Dispatch** ([`dispatch`]): Routes identified operations to the business logic via
//!   the [`S3Handler`](dispatch::S3Handler) trait.
//!
//! - **Service** ([`service`]): The [`S3HttpService`](service::S3HttpService) that
//!   implements hyper's `Service` trait, tying routing, dispatch and middleware together.
//!
//! - **Body** ([`body`]): The [`S3ResponseBody`](body::S3ResponseBody) type supporting
//!   buffered, streaming and empty response modes.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> S3HttpService (hyper Service)
//!     -> Health check / robots.txt / CORS preflight interception
//!     -> S3Router (virtual hosting + operation identification)
//!     -> dispatch_operation (S3Handler trait)
//!     -> Common response headers (x-amz-request-id, Server, CORS)
//!   <- HTTP Response
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use s3gate_http::service::{S3HttpConfig, S3HttpService};
//! use s3gate_http::dispatch::NotImplementedHandler;
//!
//! let config = S3HttpConfig::default();
//! let service = S3HttpService::new(NotImplementedHandler, config);
//! // Use `service` with a hyper server.
//! ```

// S3Error is the error type of every operation; boxing it in each Result buys nothing.
#![allow(clippy::result_large_err)]

pub mod body;
pub mod dispatch;
pub mod request;
pub mod response;
pub mod router;
pub mod service;

pub use body::S3ResponseBody;
pub use dispatch::{NotImplementedHandler, S3Handler};
pub use request::FromS3Request;
pub use response::IntoS3Response;
pub use router::{RoutingContext, S3Router};
pub use service::{S3HttpConfig, S3HttpService};

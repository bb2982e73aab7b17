//! S3 operation handlers.
//!
//! Each submodule exposes `handle_*` methods on [`crate::provider::S3Gateway`]:
//!
//! - [`bucket`]: `ListBuckets`, `GetBucketAcl`
//! - [`list`]: `ListObjectsV2`
//! - [`object`]: `GetObject`, `HeadObject`
//!
//! The server binary bridges these handlers to the HTTP layer by implementing the
//! `S3Handler` trait from `s3gate-http`.

pub mod bucket;
pub mod list;
pub mod object;

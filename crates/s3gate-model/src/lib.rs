//! S3 wire model for the s3gate read-only gateway.
//!
//! Only the shapes exercised by the gateway live here: the error taxonomy rendered
//! into `<Error>` documents, the set of recognized operations, and the input/output
//! structs for bucket listing, object listing, object retrieval and the bucket ACL stub.

#![allow(missing_docs)]

pub mod error;
pub mod input;
pub mod operations;
pub mod output;
pub mod types;

pub use error::{S3Error, S3ErrorCode};
pub use operations::S3Operation;

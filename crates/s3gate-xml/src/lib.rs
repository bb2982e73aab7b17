//! S3 XML response serialization for s3gate.
//!
//! The gateway only writes XML, it never parses it. This crate renders the three
//! documents a read-only gateway returns (`ListAllMyBucketsResult`, `ListBucketResult`
//! and `AccessControlPolicy`) plus the flat `<Error>` body.
//!
//! # S3 XML conventions
//!
//! - Namespace: `http://s3.amazonaws.com/doc/2006-03-01/`
//! - Booleans: lowercase `true`/`false`
//! - Timestamps: ISO 8601 format (`2006-02-03T16:45:09.000Z`)
//! - XML declaration: `<?xml version="1.0" encoding="UTF-8"?>`

pub mod error;
pub mod serialize;

pub use error::{XmlError, error_to_xml};
pub use serialize::{S3_NAMESPACE, S3Serialize, format_timestamp, to_xml};

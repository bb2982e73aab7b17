//! Storage backends, target registry, listing and streaming engines for s3gate.
//!
//! s3gate exposes a set of named targets (local directories or remote S3 buckets) as
//! read-only S3 buckets. This crate holds everything below the HTTP layer.
//!
//! # Architecture
//!
//! ```text
//! s3gate-http (routing, XML, CORS)
//!        |
//!        v
//! S3Gateway (handle_* operations)
//!        |
//!        v
//! TargetRegistry (name -> Target)
//!        |
//!        v
//! StorageClient (FileClient | RemoteClient, optionally ScopedClient)
//! ```

pub mod checksums;
pub mod config;
pub mod error;
pub mod listing;
mod ops;
pub mod provider;
pub mod registry;
pub mod storage;
pub mod streaming;
pub mod utils;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use provider::S3Gateway;
pub use registry::{RegistryHandle, TargetRegistry};
pub use streaming::ObjectBody;

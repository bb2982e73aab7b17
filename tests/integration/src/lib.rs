//! Integration tests for the s3gate server.
//!
//! These tests require a running server serving a filesystem target whose root directory
//! is also writable by the test process. The gateway is read-only, so fixtures are written
//! straight to that directory and then read back over S3.
//!
//! ```text
//! mkdir -p /tmp/s3gate-it
//! S3GATE_LOCAL_PATH=/tmp/s3gate-it S3GATE_LOCAL_NAME=it cargo run -p s3gate-server &
//! S3GATE_TEST_ROOT=/tmp/s3gate-it S3GATE_TEST_BUCKET=it \
//!     cargo test -p s3gate-integration -- --ignored
//! ```
//!
//! | Variable | Default |
//! |----------|---------|
//! | `S3_ENDPOINT_URL` | `http://localhost:8000` |
//! | `S3GATE_TEST_ROOT` | *(required)* |
//! | `S3GATE_TEST_BUCKET` | `local` |

use std::path::PathBuf;
use std::sync::Once;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
#[must_use]
pub fn endpoint_url() -> String {
    std::env::var("S3_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:8000".to_owned())
}

/// Bucket name of the filesystem target under test.
#[must_use]
pub fn test_bucket() -> String {
    std::env::var("S3GATE_TEST_BUCKET").unwrap_or_else(|_| "local".to_owned())
}

/// Create a configured S3 client pointing at the local server.
#[must_use]
pub fn s3_client() -> aws_sdk_s3::Client {
    init_tracing();

    let creds = Credentials::new("test", "test", None, None, "integration-test");

    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(creds)
        .endpoint_url(endpoint_url())
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(config)
}

/// Plain HTTP client for requests the SDK cannot express.
#[must_use]
pub fn http_client() -> reqwest::Client {
    init_tracing();
    reqwest::Client::new()
}

/// Files written under a unique prefix of the served directory. Removed on drop.
#[derive(Debug)]
pub struct Fixture {
    dir: PathBuf,
    /// Key prefix every fixture file lives under, ending in `/`.
    pub prefix: String,
}

impl Fixture {
    /// Write `files` (key relative to the prefix, content) into a fresh directory.
    #[must_use]
    pub fn new(name: &str, files: &[(&str, &str)]) -> Self {
        let root = std::env::var("S3GATE_TEST_ROOT")
            .expect("S3GATE_TEST_ROOT must name the directory the server exposes");
        let id = uuid::Uuid::new_v4().simple().to_string();
        let prefix = format!("test-{name}-{}/", &id[..8]);
        let dir = PathBuf::from(root).join(&prefix);

        for (key, content) in files {
            let path = dir.join(key);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("create fixture dir");
            }
            std::fs::write(&path, content).expect("write fixture file");
        }
        std::fs::create_dir_all(&dir).expect("create fixture root");

        Self { dir, prefix }
    }

    /// Full object key of a fixture file.
    #[must_use]
    pub fn key(&self, relative: &str) -> String {
        format!("{}{relative}", self.prefix)
    }

    /// Path-style URL of a fixture object.
    #[must_use]
    pub fn url(&self, relative: &str) -> String {
        format!("{}/{}/{}", endpoint_url(), test_bucket(), self.key(relative))
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

mod test_bucket;
mod test_cors;
mod test_error;
mod test_list;
mod test_object;

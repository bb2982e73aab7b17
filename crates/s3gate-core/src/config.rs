//! Gateway configuration.
//!
//! [`GatewayConfig`] is the parsed, typed configuration the registry and router are
//! built from. It can be loaded from a JSON file named by `S3GATE_CONFIG` and is then
//! overlaid with `S3GATE_*` environment variables.
//!
//! Validation distinguishes two classes of problems. Structural problems (duplicate
//! target names, an unusable base URL) are fatal and reported by
//! [`GatewayConfig::validate`]. Per-target option problems (a missing backend bucket,
//! an unreadable credential file) only mark that target unavailable when the registry
//! is built.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Default number of concurrent backend requests per remote target.
pub const DEFAULT_POOL_SIZE: usize = 16;
/// Default filesystem read chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;
/// Default remote connect timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
/// Default remote read timeout in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 30_000;
/// Default number of attempts for a remote request (first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default region passed to remote backends.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        /// The file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration document is not valid JSON for [`GatewayConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two targets share a name (compared case-insensitively).
    #[error("duplicate target name: {0}")]
    DuplicateTarget(String),

    /// A target has an unusable name.
    #[error("invalid target name {name:?}: {reason}")]
    InvalidTargetName {
        /// The offending name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The base URL is missing or malformed.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

/// The kind of storage client backing a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    /// A network S3-compatible object store.
    #[default]
    #[serde(alias = "aioboto")]
    S3,
    /// A local directory tree.
    File,
}

impl ClientKind {
    /// Returns the configuration string for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::File => "file",
        }
    }
}

/// How filesystem targets compute ETags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EtagMode {
    /// Derived from size and modification time. Changes whenever either changes, so it
    /// is only as precise as the filesystem timestamp resolution.
    #[default]
    Cheap,
    /// Multipart-style MD5 over the file content.
    Strong,
}

/// Client options for one target. Every field is optional so that target values can be
/// merged field-by-field over the per-kind defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase", default)]
#[builder(field_defaults(default, setter(strip_option)))]
pub struct TargetOptions {
    /// Remote: backend bucket name.
    pub bucket: Option<String>,
    /// Remote: endpoint URL. Unset means the AWS default endpoint.
    pub endpoint: Option<String>,
    /// Remote: signing region.
    pub region: Option<String>,
    /// Remote: file holding the access key id.
    pub access_key_path: Option<PathBuf>,
    /// Remote: file holding the secret access key.
    pub secret_key_path: Option<PathBuf>,
    /// Remote: use path-style addressing against the backend.
    pub force_path_style: Option<bool>,
    /// Remote: maximum concurrent backend requests.
    pub pool_size: Option<usize>,
    /// Remote: connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Remote: read timeout in milliseconds.
    pub read_timeout_ms: Option<u64>,
    /// Remote: attempts per request, including the first.
    pub max_attempts: Option<u32>,
    /// File: root directory.
    pub path: Option<PathBuf>,
    /// File: read chunk size in bytes.
    pub chunk_size: Option<usize>,
    /// File: ETag computation mode.
    pub etag_mode: Option<EtagMode>,
    /// File: legacy switch, `true` selects [`EtagMode::Strong`].
    pub calculate_etags: Option<bool>,
}

impl TargetOptions {
    /// Merge `self` over `defaults`. Values set on `self` win, field by field.
    #[must_use]
    pub fn merged_over(&self, defaults: &TargetOptions) -> TargetOptions {
        let d = defaults.clone();
        TargetOptions {
            bucket: self.bucket.clone().or(d.bucket),
            endpoint: self.endpoint.clone().or(d.endpoint),
            region: self.region.clone().or(d.region),
            access_key_path: self.access_key_path.clone().or(d.access_key_path),
            secret_key_path: self.secret_key_path.clone().or(d.secret_key_path),
            force_path_style: self.force_path_style.or(d.force_path_style),
            pool_size: self.pool_size.or(d.pool_size),
            connect_timeout_ms: self.connect_timeout_ms.or(d.connect_timeout_ms),
            read_timeout_ms: self.read_timeout_ms.or(d.read_timeout_ms),
            max_attempts: self.max_attempts.or(d.max_attempts),
            path: self.path.clone().or(d.path),
            chunk_size: self.chunk_size.or(d.chunk_size),
            etag_mode: self.etag_mode.or(d.etag_mode),
            calculate_etags: self.calculate_etags.or(d.calculate_etags),
        }
    }

    /// The effective ETag mode, honoring `calculateEtags`.
    #[must_use]
    pub fn effective_etag_mode(&self) -> EtagMode {
        match (self.etag_mode, self.calculate_etags) {
            (Some(mode), _) => mode,
            (None, Some(true)) => EtagMode::Strong,
            (None, _) => EtagMode::Cheap,
        }
    }
}

/// One configured target, exposed to clients as one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfig {
    /// Bucket name clients use. Matched case-insensitively.
    #[builder(setter(into))]
    pub name: String,

    /// Storage client kind.
    #[serde(default)]
    #[builder(default)]
    pub client: ClientKind,

    /// Whether the target appears in `GET /`.
    #[serde(default = "default_true")]
    #[builder(default = true)]
    pub browseable: bool,

    /// Key prefix the target is confined to.
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub prefix: Option<String>,

    /// Client options, merged over the per-kind defaults.
    #[serde(default)]
    #[builder(default)]
    pub options: TargetOptions,
}

fn default_true() -> bool {
    true
}

/// Gateway configuration.
///
/// # Examples
///
/// ```
/// use s3gate_core::config::GatewayConfig;
///
/// let config = GatewayConfig::default();
/// assert_eq!(config.listen, "0.0.0.0:8000");
/// assert!(!config.virtual_buckets);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayConfig {
    /// Bind address (e.g. `"0.0.0.0:8000"`).
    #[builder(default = String::from("0.0.0.0:8000"), setter(into))]
    pub listen: String,

    /// Public base URL. Required for virtual-hosted bucket addressing.
    #[builder(default, setter(strip_option, into))]
    pub base_url: Option<String>,

    /// Resolve the bucket from the Host subdomain instead of the first path segment.
    #[builder(default = false)]
    pub virtual_buckets: bool,

    /// Log level filter string (e.g. `"info"`, `"s3gate_core=debug"`).
    #[builder(default = String::from("info"), setter(into))]
    pub log_level: String,

    /// Shortcut that appends a browseable filesystem target rooted here.
    #[builder(default, setter(strip_option, into))]
    pub local_path: Option<PathBuf>,

    /// Name of the `local_path` target.
    #[builder(default = String::from("local"), setter(into))]
    pub local_name: String,

    /// Default options per client kind.
    #[builder(default)]
    pub client_defaults: HashMap<ClientKind, TargetOptions>,

    /// Targets in configured order.
    #[builder(default)]
    pub targets: Vec<TargetConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GatewayConfig {
    /// Load configuration from defaults and environment variables only.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `S3GATE_LISTEN` | `0.0.0.0:8000` |
    /// | `S3GATE_BASE_URL` | *(unset)* |
    /// | `S3GATE_VIRTUAL_BUCKETS` | `false` |
    /// | `S3GATE_LOG_LEVEL` | `info` |
    /// | `S3GATE_LOCAL_PATH` | *(unset)* |
    /// | `S3GATE_LOCAL_NAME` | `local` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load the JSON file named by `S3GATE_CONFIG` (if set), then apply environment
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os("S3GATE_CONFIG") {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Read configuration from a JSON file.
    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse configuration from a JSON document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Overlay `S3GATE_*` environment variables.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("S3GATE_LISTEN") {
            self.listen = v;
        }
        if let Ok(v) = std::env::var("S3GATE_BASE_URL") {
            self.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("S3GATE_VIRTUAL_BUCKETS") {
            self.virtual_buckets = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("S3GATE_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Ok(v) = std::env::var("S3GATE_LOCAL_PATH") {
            self.local_path = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("S3GATE_LOCAL_NAME") {
            self.local_name = v;
        }
    }

    /// Targets in configured order, with the `local_path` shortcut appended.
    #[must_use]
    pub fn effective_targets(&self) -> Vec<TargetConfig> {
        let mut targets = self.targets.clone();
        if let Some(ref path) = self.local_path {
            targets.push(
                TargetConfig::builder()
                    .name(self.local_name.clone())
                    .client(ClientKind::File)
                    .options(TargetOptions::builder().path(path.clone()).build())
                    .build(),
            );
        }
        targets
    }

    /// Options for `target`, merged over the defaults for its client kind.
    #[must_use]
    pub fn merged_options(&self, target: &TargetConfig) -> TargetOptions {
        match self.client_defaults.get(&target.client) {
            Some(defaults) => target.options.merged_over(defaults),
            None => target.options.clone(),
        }
    }

    /// Host part of `base_url`, lowercased and without port.
    #[must_use]
    pub fn base_host(&self) -> Option<String> {
        self.base_url.as_deref().and_then(parse_host)
    }

    /// Check the structural invariants of the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref url) = self.base_url {
            if parse_host(url).is_none() {
                return Err(ConfigError::InvalidBaseUrl(url.clone()));
            }
        } else if self.virtual_buckets {
            return Err(ConfigError::InvalidBaseUrl(
                "virtualBuckets requires baseUrl".to_owned(),
            ));
        }

        let mut seen = HashSet::new();
        for target in self.effective_targets() {
            validate_name(&target.name, self.virtual_buckets)?;
            if !seen.insert(target.name.to_ascii_lowercase()) {
                return Err(ConfigError::DuplicateTarget(target.name));
            }
        }
        Ok(())
    }
}

fn validate_name(name: &str, virtual_buckets: bool) -> Result<(), ConfigError> {
    let invalid = |reason| ConfigError::InvalidTargetName {
        name: name.to_owned(),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.contains('/') {
        return Err(invalid("name contains '/'"));
    }
    if virtual_buckets
        && (name.starts_with('-')
            || name.ends_with('-')
            || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
    {
        return Err(invalid("name is not a valid DNS label"));
    }
    Ok(())
}

/// Extract the lowercase host (without port) from a URL such as `https://example.org:8000/`.
///
/// IPv6 hosts keep their brackets, matching the form a `Host` header carries.
fn parse_host(url: &str) -> Option<String> {
    let uri: http::Uri = url.parse().ok()?;
    if !matches!(uri.scheme_str(), Some("http" | "https")) {
        return None;
    }
    uri.host()
        .filter(|host| !host.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

//! Remote S3-compatible storage client built on `aws-sdk-s3`.
//!
//! Each target owns one SDK client and a semaphore bounding concurrent backend requests.
//! A GET keeps its permit until the body stream is finished or dropped, so slow readers
//! count against the pool and excess requests wait instead of opening new connections.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream as SdkByteStream;
use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use super::{ByteStream, Entry, EntryStream, StorageClient, StorageObject};
use crate::config::{
    ClientKind, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_POOL_SIZE,
    DEFAULT_READ_TIMEOUT_MS, DEFAULT_REGION, TargetOptions,
};
use crate::error::{GatewayError, GatewayResult};
use crate::streaming::ByteRange;

const LIST_PAGE_SIZE: i32 = 1000;
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Storage client delegating to a bucket on an S3-compatible endpoint.
#[derive(Clone)]
pub struct RemoteClient {
    target: String,
    client: Client,
    bucket: String,
    permits: Arc<Semaphore>,
    pool_size: usize,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("target", &self.target)
            .field("bucket", &self.bucket)
            .field("pool_size", &self.pool_size)
            .field("available", &self.permits.available_permits())
            .finish_non_exhaustive()
    }
}

impl RemoteClient {
    /// Wrap an existing SDK client.
    #[must_use]
    pub fn new(
        target: impl Into<String>,
        client: Client,
        bucket: impl Into<String>,
        pool_size: usize,
    ) -> Self {
        let pool_size = pool_size.max(1);
        Self {
            target: target.into(),
            client,
            bucket: bucket.into(),
            permits: Arc::new(Semaphore::new(pool_size)),
            pool_size,
        }
    }

    /// Build a client from merged target options.
    ///
    /// Credentials are read from `accessKeyPath`/`secretKeyPath` once, here. Without them
    /// the backend is accessed anonymously.
    pub async fn open(target: &str, options: &TargetOptions) -> GatewayResult<Self> {
        let misconfigured = |message: String| GatewayError::Configuration {
            target: target.to_owned(),
            message,
        };

        let bucket = options
            .bucket
            .clone()
            .ok_or_else(|| misconfigured("remote target requires `bucket`".to_owned()))?;
        let pool_size = options.pool_size.unwrap_or(DEFAULT_POOL_SIZE);
        if pool_size == 0 {
            return Err(misconfigured("`poolSize` must be positive".to_owned()));
        }

        let credentials = load_credentials(target, options).await?;

        let retry = RetryConfig::standard()
            .with_max_attempts(options.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS).max(1))
            .with_initial_backoff(INITIAL_BACKOFF);
        let timeouts = TimeoutConfig::builder()
            .connect_timeout(Duration::from_millis(
                options.connect_timeout_ms.unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS),
            ))
            .read_timeout(Duration::from_millis(
                options.read_timeout_ms.unwrap_or(DEFAULT_READ_TIMEOUT_MS),
            ))
            .build();
        let region = options
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_owned());

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .retry_config(retry)
            .timeout_config(timeouts);
        loader = match credentials {
            Some(credentials) => loader.credentials_provider(credentials),
            None => loader.no_credentials(),
        };
        if let Some(ref endpoint) = options.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let force_path_style = options
            .force_path_style
            .unwrap_or(options.endpoint.is_some());
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(force_path_style)
            .build();

        debug!(
            target_name = target,
            bucket = %bucket,
            endpoint = options.endpoint.as_deref().unwrap_or("aws"),
            pool_size,
            "remote client ready"
        );
        Ok(Self::new(
            target,
            Client::from_conf(s3_config),
            bucket,
            pool_size,
        ))
    }

    async fn permit(&self) -> GatewayResult<OwnedSemaphorePermit> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| GatewayError::Internal(anyhow::anyhow!("connection pool closed: {e}")))
    }

    fn map_sdk_error<E>(&self, err: SdkError<E>, key: &str) -> GatewayError
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    {
        map_sdk_error(&self.target, err, key)
    }
}

async fn load_credentials(
    target: &str,
    options: &TargetOptions,
) -> GatewayResult<Option<Credentials>> {
    let misconfigured = |message: String| GatewayError::Configuration {
        target: target.to_owned(),
        message,
    };
    match (&options.access_key_path, &options.secret_key_path) {
        (None, None) => Ok(None),
        (Some(access), Some(secret)) => {
            let read = |path: &std::path::Path| {
                let path = path.to_path_buf();
                async move {
                    tokio::fs::read_to_string(&path)
                        .await
                        .map(|s| s.trim().to_owned())
                        .map_err(|e| format!("cannot read {}: {e}", path.display()))
                }
            };
            let access_key = read(access).await.map_err(misconfigured)?;
            let secret_key = read(secret).await.map_err(misconfigured)?;
            if access_key.is_empty() || secret_key.is_empty() {
                return Err(misconfigured("credential file is empty".to_owned()));
            }
            Ok(Some(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "s3gate-key-files",
            )))
        }
        _ => Err(misconfigured(
            "`accessKeyPath` and `secretKeyPath` must be set together".to_owned(),
        )),
    }
}

fn map_sdk_error<E>(target: &str, err: SdkError<E>, key: &str) -> GatewayError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let unavailable = |message: String| GatewayError::BackendUnavailable {
        target: target.to_owned(),
        message,
    };
    match &err {
        SdkError::ServiceError(service_err) => {
            let status = service_err.raw().status().as_u16();
            match (status, service_err.err().code()) {
                (_, Some("NoSuchBucket")) => {
                    unavailable(format!("backend bucket does not exist (status {status})"))
                }
                (404, _) | (_, Some("NoSuchKey" | "NotFound")) => GatewayError::NoSuchKey {
                    key: key.to_owned(),
                },
                (416, _) | (_, Some("InvalidRange")) => GatewayError::InvalidRange {
                    range: String::new(),
                    size: 0,
                },
                (403, _) => unavailable("access denied by backend".to_owned()),
                (_, code) => unavailable(format!(
                    "backend returned {status} {}",
                    code.unwrap_or("without error code")
                )),
            }
        }
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            unavailable(DisplayErrorContext(&err).to_string())
        }
        _ => GatewayError::Internal(anyhow::anyhow!("{}", DisplayErrorContext(&err))),
    }
}

fn quote_etag(etag: Option<&str>) -> String {
    match etag {
        Some(e) if e.starts_with('"') => e.to_owned(),
        Some(e) => format!("\"{e}\""),
        None => "\"\"".to_owned(),
    }
}

fn to_chrono(dt: Option<&aws_sdk_s3::primitives::DateTime>) -> DateTime<Utc> {
    dt.and_then(|dt| DateTime::<Utc>::from_timestamp(dt.secs(), dt.subsec_nanos()))
        .unwrap_or_default()
}

fn to_size(len: Option<i64>) -> u64 {
    len.and_then(|l| u64::try_from(l).ok()).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Paginated scan
// ---------------------------------------------------------------------------

struct Scan {
    remote: RemoteClient,
    prefix: String,
    delimiter: Option<String>,
    start_after: Option<String>,
    token: Option<String>,
    buffer: VecDeque<Entry>,
    exhausted: bool,
}

impl Scan {
    async fn next_entry(&mut self) -> GatewayResult<Option<Entry>> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Ok(Some(entry));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_page().await?;
        }
    }

    async fn fetch_page(&mut self) -> GatewayResult<()> {
        let _permit = self.remote.permit().await?;
        let mut request = self
            .remote
            .client
            .list_objects_v2()
            .bucket(&self.remote.bucket)
            .prefix(&self.prefix)
            .max_keys(LIST_PAGE_SIZE)
            .set_delimiter(self.delimiter.clone());
        request = match self.token.take() {
            Some(token) => request.continuation_token(token),
            None => request.set_start_after(self.start_after.clone()),
        };
        let output = request
            .send()
            .await
            .map_err(|e| self.remote.map_sdk_error(e, &self.prefix))?;

        let mut entries: Vec<Entry> = output
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?;
                Some(Entry::Object(StorageObject {
                    key: key.to_owned(),
                    size: to_size(object.size()),
                    etag: quote_etag(object.e_tag()),
                    last_modified: to_chrono(object.last_modified()),
                }))
            })
            .chain(
                output
                    .common_prefixes()
                    .iter()
                    .filter_map(|cp| cp.prefix().map(|p| Entry::Prefix(p.to_owned()))),
            )
            .collect();
        entries.sort_by(|a, b| a.key().cmp(b.key()));
        self.buffer.extend(entries);

        self.token = output
            .next_continuation_token()
            .filter(|_| output.is_truncated() == Some(true))
            .map(str::to_owned);
        self.exhausted = self.token.is_none();
        Ok(())
    }
}

#[async_trait]
impl StorageClient for RemoteClient {
    fn kind(&self) -> ClientKind {
        ClientKind::S3
    }

    async fn head(&self, key: &str) -> GatewayResult<StorageObject> {
        let _permit = self.permit().await?;
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| self.map_sdk_error(e, key))?;

        Ok(StorageObject {
            key: key.to_owned(),
            size: to_size(output.content_length()),
            etag: quote_etag(output.e_tag()),
            last_modified: to_chrono(output.last_modified()),
        })
    }

    async fn scan(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        start_after: Option<&str>,
    ) -> GatewayResult<EntryStream> {
        let scan = Scan {
            remote: self.clone(),
            prefix: prefix.to_owned(),
            delimiter: delimiter.map(str::to_owned),
            start_after: start_after.map(str::to_owned),
            token: None,
            buffer: VecDeque::new(),
            exhausted: false,
        };
        let entries = stream::unfold(scan, |mut scan| async move {
            match scan.next_entry().await {
                Ok(Some(entry)) => Some((Ok(entry), scan)),
                Ok(None) => None,
                Err(e) => {
                    scan.buffer.clear();
                    scan.exhausted = true;
                    Some((Err(e), scan))
                }
            }
        });
        Ok(entries.boxed())
    }

    async fn read(
        &self,
        object: &StorageObject,
        range: Option<ByteRange>,
    ) -> GatewayResult<ByteStream> {
        let range_header = range.map(|r| format!("bytes={}-{}", r.start, r.end));
        let permit = self.permit().await?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object.key)
            .set_range(range_header.clone())
            .send()
            .await
            .map_err(|e| match self.map_sdk_error(e, &object.key) {
                // the object shrank after head
                GatewayError::InvalidRange { .. } => GatewayError::InvalidRange {
                    range: range_header.unwrap_or_default(),
                    size: object.size,
                },
                other => other,
            })?;

        let target = self.target.clone();
        let state: (SdkByteStream, OwnedSemaphorePermit) = (output.body, permit);
        let chunks = stream::unfold(Some(state), move |state| {
            let target = target.clone();
            async move {
                let (mut body, permit) = state?;
                match body.try_next().await {
                    Ok(Some(chunk)) => Some((Ok(chunk), Some((body, permit)))),
                    Ok(None) => None,
                    Err(e) => {
                        warn!(target_name = %target, error = %e, "backend body read failed");
                        Some((
                            Err(GatewayError::BackendUnavailable {
                                target,
                                message: e.to_string(),
                            }),
                            None,
                        ))
                    }
                }
            }
        });
        Ok(chunks.boxed())
    }
}

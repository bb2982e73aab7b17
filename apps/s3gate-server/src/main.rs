//! s3gate server - read-only S3-compatible gateway.
//!
//! Exposes configured filesystem directories and remote object stores as S3 buckets
//! through the `s3gate-http` service. Only GET and HEAD are served.
//!
//! # Usage
//!
//! ```text
//! S3GATE_LOCAL_PATH=/srv/data s3gate-server
//! S3GATE_CONFIG=/etc/s3gate.json s3gate-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `S3GATE_CONFIG` | *(unset)* | JSON configuration file |
//! | `S3GATE_LISTEN` | `0.0.0.0:8000` | Bind address |
//! | `S3GATE_BASE_URL` | *(unset)* | Public URL, required for virtual buckets |
//! | `S3GATE_VIRTUAL_BUCKETS` | `false` | Resolve buckets from the Host subdomain |
//! | `S3GATE_LOCAL_PATH` | *(unset)* | Serve this directory as a bucket |
//! | `S3GATE_LOCAL_NAME` | `local` | Bucket name for `S3GATE_LOCAL_PATH` |
//! | `S3GATE_LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `S3GATE_LOG_LEVEL`) |
//!
//! Sending `SIGHUP` re-reads the configuration and swaps in a rebuilt target registry.

mod handler;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use s3gate_core::{GatewayConfig, RegistryHandle, S3Gateway, TargetRegistry};
use s3gate_http::dispatch::S3Handler;
use s3gate_http::service::{S3HttpConfig, S3HttpService};

use crate::handler::GatewayHandler;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the configured log level.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Load and validate the configuration.
fn load_config() -> Result<GatewayConfig> {
    let config = GatewayConfig::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Build the [`S3HttpConfig`] from the gateway configuration.
fn build_http_config(config: &GatewayConfig) -> S3HttpConfig {
    S3HttpConfig {
        base_host: config.base_host(),
        virtual_hosting: config.virtual_buckets,
        ..S3HttpConfig::default()
    }
}

/// Resolve when the process is asked to stop (Ctrl-C, or `SIGTERM` on unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/// Rebuild the registry on every `SIGHUP`.
///
/// A configuration that fails to load or validate is logged and the current registry
/// stays in place. Requests already resolved keep the registry they started with.
#[cfg(unix)]
fn spawn_reload_task(handle: RegistryHandle) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(sig) => sig,
        Err(e) => {
            warn!(error = %e, "cannot install SIGHUP handler, reload disabled");
            return;
        }
    };

    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!("received SIGHUP, reloading configuration");
            match load_config() {
                Ok(config) => {
                    let registry = TargetRegistry::build(&config).await;
                    let targets = registry.len();
                    handle.replace(registry);
                    info!(targets, "target registry reloaded");
                }
                Err(e) => {
                    let reason = format!("{e:#}");
                    error!(error = %reason, "reload failed, keeping current registry");
                }
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_task(_handle: RegistryHandle) {}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve<H: S3Handler>(listener: TcpListener, service: S3HttpService<H>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        shutdown_signal().await;
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Address the health probe connects to. Wildcard binds are probed on loopback.
fn probe_addr(listen: &str) -> String {
    listen
        .replace("0.0.0.0", "127.0.0.1")
        .replace("[::]", "[::1]")
}

/// Request `/health` from a running gateway.
///
/// Succeeds only on a 200 response reporting the gateway as running.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.starts_with("HTTP/1.1 200") && response.contains("\"status\":\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for container HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let listen = GatewayConfig::load()
            .map_or_else(|_| GatewayConfig::from_env().listen, |config| config.listen);
        let healthy = run_health_check(&probe_addr(&listen)).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = load_config()?;

    init_tracing(&config.log_level)?;

    info!(
        listen = %config.listen,
        base_url = ?config.base_url,
        virtual_buckets = config.virtual_buckets,
        version = VERSION,
        "starting s3gate",
    );

    let registry = TargetRegistry::build(&config).await;
    if registry.is_empty() {
        warn!("no targets configured, every bucket request will fail");
    }
    let handle = RegistryHandle::new(registry);
    spawn_reload_task(handle.clone());

    let handler = GatewayHandler(S3Gateway::with_handle(handle));
    let service = S3HttpService::new(handler, build_http_config(&config));

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}

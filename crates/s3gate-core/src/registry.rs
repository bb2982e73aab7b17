//! Target registry: configured targets bound to live storage clients.
//!
//! The registry is built once from a validated [`GatewayConfig`] and is read-only afterwards.
//! A target whose client cannot be built is kept, marked unavailable, and answers with
//! `ServiceUnavailable`; the other targets are unaffected. Reloading builds a new registry
//! and swaps it into the [`RegistryHandle`]; requests already in flight keep the `Arc` they
//! resolved.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::{ClientKind, GatewayConfig, TargetConfig, TargetOptions};
use crate::error::{GatewayError, GatewayResult};
use crate::storage::{FileClient, RemoteClient, ScopedClient, StorageClient};

/// Whether a target has a working client.
#[derive(Debug, Clone)]
pub enum TargetState {
    /// The client was built.
    Ready(Arc<dyn StorageClient>),
    /// Building the client failed; the reason is reported to callers.
    Unavailable(String),
}

/// One registered target.
#[derive(Debug)]
pub struct Target {
    /// Configured name, in its configured spelling.
    pub name: String,
    /// Backend kind.
    pub kind: ClientKind,
    /// Whether the target shows up in the bucket listing.
    pub browseable: bool,
    /// Configured key prefix.
    pub prefix: Option<String>,
    state: TargetState,
}

impl Target {
    /// Create a target from its parts.
    #[must_use]
    pub fn new(config: &TargetConfig, state: TargetState) -> Self {
        Self {
            name: config.name.clone(),
            kind: config.client,
            browseable: config.browseable,
            prefix: config.prefix.clone(),
            state,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &TargetState {
        &self.state
    }

    /// The storage client, or `BackendUnavailable` when it failed to build.
    pub fn client(&self) -> GatewayResult<Arc<dyn StorageClient>> {
        match &self.state {
            TargetState::Ready(client) => Ok(Arc::clone(client)),
            TargetState::Unavailable(reason) => Err(GatewayError::BackendUnavailable {
                target: self.name.clone(),
                message: reason.clone(),
            }),
        }
    }
}

/// Build the client for one target from its merged options, applying prefix scoping.
pub async fn build_client(
    target: &TargetConfig,
    options: &TargetOptions,
) -> GatewayResult<Arc<dyn StorageClient>> {
    let base: Arc<dyn StorageClient> = match target.client {
        ClientKind::S3 => Arc::new(RemoteClient::open(&target.name, options).await?),
        ClientKind::File => Arc::new(FileClient::open(&target.name, options).await?),
    };
    let scoped = target
        .prefix
        .as_deref()
        .filter(|p| !p.trim_matches('/').is_empty());
    Ok(match scoped {
        Some(prefix) => Arc::new(ScopedClient::new(base, prefix)),
        None => base,
    })
}

/// Name → target map with configured ordering.
#[derive(Debug)]
pub struct TargetRegistry {
    targets: Vec<Arc<Target>>,
    index: HashMap<String, usize>,
    created_at: DateTime<Utc>,
}

impl TargetRegistry {
    /// Build every target of `config` concurrently. Never fails as a whole.
    pub async fn build(config: &GatewayConfig) -> Self {
        let configs = config.effective_targets();
        let built = futures::future::join_all(configs.iter().map(|target| {
            let options = config.merged_options(target);
            async move { build_client(target, &options).await }
        }))
        .await;

        let targets = configs
            .iter()
            .zip(built)
            .map(|(config, result)| {
                let state = match result {
                    Ok(client) => {
                        info!(target_name = %config.name, kind = config.client.as_str(), "target ready");
                        TargetState::Ready(client)
                    }
                    Err(e) => {
                        warn!(target_name = %config.name, error = %e, "target unavailable");
                        TargetState::Unavailable(e.to_string())
                    }
                };
                Target::new(config, state)
            })
            .collect();
        Self::from_targets(targets)
    }

    /// Build a registry from already constructed targets. Later duplicates are ignored.
    #[must_use]
    pub fn from_targets(targets: Vec<Target>) -> Self {
        let mut index = HashMap::with_capacity(targets.len());
        let mut kept = Vec::with_capacity(targets.len());
        for target in targets {
            let lower = target.name.to_ascii_lowercase();
            if index.contains_key(&lower) {
                warn!(target_name = %target.name, "duplicate target ignored");
                continue;
            }
            index.insert(lower, kept.len());
            kept.push(Arc::new(target));
        }
        Self {
            targets: kept,
            index,
            created_at: Utc::now(),
        }
    }

    /// Look up a target by name, case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Target>> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|&i| &self.targets[i])
    }

    /// Resolve a target and its client.
    pub fn resolve(&self, name: &str) -> GatewayResult<(Arc<Target>, Arc<dyn StorageClient>)> {
        let target = self.get(name).ok_or_else(|| GatewayError::NoSuchBucket {
            bucket: name.to_owned(),
        })?;
        let client = target.client()?;
        Ok((Arc::clone(target), client))
    }

    /// Browseable targets in configured order.
    #[must_use]
    pub fn list_browseable(&self) -> Vec<Arc<Target>> {
        self.targets
            .iter()
            .filter(|t| t.browseable)
            .cloned()
            .collect()
    }

    /// Number of targets, including unavailable ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether no target is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// When this registry was built. Reported as the bucket creation date.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Shared, swappable pointer to the current registry.
#[derive(Debug, Clone)]
pub struct RegistryHandle(Arc<RwLock<Arc<TargetRegistry>>>);

impl RegistryHandle {
    /// Wrap an initial registry.
    #[must_use]
    pub fn new(registry: TargetRegistry) -> Self {
        Self(Arc::new(RwLock::new(Arc::new(registry))))
    }

    /// Snapshot of the current registry.
    #[must_use]
    pub fn current(&self) -> Arc<TargetRegistry> {
        Arc::clone(&self.0.read())
    }

    /// Swap in a new registry, returning the old one.
    pub fn replace(&self, registry: TargetRegistry) -> Arc<TargetRegistry> {
        std::mem::replace(&mut *self.0.write(), Arc::new(registry))
    }
}

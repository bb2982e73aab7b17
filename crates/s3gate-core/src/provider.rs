//! The gateway provider.
//!
//! [`S3Gateway`] owns the swappable target registry. The S3 operations it serves are
//! implemented in the [`crate::ops`] submodules as `handle_*` methods; the server binary
//! bridges them to the HTTP layer.

use crate::registry::{RegistryHandle, TargetRegistry};

/// Owner ID reported in bucket listings and ACLs.
pub const OWNER_ID: &str = "1";

/// Owner display name reported in bucket listings and ACLs.
pub const OWNER_DISPLAY_NAME: &str = "unknown";

/// Read-only S3 gateway over the configured targets.
///
/// Cloning is cheap; clones share the same registry handle.
///
/// # Examples
///
/// ```
/// use s3gate_core::S3Gateway;
/// use s3gate_core::registry::TargetRegistry;
///
/// let gateway = S3Gateway::new(TargetRegistry::from_targets(Vec::new()));
/// assert!(gateway.registry().current().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct S3Gateway {
    pub(crate) registry: RegistryHandle,
}

impl S3Gateway {
    /// Create a gateway serving `registry`.
    #[must_use]
    pub fn new(registry: TargetRegistry) -> Self {
        Self::with_handle(RegistryHandle::new(registry))
    }

    /// Create a gateway over an existing handle, e.g. one shared with a reload task.
    #[must_use]
    pub fn with_handle(registry: RegistryHandle) -> Self {
        Self { registry }
    }

    /// The registry handle.
    #[must_use]
    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }
}

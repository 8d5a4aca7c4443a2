use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::LeaseError;
use crate::lease::Lease;

/// A freshly issued secret and the lease that governs it.
#[derive(Debug, Clone)]
pub struct IssuedSecret {
    pub lease: Lease,
    pub data: Map<String, Value>,
}

/// Issues and maintains secrets for a lease manager.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Requests a new secret at `{backend}/{key}`.
    async fn request(&self, backend: &str, key: &str) -> Result<IssuedSecret, LeaseError>;

    /// Extends a renewable lease.
    async fn renew(&self, lease: &Lease) -> Result<Lease, LeaseError>;

    async fn revoke(&self, lease: &Lease) -> Result<(), LeaseError>;
}

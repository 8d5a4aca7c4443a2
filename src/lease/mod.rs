//! Lease lifecycle: events, listeners and the managers that emit them.

pub mod bridge;
pub mod container;
pub mod source;

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::aws::metadata::CredentialMetadata;
use crate::error::LeaseError;

/// Identity of a request registered with a lease manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestHandle(u64);

impl From<u64> for RequestHandle {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Display for RequestHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl From<u64> for ListenerId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaseEventKind {
    Created,
    Renewed,
    Rotated,
    Error,
    Revoked,
}

impl LeaseEventKind {
    /// Whether new credentials were issued. A rotation replaces the secret, a
    /// renewal only extends the current lease.
    pub fn is_creation(&self) -> bool {
        matches!(self, Self::Created | Self::Rotated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub lease_id: Option<String>,
    pub lease_duration: Duration,
    pub renewable: bool,
}

impl Lease {
    pub fn new(lease_id: Option<String>, lease_duration: Duration, renewable: bool) -> Self {
        Self {
            lease_id,
            lease_duration,
            renewable,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeaseEvent {
    pub source: RequestHandle,
    pub kind: LeaseEventKind,
    pub lease: Option<Lease>,
    /// Secret data after key transformation, set on creation events.
    pub properties: Option<Map<String, Value>>,
    pub error: Option<String>,
}

impl LeaseEvent {
    pub fn new(source: RequestHandle, kind: LeaseEventKind) -> Self {
        Self {
            source,
            kind,
            lease: None,
            properties: None,
            error: None,
        }
    }

    pub fn with_lease(mut self, lease: Lease) -> Self {
        self.lease = Some(lease);
        self
    }

    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Receives every event emitted by a lease manager. May be invoked from a
/// background task, concurrently with registration of other requests.
pub trait LeaseListener: Send + Sync {
    fn on_lease_event(&self, event: &LeaseEvent);
}

pub trait LeaseManager: Send + Sync {
    fn register_request(&self, metadata: CredentialMetadata) -> Result<RequestHandle, LeaseError>;

    /// Adds a listener whose lifetime is bound to `owner`: it is dropped when
    /// `owner` is deregistered.
    fn add_lease_listener(
        &self,
        owner: RequestHandle,
        listener: Arc<dyn LeaseListener>,
    ) -> Result<ListenerId, LeaseError>;

    fn deregister(&self, handle: RequestHandle);
}

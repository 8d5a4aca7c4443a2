use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::aws::credential_type::CredentialType;
use crate::aws::descriptor::CredentialDescriptor;
use crate::aws::metadata::CredentialMetadata;
use crate::error::LeaseError;
use crate::lease::{LeaseEvent, LeaseListener, LeaseManager, ListenerId, RequestHandle};

/// Published whenever new STS credentials were issued for a request, so that
/// consumers holding the previous credentials can rebind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebindEvent {
    pub source: RequestHandle,
    pub credential_type: CredentialType,
    pub name: String,
}

/// Fire-and-forget publication of rebind notifications.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, event: RebindEvent);
}

impl NotificationSink for UnboundedSender<RebindEvent> {
    fn publish(&self, event: RebindEvent) {
        if let Err(err) = self.send(event) {
            log::warn!("Rebind notification for request {} dropped: receiver closed", err.0.source);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn publish(&self, _: RebindEvent) {}
}

/// Forwards creation events of one registered request as [`RebindEvent`]s.
pub struct LeaseRenewalBridge {
    handle: RequestHandle,
    descriptor: CredentialDescriptor,
    name: String,
    sink: Arc<dyn NotificationSink>,
}

impl std::fmt::Debug for LeaseRenewalBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseRenewalBridge")
            .field("handle", &self.handle)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

impl LeaseRenewalBridge {
    pub fn new(
        handle: RequestHandle,
        descriptor: CredentialDescriptor,
        name: String,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            handle,
            descriptor,
            name,
            sink,
        }
    }

    pub fn handle(&self) -> RequestHandle {
        self.handle
    }
}

impl LeaseListener for LeaseRenewalBridge {
    fn on_lease_event(&self, event: &LeaseEvent) {
        if event.source != self.handle || !event.kind.is_creation() {
            return;
        }
        log::debug!("Publishing a rebind event for {}", self.name);
        self.sink.publish(RebindEvent {
            source: self.handle,
            credential_type: self.descriptor.credential_type(),
            name: self.name.clone(),
        });
    }
}

/// Outcome of registering credential metadata with a lease manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub handle: RequestHandle,
    /// Set for leasing credential types only.
    pub listener: Option<ListenerId>,
}

pub fn register(
    metadata: CredentialMetadata,
    manager: &dyn LeaseManager,
    sink: Arc<dyn NotificationSink>,
) -> Result<Registration, LeaseError> {
    let hook = metadata.clone();
    let handle = manager.register_request(metadata)?;
    let listener = match hook.after_registration(handle, manager, sink) {
        Ok(listener) => listener,
        Err(err) => {
            manager.deregister(handle);
            return Err(err);
        }
    };
    Ok(Registration { handle, listener })
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::join_all;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::aws::credential_type::LeaseMode;
use crate::aws::metadata::CredentialMetadata;
use crate::config::LeaseSettings;
use crate::error::LeaseError;
use crate::lease::source::{IssuedSecret, SecretSource};
use crate::lease::{
    Lease, LeaseEvent, LeaseEventKind, LeaseListener, LeaseManager, ListenerId, RequestHandle,
};

struct ManagedRequest {
    metadata: CredentialMetadata,
    lease: Option<Lease>,
    task: Option<JoinHandle<()>>,
}

struct ListenerEntry {
    id: ListenerId,
    owner: RequestHandle,
    listener: Arc<dyn LeaseListener>,
}

#[derive(Default)]
struct ContainerState {
    requests: HashMap<RequestHandle, ManagedRequest>,
    listeners: Vec<ListenerEntry>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<ContainerState>,
    // Held for a whole delivery so no event of a request follows its `Revoked`.
    delivery: Mutex<()>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ContainerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers `event` to every listener, unless its request is gone.
    /// Listeners must not call back into the container.
    fn dispatch(&self, event: &LeaseEvent) {
        let _delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        let listeners: Vec<Arc<dyn LeaseListener>> = {
            let state = self.lock();
            if event.kind != LeaseEventKind::Revoked && !state.requests.contains_key(&event.source) {
                log::debug!("Dropping {:?} event of deregistered request {}", event.kind, event.source);
                return;
            }
            state
                .listeners
                .iter()
                .map(|entry| Arc::clone(&entry.listener))
                .collect()
        };
        for listener in listeners {
            listener.on_lease_event(event);
        }
    }
}

/// Lease manager that issues registered requests from a [`SecretSource`] and
/// keeps them alive according to their [`LeaseMode`].
///
/// Requests registered before or after [`start`](Self::start) are only
/// issued by a call to `start`, so listeners attached right after
/// registration never miss the first `Created` event. Dropping the container
/// aborts every lifecycle task and releases its listeners without revoking.
pub struct SecretLeaseContainer<S: SecretSource + 'static> {
    source: Arc<S>,
    settings: LeaseSettings,
    shared: Arc<Shared>,
    next_handle: AtomicU64,
    next_listener: AtomicU64,
}

impl<S: SecretSource + 'static> std::fmt::Debug for SecretLeaseContainer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("SecretLeaseContainer")
            .field("settings", &self.settings)
            .field("requests", &state.requests.len())
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

impl<S: SecretSource + 'static> SecretLeaseContainer<S> {
    pub fn new(source: Arc<S>, settings: LeaseSettings) -> Self {
        Self {
            source,
            settings,
            shared: Arc::new(Shared::default()),
            next_handle: AtomicU64::new(1),
            next_listener: AtomicU64::new(1),
        }
    }

    pub fn settings(&self) -> &LeaseSettings {
        &self.settings
    }

    /// Current lease of a request, once issued.
    pub fn lease(&self, handle: RequestHandle) -> Option<Lease> {
        self.shared.lock()
            .requests
            .get(&handle)
            .and_then(|request| request.lease.clone())
    }

    /// Spawns a lifecycle task for every registered request not yet running.
    /// Returns how many were started.
    pub fn start(&self) -> Result<usize, LeaseError> {
        let runtime = Handle::try_current().map_err(|_| LeaseError::NoRuntime)?;
        let mut state = self.shared.lock();
        let mut started = 0;
        for (handle, request) in state.requests.iter_mut() {
            if request.task.is_some() {
                continue;
            }
            let lifecycle = Lifecycle {
                source: Arc::clone(&self.source),
                settings: self.settings.clone(),
                shared: Arc::clone(&self.shared),
                handle: *handle,
                metadata: request.metadata.clone(),
            };
            request.task = Some(runtime.spawn(lifecycle.run()));
            started += 1;
        }
        log::debug!("Started {} lease lifecycle(s)", started);
        Ok(started)
    }

    pub fn remove_lease_listener(&self, id: ListenerId) -> bool {
        let mut state = self.shared.lock();
        let before = state.listeners.len();
        state.listeners.retain(|entry| entry.id != id);
        state.listeners.len() != before
    }

    /// Revokes the current lease of `handle` at the source, then deregisters it.
    pub async fn revoke(&self, handle: RequestHandle) -> Result<(), LeaseError> {
        let lease = {
            let state = self.shared.lock();
            match state.requests.get(&handle) {
                Some(request) => request.lease.clone(),
                None => return Err(LeaseError::UnknownRequest(handle)),
            }
        };
        let result = match &lease {
            Some(lease) => self.source.revoke(lease).await,
            None => Ok(()),
        };
        self.deregister(handle);
        result
    }

    /// Revokes every registered request.
    pub async fn shutdown(&self) {
        let handles: Vec<RequestHandle> = self.shared.lock().requests.keys().copied().collect();
        let results = join_all(handles.iter().map(|handle| self.revoke(*handle))).await;
        for (handle, result) in handles.iter().zip(results) {
            if let Err(err) = result {
                log::error!("Unable to revoke lease of request {}: {}", handle, err);
            }
        }
    }
}

impl<S: SecretSource + 'static> Drop for SecretLeaseContainer<S> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        for request in state.requests.values_mut() {
            if let Some(task) = request.task.take() {
                task.abort();
            }
        }
        log::debug!("Dropping lease container with {} request(s)", state.requests.len());
        state.requests.clear();
        state.listeners.clear();
    }
}

impl<S: SecretSource + 'static> LeaseManager for SecretLeaseContainer<S> {
    fn register_request(&self, metadata: CredentialMetadata) -> Result<RequestHandle, LeaseError> {
        let handle = RequestHandle::from(self.next_handle.fetch_add(1, Ordering::SeqCst));
        log::debug!("Registering request {} for {}", handle, metadata.path());
        self.shared.lock().requests.insert(
            handle,
            ManagedRequest {
                metadata,
                lease: None,
                task: None,
            },
        );
        Ok(handle)
    }

    fn add_lease_listener(
        &self,
        owner: RequestHandle,
        listener: Arc<dyn LeaseListener>,
    ) -> Result<ListenerId, LeaseError> {
        let mut state = self.shared.lock();
        if !state.requests.contains_key(&owner) {
            return Err(LeaseError::UnknownRequest(owner));
        }
        let id = ListenerId::from(self.next_listener.fetch_add(1, Ordering::SeqCst));
        state.listeners.push(ListenerEntry { id, owner, listener });
        Ok(id)
    }

    fn deregister(&self, handle: RequestHandle) {
        let removed = self.shared.lock().requests.remove(&handle);
        let Some(request) = removed else {
            return;
        };
        if let Some(task) = request.task {
            task.abort();
        }

        let mut event = LeaseEvent::new(handle, LeaseEventKind::Revoked);
        if let Some(lease) = request.lease {
            event = event.with_lease(lease);
        }
        self.shared.dispatch(&event);

        let mut state = self.shared.lock();
        let before = state.listeners.len();
        state.listeners.retain(|entry| entry.owner != handle);
        log::debug!(
            "Deregistered request {}, dropped {} listener(s)",
            handle,
            before - state.listeners.len()
        );
    }
}

struct Lifecycle<S: SecretSource> {
    source: Arc<S>,
    settings: LeaseSettings,
    shared: Arc<Shared>,
    handle: RequestHandle,
    metadata: CredentialMetadata,
}

impl<S: SecretSource> Lifecycle<S> {
    async fn run(self) {
        let mode = self.metadata.lease_mode();
        let secret = self.issue().await;
        let mut lease = secret.lease.clone();
        self.publish_secret(LeaseEventKind::Created, secret);

        if mode == LeaseMode::None {
            return;
        }

        let mut delay = self.settings.renewal_delay(lease.lease_duration);
        loop {
            tokio::time::sleep(delay).await;

            if mode == LeaseMode::Renew && self.extensible(&lease) {
                match self.source.renew(&lease).await {
                    Ok(renewed) => {
                        log::info!("Renewed lease for {}", self.metadata.path());
                        self.record(&renewed);
                        self.shared.dispatch(
                            &LeaseEvent::new(self.handle, LeaseEventKind::Renewed).with_lease(renewed.clone()),
                        );
                        delay = if self.extensible(&renewed) {
                            self.settings.renewal_delay(renewed.lease_duration)
                        } else {
                            log::info!("Lease for {} reached its maximum TTL, rotating", self.metadata.path());
                            Duration::ZERO
                        };
                        lease = renewed;
                    }
                    Err(err) => {
                        self.publish_error(&format!("lease renewal failed: {}", err));
                        delay = self.settings.retry_delay;
                    }
                }
            } else {
                match self.source.request(self.metadata.secret_backend(), self.metadata.secret_key()).await {
                    Ok(rotated) => {
                        log::info!("Rotated secret for {}", self.metadata.path());
                        lease = rotated.lease.clone();
                        delay = self.settings.renewal_delay(lease.lease_duration);
                        self.publish_secret(LeaseEventKind::Rotated, rotated);
                    }
                    Err(err) => {
                        self.publish_error(&format!("secret rotation failed: {}", err));
                        delay = self.settings.retry_delay;
                    }
                }
            }
        }
    }

    // A lease at or below the expiry threshold can no longer be usefully extended.
    fn extensible(&self, lease: &Lease) -> bool {
        lease.renewable && lease.lease_duration > self.settings.expiry_threshold
    }

    async fn issue(&self) -> IssuedSecret {
        loop {
            match self.source.request(self.metadata.secret_backend(), self.metadata.secret_key()).await {
                Ok(secret) => {
                    log::info!("Issued secret for {}", self.metadata.name());
                    return secret;
                }
                Err(err) => self.publish_error(&format!("secret request failed: {}", err)),
            }
            tokio::time::sleep(self.settings.retry_delay).await;
        }
    }

    fn record(&self, lease: &Lease) {
        if let Some(request) = self.shared.lock().requests.get_mut(&self.handle) {
            request.lease = Some(lease.clone());
        }
    }

    fn publish_secret(&self, kind: LeaseEventKind, secret: IssuedSecret) {
        self.record(&secret.lease);
        let properties = self.metadata.transformer().apply(secret.data);
        let event = LeaseEvent::new(self.handle, kind)
            .with_lease(secret.lease)
            .with_properties(properties);
        self.shared.dispatch(&event);
    }

    fn publish_error(&self, message: &str) {
        log::error!("{} ({})", message, self.metadata.path());
        self.shared.dispatch(&LeaseEvent::new(self.handle, LeaseEventKind::Error).with_error(message));
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use crate::aws::credential_type::{required_lease_mode, CredentialType, LeaseMode};
use crate::aws::descriptor::CredentialDescriptor;
use crate::aws::path;
use crate::aws::transformer::{build_transformer, KeyTransformer};
use crate::error::{CredentialError, LeaseError};
use crate::lease::bridge::{LeaseRenewalBridge, NotificationSink};
use crate::lease::{LeaseManager, ListenerId, RequestHandle};

/// What every credential request exposes, regardless of its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendMetadata {
    name: String,
    path: String,
    backend: String,
    key: String,
    transformer: KeyTransformer,
    variables: HashMap<String, String>,
}

impl BackendMetadata {
    pub(crate) fn from_descriptor(descriptor: &CredentialDescriptor) -> Result<Self, CredentialError> {
        let backend = descriptor.backend();
        let role = descriptor.role();
        let credential_type = descriptor.credential_type();

        Ok(Self {
            name: path::display_name(backend, role),
            path: path::build_path(backend, role, credential_type)?,
            backend: backend.to_string(),
            key: path::secret_key(role, credential_type)?,
            transformer: build_transformer(descriptor)?,
            variables: path::build_variables(backend, role, credential_type)?,
        })
    }
}

/// Metadata of an STS credential request, which holds a lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeasingMetadata {
    metadata: BackendMetadata,
    descriptor: CredentialDescriptor,
}

impl LeasingMetadata {
    pub(crate) fn new(metadata: BackendMetadata, descriptor: CredentialDescriptor) -> Self {
        Self { metadata, descriptor }
    }

    pub fn descriptor(&self) -> &CredentialDescriptor {
        &self.descriptor
    }

    pub fn lease_mode(&self) -> LeaseMode {
        required_lease_mode(self.descriptor.credential_type())
    }

    /// Subscribes a [`LeaseRenewalBridge`] for `handle` so that every issuance
    /// of this request is re-published on `sink`.
    pub fn after_registration(
        &self,
        handle: RequestHandle,
        manager: &dyn LeaseManager,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<ListenerId, LeaseError> {
        let bridge = LeaseRenewalBridge::new(
            handle,
            self.descriptor.clone(),
            self.metadata.name.clone(),
            sink,
        );
        manager.add_lease_listener(handle, Arc::new(bridge))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialMetadata {
    IamUser(BackendMetadata),
    AssumedRole(LeasingMetadata),
    FederationToken(LeasingMetadata),
}

impl CredentialMetadata {
    fn backend_metadata(&self) -> &BackendMetadata {
        match self {
            Self::IamUser(metadata) => metadata,
            Self::AssumedRole(leasing) | Self::FederationToken(leasing) => &leasing.metadata,
        }
    }

    pub fn credential_type(&self) -> CredentialType {
        match self {
            Self::IamUser(_) => CredentialType::IamUser,
            Self::AssumedRole(_) => CredentialType::AssumedRole,
            Self::FederationToken(_) => CredentialType::FederationToken,
        }
    }

    pub fn name(&self) -> &str {
        &self.backend_metadata().name
    }

    pub fn path(&self) -> &str {
        &self.backend_metadata().path
    }

    pub fn transformer(&self) -> &KeyTransformer {
        &self.backend_metadata().transformer
    }

    pub fn variables(&self) -> &HashMap<String, String> {
        &self.backend_metadata().variables
    }

    /// Mount of the secrets engine.
    pub fn secret_backend(&self) -> &str {
        &self.backend_metadata().backend
    }

    /// Key of the secret relative to [`Self::secret_backend`].
    pub fn secret_key(&self) -> &str {
        &self.backend_metadata().key
    }

    pub fn lease_mode(&self) -> LeaseMode {
        match self {
            Self::IamUser(_) => LeaseMode::None,
            Self::AssumedRole(leasing) | Self::FederationToken(leasing) => leasing.lease_mode(),
        }
    }

    pub fn leasing(&self) -> Option<&LeasingMetadata> {
        match self {
            Self::IamUser(_) => None,
            Self::AssumedRole(leasing) | Self::FederationToken(leasing) => Some(leasing),
        }
    }

    /// Runs once the request is registered with `manager`. IAM user
    /// credentials are static and attach nothing.
    pub fn after_registration(
        &self,
        handle: RequestHandle,
        manager: &dyn LeaseManager,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Option<ListenerId>, LeaseError> {
        match self.leasing() {
            Some(leasing) => leasing.after_registration(handle, manager, sink).map(Some),
            None => Ok(None),
        }
    }
}

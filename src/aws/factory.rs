use crate::aws::credential_type::CredentialType;
use crate::aws::descriptor::{CredentialDescriptor, CredentialProperties};
use crate::aws::metadata::{BackendMetadata, CredentialMetadata, LeasingMetadata};
use crate::error::CredentialError;

/// Builds the metadata matching the descriptor's credential type.
pub fn create(descriptor: &CredentialDescriptor) -> Result<CredentialMetadata, CredentialError> {
    let metadata = BackendMetadata::from_descriptor(descriptor)?;
    Ok(match descriptor.credential_type() {
        CredentialType::IamUser => CredentialMetadata::IamUser(metadata),
        CredentialType::AssumedRole => {
            CredentialMetadata::AssumedRole(LeasingMetadata::new(metadata, descriptor.clone()))
        }
        CredentialType::FederationToken => {
            CredentialMetadata::FederationToken(LeasingMetadata::new(metadata, descriptor.clone()))
        }
    })
}

/// Validates raw properties, then builds their metadata.
pub fn create_from_properties(properties: CredentialProperties) -> Result<CredentialMetadata, CredentialError> {
    let descriptor = CredentialDescriptor::try_from(properties)?;
    create(&descriptor)
}

/// Factory selected by the configured credential type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataFactory {
    /// IAM user credentials read from `creds/`
    Static,
    /// STS credentials read from `sts/`
    Sts,
}

impl MetadataFactory {
    pub fn for_credential_type(credential_type: CredentialType) -> Self {
        match credential_type {
            CredentialType::IamUser => Self::Static,
            CredentialType::AssumedRole | CredentialType::FederationToken => Self::Sts,
        }
    }

    pub fn supports(&self, credential_type: CredentialType) -> bool {
        Self::for_credential_type(credential_type) == *self
    }

    pub fn create(&self, descriptor: &CredentialDescriptor) -> Result<CredentialMetadata, CredentialError> {
        let credential_type = descriptor.credential_type();
        if !self.supports(credential_type) {
            return Err(CredentialError::validation(format!(
                "{:?} factory does not support credential-type {}",
                self, credential_type
            )));
        }
        create(descriptor)
    }
}

use std::io;

use thiserror::Error;
use vaultrs::error::ClientError;

use crate::lease::RequestHandle;

/// Errors raised while validating a credential request or building its metadata.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// A required string field is empty or missing
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Credential type outside of iam_user, assumed_role, federation_token
    #[error("Credential type `{0}' is not supported. Possible values: iam_user, assumed_role, federation_token")]
    UnsupportedCredentialType(String),

    /// Fields are individually valid but inconsistent with each other
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl CredentialError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Errors talking to Vault.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Vault client error: {0}")]
    Client(#[from] ClientError),

    #[error("Invalid Vault client settings: {0}")]
    Settings(String),

    #[error("Unable to read service account token: {0}")]
    Io(#[from] io::Error),

    #[error("Service account token could not be decoded: {0}")]
    InvalidServiceAccountToken(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Vault returned {status} for {path}: {message}")]
    Status {
        status: u16,
        path: String,
        message: String,
    },
}

/// Errors raised by a lease manager or a secret source.
#[derive(Error, Debug)]
pub enum LeaseError {
    #[error("Request {0} is not registered")]
    UnknownRequest(RequestHandle),

    #[error("Lease container must be used from within a tokio runtime")]
    NoRuntime,

    #[error("Secret source failed: {0}")]
    Source(String),

    #[error(transparent)]
    Vault(#[from] VaultError),
}

impl From<ClientError> for LeaseError {
    fn from(err: ClientError) -> Self {
        Self::Vault(VaultError::Client(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CredentialError::UnsupportedCredentialType("bogus".to_string());
        assert_eq!(
            err.to_string(),
            "Credential type `bogus' is not supported. Possible values: iam_user, assumed_role, federation_token"
        );

        let err = LeaseError::UnknownRequest(RequestHandle::from(7));
        assert_eq!(err.to_string(), "Request 7 is not registered");
    }
}

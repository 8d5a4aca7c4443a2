use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::aws::descriptor::CredentialProperties;
use crate::error::CredentialError;

/// Credential modes of the AWS secrets engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    IamUser,
    AssumedRole,
    FederationToken,
}

/// How an issued secret is kept alive by the lease manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaseMode {
    None,
    Renew,
    Rotate,
}

impl CredentialType {
    pub const ALL: [CredentialType; 3] = [
        CredentialType::IamUser,
        CredentialType::AssumedRole,
        CredentialType::FederationToken,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IamUser => "iam_user",
            Self::AssumedRole => "assumed_role",
            Self::FederationToken => "federation_token",
        }
    }

    /// STS-backed types return a session token and hold a lease.
    pub fn is_leasing(&self) -> bool {
        !matches!(self, Self::IamUser)
    }
}

impl Default for CredentialType {
    fn default() -> Self {
        Self::IamUser
    }
}

impl Display for CredentialType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CredentialType {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CredentialType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CredentialError::UnsupportedCredentialType(s.to_string()))
    }
}

pub fn required_lease_mode(credential_type: CredentialType) -> LeaseMode {
    match credential_type {
        CredentialType::IamUser => LeaseMode::None,
        CredentialType::AssumedRole => LeaseMode::Renew,
        CredentialType::FederationToken => LeaseMode::Rotate,
    }
}

/// Validates raw credential properties and returns the parsed credential type.
///
/// The type is checked first so that an unknown value is always reported as
/// `UnsupportedCredentialType`, regardless of the other fields.
pub fn validate(properties: &CredentialProperties) -> Result<CredentialType, CredentialError> {
    let credential_type = properties.credential_type.parse::<CredentialType>()?;

    require("backend", &properties.backend)?;
    require("role", &properties.role)?;
    require("access-key-property", &properties.access_key_property)?;
    require("secret-key-property", &properties.secret_key_property)?;

    if credential_type.is_leasing() && properties.session_token_key_property.trim().is_empty() {
        return Err(CredentialError::validation(format!(
            "session-token-key-property is required for credential-type {}",
            credential_type
        )));
    }

    Ok(credential_type)
}

pub(crate) fn require(field: &str, value: &str) -> Result<(), CredentialError> {
    if value.trim().is_empty() {
        Err(CredentialError::invalid_argument(format!("{} must not be empty", field)))
    } else {
        Ok(())
    }
}

use std::collections::HashMap;

use crate::aws::credential_type::{require, CredentialType};
use crate::error::CredentialError;

/// Key of the secret relative to its backend mount, e.g. `creds/readonly`.
pub fn secret_key(role: &str, credential_type: CredentialType) -> Result<String, CredentialError> {
    require("role", role)?;
    let prefix = match credential_type {
        CredentialType::IamUser => "creds",
        CredentialType::AssumedRole | CredentialType::FederationToken => "sts",
    };
    Ok(format!("{}/{}", prefix, role))
}

pub fn build_path(
    backend: &str,
    role: &str,
    credential_type: CredentialType,
) -> Result<String, CredentialError> {
    require("backend", backend)?;
    Ok(format!("{}/{}", backend, secret_key(role, credential_type)?))
}

pub fn display_name(backend: &str, role: &str) -> String {
    format!("{} with Role {}", backend, role)
}

/// Variables used to interpolate templated request paths.
pub fn build_variables(
    backend: &str,
    role: &str,
    credential_type: CredentialType,
) -> Result<HashMap<String, String>, CredentialError> {
    require("backend", backend)?;
    let mut variables = HashMap::new();
    variables.insert("backend".to_string(), backend.to_string());
    variables.insert("key".to_string(), secret_key(role, credential_type)?);
    Ok(variables)
}

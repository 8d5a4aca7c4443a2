use std::env;

use serde::{Deserialize, Serialize};

use crate::aws::credential_type::{self, CredentialType};
use crate::error::CredentialError;

pub const DEFAULT_BACKEND: &str = "aws";
pub const DEFAULT_ACCESS_KEY_PROPERTY: &str = "cloud.aws.credentials.accessKey";
pub const DEFAULT_SECRET_KEY_PROPERTY: &str = "cloud.aws.credentials.secretKey";
pub const DEFAULT_SESSION_TOKEN_KEY_PROPERTY: &str = "cloud.aws.credentials.sessionToken";

/// Credential settings as supplied by a property source, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CredentialProperties {
    pub backend: String,
    pub role: String,
    pub credential_type: String,
    pub access_key_property: String,
    pub secret_key_property: String,
    pub session_token_key_property: String,
}

impl Default for CredentialProperties {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            role: String::new(),
            credential_type: CredentialType::IamUser.to_string(),
            access_key_property: DEFAULT_ACCESS_KEY_PROPERTY.to_string(),
            secret_key_property: DEFAULT_SECRET_KEY_PROPERTY.to_string(),
            session_token_key_property: DEFAULT_SESSION_TOKEN_KEY_PROPERTY.to_string(),
        }
    }
}

impl CredentialProperties {
    /// Reads `VAULT_AWS_*` environment variables, falling back to the defaults.
    pub fn load_env() -> Self {
        let defaults = Self::default();
        Self {
            backend: env::var("VAULT_AWS_BACKEND").unwrap_or(defaults.backend),
            role: env::var("VAULT_AWS_ROLE").unwrap_or(defaults.role),
            credential_type: env::var("VAULT_AWS_CREDENTIAL_TYPE").unwrap_or(defaults.credential_type),
            access_key_property: env::var("VAULT_AWS_ACCESS_KEY_PROPERTY")
                .unwrap_or(defaults.access_key_property),
            secret_key_property: env::var("VAULT_AWS_SECRET_KEY_PROPERTY")
                .unwrap_or(defaults.secret_key_property),
            session_token_key_property: env::var("VAULT_AWS_SESSION_TOKEN_KEY_PROPERTY")
                .unwrap_or(defaults.session_token_key_property),
        }
    }
}

/// A validated, immutable request for AWS credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialDescriptor {
    backend: String,
    role: String,
    credential_type: CredentialType,
    access_key_property: String,
    secret_key_property: String,
    session_token_key_property: String,
}

impl CredentialDescriptor {
    pub fn builder(role: impl Into<String>, credential_type: CredentialType) -> CredentialDescriptorBuilder {
        CredentialDescriptorBuilder {
            properties: CredentialProperties {
                role: role.into(),
                credential_type: credential_type.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn credential_type(&self) -> CredentialType {
        self.credential_type
    }

    pub fn access_key_property(&self) -> &str {
        &self.access_key_property
    }

    pub fn secret_key_property(&self) -> &str {
        &self.secret_key_property
    }

    /// Only meaningful for leasing credential types.
    pub fn session_token_key_property(&self) -> Option<&str> {
        if self.credential_type.is_leasing() {
            Some(&self.session_token_key_property)
        } else {
            None
        }
    }
}

impl TryFrom<CredentialProperties> for CredentialDescriptor {
    type Error = CredentialError;

    fn try_from(properties: CredentialProperties) -> Result<Self, Self::Error> {
        let credential_type = credential_type::validate(&properties)?;
        Ok(Self {
            backend: properties.backend,
            role: properties.role,
            credential_type,
            access_key_property: properties.access_key_property,
            secret_key_property: properties.secret_key_property,
            session_token_key_property: properties.session_token_key_property,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CredentialDescriptorBuilder {
    properties: CredentialProperties,
}

impl CredentialDescriptorBuilder {
    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.properties.backend = backend.into();
        self
    }

    pub fn access_key_property(mut self, property: impl Into<String>) -> Self {
        self.properties.access_key_property = property.into();
        self
    }

    pub fn secret_key_property(mut self, property: impl Into<String>) -> Self {
        self.properties.secret_key_property = property.into();
        self
    }

    pub fn session_token_key_property(mut self, property: impl Into<String>) -> Self {
        self.properties.session_token_key_property = property.into();
        self
    }

    pub fn build(self) -> Result<CredentialDescriptor, CredentialError> {
        CredentialDescriptor::try_from(self.properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_properties() {
        let json = r#"{
            "backend": "cloud",
            "role": "deploy",
            "credential-type": "assumed_role",
            "session-token-key-property": "aws.token"
        }"#;
        let props: CredentialProperties = serde_json::from_str(json).unwrap();
        assert_eq!(props.backend, "cloud");
        assert_eq!(props.credential_type, "assumed_role");
        assert_eq!(props.access_key_property, DEFAULT_ACCESS_KEY_PROPERTY);
        assert_eq!(props.session_token_key_property, "aws.token");

        let descriptor = CredentialDescriptor::try_from(props).unwrap();
        assert_eq!(descriptor.credential_type(), CredentialType::AssumedRole);
        assert_eq!(descriptor.session_token_key_property(), Some("aws.token"));
    }

    #[test]
    fn test_default_credential_type_is_iam_user() {
        let props: CredentialProperties = serde_json::from_str(r#"{"role": "readonly"}"#).unwrap();
        let descriptor = CredentialDescriptor::try_from(props).unwrap();
        assert_eq!(descriptor.backend(), "aws");
        assert_eq!(descriptor.credential_type(), CredentialType::IamUser);
        assert_eq!(descriptor.session_token_key_property(), None);
    }

    #[test]
    fn test_builder_rejects_empty_backend() {
        let result = CredentialDescriptor::builder("readonly", CredentialType::IamUser)
            .backend("")
            .build();
        assert!(matches!(result, Err(CredentialError::InvalidArgument(_))));
    }
}

use crate::auth::method::AuthMethod;
use crate::aws::descriptor::CredentialProperties;
use crate::error::{CredentialError, VaultError};

use duration_string::DurationString;
use std::{env, num::ParseIntError, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::auth::kubernetes::KubernetesAuth;
use crate::auth::token::TokenAuth;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("VAULT_TOKEN must be set for token authentication")]
    MissingToken,
    #[error("Auth method {0} is not valid. Possible values: Token, Kubernetes")]
    UnknownAuthMethod(String),
    #[error("Error parsing {0} `{1}': {2}")]
    InvalidDuration(&'static str, String, String),
    #[error("Error parsing VAULT_LOGIN_RETRY_COUNT `{0}': {1}")]
    InvalidLoginRetryCount(String, ParseIntError),
    #[error("Unable to initialize Kubernetes authentication: {0}")]
    KubernetesAuthError(VaultError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

#[derive(Clone, Debug)]
pub struct VaultConfig {
    pub address: String,
    pub client_timeout: Duration,
    pub login_retry_count: u16,
    /// Lease assumed for secrets whose response carries no lease information.
    pub default_lease_duration: Duration,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: String::from("http://localhost:8200"),
            client_timeout: Duration::from_secs(5),
            login_retry_count: 5,
            default_lease_duration: Duration::from_secs(3600),
        }
    }
}

impl VaultConfig {
    pub fn load_env() -> Result<(Self, Arc<RwLock<dyn AuthMethod>>), ConfigError> {
        let method = env::var("VAULT_AUTH_METHOD")
            .unwrap_or_else(|_| String::from("Token"));

        let auth_method: Arc<RwLock<dyn AuthMethod>> = match method.as_str() {
            "Token" => {
                match env::var("VAULT_TOKEN") {
                    Ok(token) => Arc::new(RwLock::new(TokenAuth::new(token))),
                    Err(_) => return Err(ConfigError::MissingToken)
                }
            }
            "Kubernetes" => {
                let sa_token_path = env::var("VAULT_KUBERNETES_TOKEN_PATH").ok();
                let auth_mount_path = env::var("VAULT_AUTH_MOUNT_PATH").ok();
                let role = env::var("VAULT_KUBERNETES_ROLE_NAME").ok();
                match KubernetesAuth::new(auth_mount_path, sa_token_path, role) {
                    Ok(k_auth) => Arc::new(RwLock::new(k_auth)),
                    Err(err) => return Err(ConfigError::KubernetesAuthError(err))
                }
            }
            method => return Err(ConfigError::UnknownAuthMethod(method.to_string()))
        };

        let defaults = Self::default();
        let address = env::var("VAULT_ADDR").unwrap_or(defaults.address);
        let client_timeout = duration_var("VAULT_CLIENT_TIMEOUT", "5s")?;
        let login_retry_count = Self::get_login_retry_count()?;
        let default_lease_duration = duration_var("VAULT_LEASE_DEFAULT_DURATION", "1h")?;

        Ok((VaultConfig {
            address,
            client_timeout,
            login_retry_count,
            default_lease_duration,
        }, auth_method))
    }

    fn get_login_retry_count() -> Result<u16, ConfigError> {
        let retry_count_str = env::var("VAULT_LOGIN_RETRY_COUNT")
            .unwrap_or(String::from("5"));

        match retry_count_str.parse::<u16>() {
            Ok(retry_count) => Ok(retry_count),
            Err(err) => Err(ConfigError::InvalidLoginRetryCount(retry_count_str, err))
        }
    }
}

/// Timing of lease renewal and rotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaseSettings {
    /// Lower bound for the delay between two renewals
    pub min_renewal: Duration,
    /// How long before expiry a lease is renewed or rotated
    pub expiry_threshold: Duration,
    /// Delay before retrying a failed issuance or renewal
    pub retry_delay: Duration,
}

impl Default for LeaseSettings {
    fn default() -> Self {
        Self {
            min_renewal: Duration::from_secs(10),
            expiry_threshold: Duration::from_secs(60),
            retry_delay: Duration::from_secs(5),
        }
    }
}

impl LeaseSettings {
    pub fn load_env() -> Result<Self, ConfigError> {
        Ok(Self {
            min_renewal: duration_var("VAULT_LEASE_MIN_RENEWAL", "10s")?,
            expiry_threshold: duration_var("VAULT_LEASE_EXPIRY_THRESHOLD", "60s")?,
            retry_delay: duration_var("VAULT_LEASE_RETRY_DELAY", "5s")?,
        })
    }

    pub fn renewal_delay(&self, lease_duration: Duration) -> Duration {
        if lease_duration <= self.expiry_threshold {
            return self.min_renewal;
        }
        (lease_duration - self.expiry_threshold).max(self.min_renewal)
    }
}

/// Reads the AWS credential properties and checks them eagerly.
pub fn load_aws_properties() -> Result<CredentialProperties, ConfigError> {
    let properties = CredentialProperties::load_env();
    crate::aws::credential_type::validate(&properties)?;
    Ok(properties)
}

fn duration_var(name: &'static str, default: &str) -> Result<Duration, ConfigError> {
    let value = env::var(name).unwrap_or(String::from(default));

    match DurationString::from_string(value.clone()) {
        Ok(duration) => Ok(Duration::from(duration)),
        Err(err) => Err(ConfigError::InvalidDuration(name, value, err))
    }
}

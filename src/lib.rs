//! This library wires Vault's AWS secrets engine into applications.
//! It builds the request metadata for IAM user, STS assumed role and STS
//! federation token credentials, keeps their leases alive and notifies the
//! application whenever new credentials were issued.
//!
//! ## Installation
//! Add the following to your `Cargo.toml` file:
//! ```toml
//! [dependencies]
//! valensas-vault-aws = "0.1.0"
//! ```
//!
//! ## Usage
//! You should define following environment variables to configure Vault.
//!```yaml
//! VAULT_ADDR: "http://localhost:8200"
//! VAULT_CLIENT_TIMEOUT: 5s
//! VAULT_LOGIN_RETRY_COUNT: 5
//! VAULT_LEASE_DEFAULT_DURATION: 1h
//! ```
//!
//! For Kubernetes Configuration:
//! ```yaml
//! VAULT_AUTH_METHOD: Kubernetes
//! VAULT_KUBERNETES_ROLE_NAME: client
//! VAULT_KUBERNETES_TOKEN_PATH: /var/run/secrets/kubernetes.io/serviceaccount/token
//! ```
//!
//! For Token Configuration:
//! ```yaml
//! VAULT_AUTH_METHOD: Token
//! VAULT_TOKEN: token
//! ```
//!
//! AWS credentials:
//! ```yaml
//! VAULT_AWS_BACKEND: aws
//! VAULT_AWS_ROLE: readonly
//! VAULT_AWS_CREDENTIAL_TYPE: iam_user # or assumed_role, federation_token
//! VAULT_AWS_ACCESS_KEY_PROPERTY: cloud.aws.credentials.accessKey
//! VAULT_AWS_SECRET_KEY_PROPERTY: cloud.aws.credentials.secretKey
//! VAULT_AWS_SESSION_TOKEN_KEY_PROPERTY: cloud.aws.credentials.sessionToken
//! ```
//!
//! Lease renewal:
//! ```yaml
//! VAULT_LEASE_MIN_RENEWAL: 10s
//! VAULT_LEASE_EXPIRY_THRESHOLD: 60s
//! VAULT_LEASE_RETRY_DELAY: 5s
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use valensas_vault_aws::{aws, config, lease::{bridge, container::SecretLeaseContainer}, service::VaultService};
//!
//! let vault_service = VaultService::from_env().await?;
//! let metadata = aws::create_from_properties(config::load_aws_properties()?)?;
//!
//! let container = SecretLeaseContainer::new(vault_service, config::LeaseSettings::load_env()?);
//! let (sender, mut rebinds) = tokio::sync::mpsc::unbounded_channel();
//! let registration = bridge::register(metadata, &container, Arc::new(sender))?;
//! container.start()?;
//!
//! while let Some(event) = rebinds.recv().await {
//!     println!("new credentials for {}", event.name);
//! }
//! ```
pub mod auth;
pub mod aws;
pub mod config;
pub mod error;
pub mod lease;
pub mod service;

use async_trait::async_trait;
use std::{
    fmt::Debug,
    sync::Arc,
};
use tokio::sync::RwLock;
use vaultrs::{
    api::AuthInfo,
    client::VaultClient
};

use crate::error::VaultError;

#[derive(Debug)]
pub enum AuthResult {
    Token { token: String },
    AuthInfo { auth_info: AuthInfo },
}

impl AuthResult {
    pub fn token(token: String) -> AuthResult {
        AuthResult::Token { token }
    }

    pub fn auth_info(auth_info: AuthInfo) -> AuthResult {
        AuthResult::AuthInfo { auth_info }
    }

    /// Lease of the client token, when the login reported one.
    pub fn renewable_lease(&self) -> Option<u64> {
        match self {
            AuthResult::AuthInfo { auth_info } if auth_info.renewable => Some(auth_info.lease_duration),
            _ => None,
        }
    }
}

#[async_trait]
pub trait AuthMethod: Debug + Send + Sync {
    /// Logs in and stores the resulting token on `client`.
    async fn authenticate(
        &self,
        client: Arc<RwLock<VaultClient>>,
    ) -> Result<AuthResult, VaultError>;
}

use crate::auth::method::{AuthResult, AuthMethod};
use crate::config::VaultConfig;
use crate::error::{LeaseError, VaultError};
use crate::lease::source::{IssuedSecret, SecretSource};
use crate::lease::Lease;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::{sync::Arc, time::Duration};
use tokio::{sync::{RwLock, mpsc::{Receiver, Sender, channel}}, task::JoinHandle};
use vaultrs::client::{Client, VaultClient, VaultClientSettingsBuilder};

/// An authenticated Vault session.
pub struct VaultService {
    pub(crate) client: Arc<RwLock<VaultClient>>,
    pub(crate) auth_result: RwLock<AuthResult>,
    pub(crate) auth_method: Arc<RwLock<dyn AuthMethod>>,
    pub(crate) http: reqwest::Client,
    pub(crate) address: String,
    pub(crate) default_lease_duration: Duration,
}

/// Vault response envelope; lease fields are empty for non-leased secrets.
#[derive(Debug, Deserialize)]
struct SecretResponse {
    #[serde(default)]
    lease_id: String,
    #[serde(default)]
    lease_duration: u64,
    #[serde(default)]
    renewable: bool,
    #[serde(default)]
    data: Option<Map<String, Value>>,
}

impl SecretResponse {
    fn lease(&self, default_duration: Duration) -> Lease {
        let lease_id = (!self.lease_id.is_empty()).then(|| self.lease_id.clone());
        let lease_duration = match self.lease_duration {
            0 => default_duration,
            secs => Duration::from_secs(secs),
        };
        Lease::new(lease_id, lease_duration, self.renewable)
    }

    fn into_issued(self, default_duration: Duration) -> IssuedSecret {
        IssuedSecret {
            lease: self.lease(default_duration),
            data: self.data.unwrap_or_default(),
        }
    }
}

impl std::fmt::Debug for VaultService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultService")
        .field("auth_method", &self.auth_method)
        .field("address", &self.address)
        .field("default_lease_duration", &self.default_lease_duration)
        .finish()
    }
}

impl VaultService {
    /// Builds a session from `VAULT_*` environment variables, retrying the
    /// login `VAULT_LOGIN_RETRY_COUNT` times.
    pub async fn from_env() -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let (config, auth_method) = VaultConfig::load_env()?;

        let mut attempts = 0;
        loop {
            match Self::new(config.clone(), Arc::clone(&auth_method)).await {
                Ok(service) => return Ok(service),
                Err(err) if attempts < config.login_retry_count => {
                    log::warn!("could not login to vault, retrying: {}", err);
                    attempts += 1;
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub async fn new(config: VaultConfig, auth_method: Arc<RwLock<dyn AuthMethod>>) -> Result<Arc<Self>, VaultError> {
        let settings = VaultClientSettingsBuilder::default()
            .address(config.address.clone())
            .timeout(Some(config.client_timeout))
            .build()
            .map_err(|e| VaultError::Settings(e.to_string()))?;

        let client = Arc::new(RwLock::new(VaultClient::new(settings)?));
        let http = reqwest::Client::builder()
            .timeout(config.client_timeout)
            .build()?;
        let auth_result = auth_method
            .read().await
            .authenticate(Arc::clone(&client))
            .await?;

        Ok(Arc::new(Self {
            client,
            auth_result: RwLock::new(auth_result),
            auth_method,
            http,
            address: config.address,
            default_lease_duration: config.default_lease_duration,
        }))
    }

    async fn renew_token(&self) -> Result<(), VaultError> {
        log::debug!("Renewing Vault token");
        let mut client = self.client.write().await;
        match client.renew(None).await {
            Ok(auth_info) => {
                client.set_token(&auth_info.client_token);
                drop(client);
                *self.auth_result.write().await = AuthResult::auth_info(auth_info);
                log::info!("Successfully renewed Vault token");
                Ok(())
            }
            Err(err) => {
                log::info!("An error occurred during Vault token renewal\n{}", err);
                Err(err.into())
            }
        }
    }

    /// Sends a request to `/v1/{path}` with the session token. Non-2xx
    /// statuses are turned into [`VaultError::Status`].
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<reqwest::Response, VaultError> {
        let token = self.client.read().await.settings.token.clone();
        let url = format!("{}/v1/{}", self.address.trim_end_matches('/'), path);
        let mut request = self.http.request(method, url).header("X-Vault-Token", token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VaultError::Status {
                status: status.as_u16(),
                path: path.to_string(),
                message,
            });
        }
        Ok(response)
    }

    async fn login(&self) -> Result<(), VaultError> {
        let auth_result = self.auth_method
            .read().await
            .authenticate(Arc::clone(&self.client))
            .await?;
        *self.auth_result.write().await = auth_result;
        Ok(())
    }
}

#[async_trait]
impl SecretSource for VaultService {
    async fn request(&self, backend: &str, key: &str) -> Result<IssuedSecret, LeaseError> {
        log::debug!("Requesting secret {}/{}", backend, key);
        let response: SecretResponse = self
            .send(Method::GET, &format!("{}/{}", backend, key), None)
            .await?
            .json()
            .await
            .map_err(VaultError::from)?;
        Ok(response.into_issued(self.default_lease_duration))
    }

    async fn renew(&self, lease: &Lease) -> Result<Lease, LeaseError> {
        let lease_id = lease
            .lease_id
            .as_deref()
            .ok_or_else(|| LeaseError::Source("lease without id cannot be renewed".to_string()))?;
        log::debug!("Renewing lease {}", lease_id);
        let body = json!({
            "lease_id": lease_id,
            "increment": lease.lease_duration.as_secs(),
        });
        let response: SecretResponse = self
            .send(Method::PUT, "sys/leases/renew", Some(body))
            .await?
            .json()
            .await
            .map_err(VaultError::from)?;
        Ok(response.lease(self.default_lease_duration))
    }

    async fn revoke(&self, lease: &Lease) -> Result<(), LeaseError> {
        let Some(lease_id) = lease.lease_id.as_deref() else {
            log::debug!("Nothing to revoke for a secret without lease");
            return Ok(());
        };
        log::debug!("Revoking lease {}", lease_id);
        self.send(Method::PUT, "sys/leases/revoke", Some(json!({ "lease_id": lease_id })))
            .await?;
        Ok(())
    }
}

type ThreadHandler = Option<(JoinHandle<()>, Sender<()>)>;

#[async_trait]
pub trait TokenRenewable {
    fn start_token_renewal(&self) -> Result<ThreadHandler, VaultError>;

    fn start_token_renew_loop(
        &self,
        lease_duration: u64,
        sender: Sender<()>,
        receiver: Receiver<()>,
    ) -> (JoinHandle<()>, Sender<()>);

    async fn stop_token_renew_loop(&self, handler: (JoinHandle<()>, Sender<()>));
}

#[async_trait]
impl TokenRenewable for Arc<VaultService> {
    /// Start token renewal for `VaultClient` periodically.
    /// Periods determined from `lease_duration` value of the `auth_info`.
    fn start_token_renewal(&self) -> Result<ThreadHandler, VaultError> {
        let lease_duration = match self.auth_result.try_read() {
            Ok(auth_result) => auth_result.renewable_lease(),
            Err(_) => None,
        };
        match lease_duration {
            Some(lease_duration) => {
                let (sender, receiver) = channel::<()>(1);
                Ok(Some(self.start_token_renew_loop(lease_duration, sender, receiver)))
            }
            None => Ok(None),
        }
    }

    /// This function handles the inner loops for `start_token_renewal` function.
    /// It is not recommended to use manually.
    /// Instead of this function, use `start_token_renewal` directly
    fn start_token_renew_loop(
        &self,
        lease_duration: u64,
        sender: Sender<()>,
        mut receiver: Receiver<()>,
    ) -> (JoinHandle<()>, Sender<()>) {
        let service = Arc::clone(self);
        (tokio::spawn(async move {
            let time = Duration::from_secs(lease_duration.saturating_sub(5).max(1));
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + time, time);
            loop {
                tokio::select! {
                    _ = receiver.recv() => break,
                    _ = interval.tick() => {}
                }
                let mut renewed = false;
                for _ in 0..5 {
                    match service.renew_token().await {
                        Ok(_) => {
                            renewed = true;
                            break;
                        },
                        Err(err) => {
                            log::error!("retrying to renew token: {}", err);
                        }
                    };
                };
                if !renewed {
                    if let Err(err) = service.login().await {
                        log::error!("{}", err);
                    };
                }
            }
        }), sender)
    }

    async fn stop_token_renew_loop(&self, handler: (JoinHandle<()>, Sender<()>)) {
        let (handler, sender) = handler;
        let _ = sender.send(()).await;
        handler.abort();
    }
}

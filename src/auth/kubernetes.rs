use crate::auth::method::AuthMethod;
use crate::error::VaultError;

use std::{sync::Arc, fs};
use serde::{Deserialize, Serialize};
use async_trait::async_trait;
use tokio::sync::RwLock;
use base64::Engine;
use vaultrs::{
    auth::kubernetes,
    client::VaultClient,
    client::Client
};

use super::method::AuthResult;

const DEFAULT_SA_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

#[derive(Serialize, Deserialize)]
struct NameUUID {
    name: String,
    #[serde(rename = "uid")]
    uuid: String
}

#[derive(Serialize, Deserialize)]
struct KubernetesIO {
    serviceaccount: NameUUID
}

#[derive(Serialize, Deserialize)]
struct K8infos {
    #[serde(rename = "kubernetes.io")]
    kubernetes_io: KubernetesIO
}

#[derive(Debug)]
pub struct KubernetesAuth {
    mount: String,
    role: String,
    token: String
}

impl KubernetesAuth {
    /// Reads the service account token. Without an explicit `role`, the
    /// service account name found in the token is used.
    pub fn new(mount: Option<String>, sa_token_path: Option<String>, role: Option<String>) -> Result<Self, VaultError> {
        let token = fs::read_to_string(sa_token_path.unwrap_or(DEFAULT_SA_TOKEN_PATH.to_string()))?
            .trim()
            .to_string();

        let role = match role {
            Some(role) => role,
            None => service_account_name(&token)?,
        };

        Ok(Self {
            mount: mount.unwrap_or("kubernetes".to_string()),
            token,
            role
        })
    }
}

fn service_account_name(token: &str) -> Result<String, VaultError> {
    let encoded_k8_infos = token.split('.')
        .nth(1)
        .ok_or_else(|| VaultError::InvalidServiceAccountToken("token is not a JWT".to_string()))?;

    let decoded_k8_infos = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(encoded_k8_infos.trim_end_matches('='))
        .map_err(|e| VaultError::InvalidServiceAccountToken(e.to_string()))?;

    let k8infos = serde_json::from_slice::<K8infos>(&decoded_k8_infos)
        .map_err(|e| VaultError::InvalidServiceAccountToken(e.to_string()))?;

    Ok(k8infos.kubernetes_io.serviceaccount.name)
}

#[async_trait]
impl AuthMethod for KubernetesAuth {
    async fn authenticate(&self, client: Arc<RwLock<VaultClient>>) -> Result<AuthResult, VaultError> {
        let auth_info = {
            let vault_client = client.read().await;
            kubernetes::login(
                &*vault_client,
                &self.mount,
                &self.role,
                &self.token,
            ).await?
        };
        client.write().await.set_token(&auth_info.client_token);
        Ok(AuthResult::auth_info(auth_info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(claims: &str) -> String {
        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(claims);
        format!("eyJhbGciOiJSUzI1NiJ9.{}.c2lnbmF0dXJl", payload)
    }

    #[test]
    fn test_service_account_name() {
        let token = jwt(r#"{"kubernetes.io":{"serviceaccount":{"name":"billing","uid":"1234"}}}"#);
        assert_eq!(service_account_name(&token).unwrap(), "billing");
    }

    #[test]
    fn test_invalid_token() {
        assert!(matches!(
            service_account_name("not-a-jwt"),
            Err(VaultError::InvalidServiceAccountToken(_))
        ));
        assert!(matches!(
            service_account_name(&jwt(r#"{"sub":"nobody"}"#)),
            Err(VaultError::InvalidServiceAccountToken(_))
        ));
    }
}

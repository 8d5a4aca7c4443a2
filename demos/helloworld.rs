use std::sync::Arc;

use tokio::{signal::unix::{signal, SignalKind}, select, sync::{mpsc, RwLock}};
use valensas_vault_aws::{
    auth::{method::AuthMethod, token::TokenAuth},
    aws::{self, CredentialDescriptor, CredentialType},
    config::{self, LeaseSettings, VaultConfig},
    lease::{bridge::{self, RebindEvent}, container::SecretLeaseContainer},
    service::{TokenRenewable, VaultService},
};

/// Manually configure Vault service and an STS assumed role request
async fn manual_config() -> (Arc<VaultService>, aws::CredentialMetadata) {
    let config = VaultConfig {
        address: "http://localhost:8200".to_string(),
        ..Default::default()
    };
    let auth_method: Arc<RwLock<dyn AuthMethod>> = Arc::new(RwLock::new(TokenAuth::new("some_token".to_string())));
    let service = VaultService::new(config, auth_method).await.unwrap();

    let descriptor = CredentialDescriptor::builder("deploy", CredentialType::AssumedRole)
        .session_token_key_property("cloud.aws.credentials.sessionToken")
        .build()
        .unwrap();
    (service, aws::create(&descriptor).unwrap())
}

/// Configure Vault service and the AWS request from environment variables
async fn env_config() -> (Arc<VaultService>, aws::CredentialMetadata) {
    std::env::set_var("VAULT_ADDR", "http://127.0.0.1:8200");
    std::env::set_var("VAULT_TOKEN", "vault_token");
    std::env::set_var("VAULT_AUTH_METHOD", "Token");
    std::env::set_var("VAULT_AWS_ROLE", "readonly");
    let service = VaultService::from_env().await.unwrap();
    let properties = config::load_aws_properties().unwrap();
    (service, aws::create_from_properties(properties).unwrap())
}

#[tokio::main]
async fn main() {
    let (vault_service, metadata) = if std::env::var("VAULT_MANUAL_CONFIG").is_ok() {
        manual_config().await
    } else {
        env_config().await
    };

    // If the auth info indicates that the token is renewable, begin renewing cycle
    let token_renewal_handlers = match vault_service.start_token_renewal() {
        Ok(handler) => handler,
        Err(err) => {
            println!("token is not renewable: {}", err);
            return;
        }
    };

    let container = SecretLeaseContainer::new(Arc::clone(&vault_service), LeaseSettings::load_env().unwrap());
    let (sender, mut rebinds) = mpsc::unbounded_channel::<RebindEvent>();
    let registration = bridge::register(metadata, &container, Arc::new(sender)).unwrap();
    container.start().unwrap();
    println!("registered request {}", registration.handle);

    let mut sigterm = signal(SignalKind::terminate()).unwrap();
    let mut sigint = signal(SignalKind::interrupt()).unwrap();

    loop {
        select! {
            Some(event) = rebinds.recv() => println!("new credentials issued for {}", event.name),
            _ = sigterm.recv() => break,
            _ = sigint.recv() => break,
        }
    }

    // To gracefully shutdown, leases are released and the token renewal loop is stopped
    container.shutdown().await;
    if let Some(token_renewal_handlers) = token_renewal_handlers {
        vault_service.stop_token_renew_loop(token_renewal_handlers).await;
    }
    println!("Vault token renewal cycle shutdown gracefully");
}

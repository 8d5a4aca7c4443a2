//! Property-based tests for AWS credential metadata.
//!
//! Tests validate:
//! - request paths and variables for every credential type
//! - key transformer targets are never empty
//! - rebind notifications are scoped to a single request

use std::sync::Arc;

use proptest::prelude::*;
use tokio::sync::mpsc;
use valensas_vault_aws::aws::{self, CredentialDescriptor, CredentialProperties, CredentialType, LeaseMode};
use valensas_vault_aws::error::CredentialError;
use valensas_vault_aws::lease::bridge::{LeaseRenewalBridge, RebindEvent};
use valensas_vault_aws::lease::{LeaseEvent, LeaseEventKind, LeaseListener, RequestHandle};

fn segment_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,15}"
}

// Mount paths may be nested, e.g. `cloud/aws`
fn backend_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(segment_strategy(), 1..3).prop_map(|segments| segments.join("/"))
}

fn property_strategy() -> impl Strategy<Value = String> {
    "[a-z]{2,8}(\\.[a-zA-Z]{2,12}){1,3}"
}

fn credential_type_strategy() -> impl Strategy<Value = CredentialType> {
    prop_oneof![
        Just(CredentialType::IamUser),
        Just(CredentialType::AssumedRole),
        Just(CredentialType::FederationToken),
    ]
}

fn event_kind_strategy() -> impl Strategy<Value = LeaseEventKind> {
    prop_oneof![
        Just(LeaseEventKind::Created),
        Just(LeaseEventKind::Renewed),
        Just(LeaseEventKind::Rotated),
        Just(LeaseEventKind::Error),
        Just(LeaseEventKind::Revoked),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_path_matches_credential_type(
        backend in backend_strategy(),
        role in segment_strategy(),
        credential_type in credential_type_strategy(),
    ) {
        let descriptor = CredentialDescriptor::builder(role.clone(), credential_type)
            .backend(backend.clone())
            .build()
            .unwrap();
        let metadata = aws::create(&descriptor).unwrap();

        let (segment, lease_mode) = match credential_type {
            CredentialType::IamUser => ("creds", LeaseMode::None),
            CredentialType::AssumedRole => ("sts", LeaseMode::Renew),
            CredentialType::FederationToken => ("sts", LeaseMode::Rotate),
        };
        prop_assert_eq!(metadata.path(), format!("{}/{}/{}", backend, segment, role));
        prop_assert_eq!(metadata.lease_mode(), lease_mode);
        prop_assert_eq!(metadata.name(), format!("{} with Role {}", backend, role));
        prop_assert_eq!(
            metadata.transformer().target_for("security_token").is_some(),
            credential_type != CredentialType::IamUser
        );
    }

    #[test]
    fn prop_key_variable_is_path_without_backend(
        backend in backend_strategy(),
        role in segment_strategy(),
        credential_type in credential_type_strategy(),
    ) {
        let descriptor = CredentialDescriptor::builder(role, credential_type)
            .backend(backend.clone())
            .build()
            .unwrap();
        let metadata = aws::create(&descriptor).unwrap();

        let prefix = format!("{}/", metadata.variables()["backend"]);
        prop_assert_eq!(&metadata.variables()["backend"], &backend);
        prop_assert_eq!(
            metadata.path().strip_prefix(prefix.as_str()),
            Some(metadata.variables()["key"].as_str())
        );
    }

    #[test]
    fn prop_transformer_targets_never_empty(
        access in property_strategy(),
        secret in property_strategy(),
        session in property_strategy(),
        credential_type in credential_type_strategy(),
    ) {
        let descriptor = CredentialDescriptor::builder("readonly", credential_type)
            .access_key_property(access)
            .secret_key_property(secret)
            .session_token_key_property(session)
            .build()
            .unwrap();
        let metadata = aws::create(&descriptor).unwrap();

        let entries = metadata.transformer().entries();
        prop_assert!(entries.iter().all(|(_, target)| !target.is_empty()));
        let mut sources: Vec<&str> = entries.iter().map(|(source, _)| source.as_str()).collect();
        sources.dedup();
        prop_assert_eq!(sources.len(), entries.len());
    }

    #[test]
    fn prop_unknown_credential_type_rejected(value in "[a-z_]{1,20}") {
        prop_assume!(value.parse::<CredentialType>().is_err());
        let properties = CredentialProperties {
            role: "readonly".to_string(),
            credential_type: value.clone(),
            ..Default::default()
        };
        prop_assert_eq!(
            aws::create_from_properties(properties),
            Err(CredentialError::UnsupportedCredentialType(value))
        );
    }

    #[test]
    fn prop_bridge_publishes_only_own_creations(
        own in 1u64..1000,
        events in prop::collection::vec((1u64..1000, event_kind_strategy()), 0..50),
    ) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<RebindEvent>();
        let descriptor = CredentialDescriptor::builder("deploy", CredentialType::AssumedRole)
            .build()
            .unwrap();
        let bridge = LeaseRenewalBridge::new(
            RequestHandle::from(own),
            descriptor,
            "aws with Role deploy".to_string(),
            Arc::new(sender),
        );

        let mut expected = 0;
        for (source, kind) in &events {
            bridge.on_lease_event(&LeaseEvent::new(RequestHandle::from(*source), *kind));
            if *source == own && matches!(kind, LeaseEventKind::Created | LeaseEventKind::Rotated) {
                expected += 1;
            }
        }

        let mut published = 0;
        while let Ok(event) = receiver.try_recv() {
            prop_assert_eq!(event.source, RequestHandle::from(own));
            published += 1;
        }
        prop_assert_eq!(published, expected);
    }
}

use serde_json::{Map, Value};

use crate::aws::credential_type::require;
use crate::aws::descriptor::CredentialDescriptor;
use crate::error::CredentialError;

pub const ACCESS_KEY: &str = "access_key";
pub const SECRET_KEY: &str = "secret_key";
pub const SECURITY_TOKEN: &str = "security_token";

/// Ordered rename table applied to a raw secret before it is exposed as properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyTransformer {
    transformations: Vec<(String, String)>,
}

impl KeyTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_key_transformation(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Result<(), CredentialError> {
        let source = source.into();
        let target = target.into();
        require("source key", &source)?;
        require(&format!("target property for `{}'", source), &target)?;
        self.transformations.push((source, target));
        Ok(())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.transformations
    }

    pub fn target_for(&self, source: &str) -> Option<&str> {
        self.transformations
            .iter()
            .rev()
            .find(|(s, _)| s == source)
            .map(|(_, t)| t.as_str())
    }

    /// Renames mapped keys, in insertion order. Unmapped keys are kept as is;
    /// when two entries write the same target, the later one wins.
    pub fn apply(&self, mut input: Map<String, Value>) -> Map<String, Value> {
        let mut output = Map::new();
        for (source, target) in &self.transformations {
            if let Some(value) = input.remove(source) {
                output.insert(target.clone(), value);
            }
        }
        for (key, value) in input {
            output.entry(key).or_insert(value);
        }
        output
    }
}

pub fn build_transformer(descriptor: &CredentialDescriptor) -> Result<KeyTransformer, CredentialError> {
    let mut transformer = KeyTransformer::new();
    transformer.add_key_transformation(ACCESS_KEY, descriptor.access_key_property())?;
    transformer.add_key_transformation(SECRET_KEY, descriptor.secret_key_property())?;
    if let Some(session_token) = descriptor.session_token_key_property() {
        transformer.add_key_transformation(SECURITY_TOKEN, session_token)?;
    }
    Ok(transformer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::credential_type::CredentialType;
    use serde_json::json;

    #[test]
    fn test_iam_user_transformer() {
        let descriptor = CredentialDescriptor::builder("readonly", CredentialType::IamUser)
            .build()
            .unwrap();
        let transformer = build_transformer(&descriptor).unwrap();
        assert_eq!(
            transformer.entries(),
            &[
                (ACCESS_KEY.to_string(), "cloud.aws.credentials.accessKey".to_string()),
                (SECRET_KEY.to_string(), "cloud.aws.credentials.secretKey".to_string()),
            ]
        );
        assert_eq!(transformer.target_for(SECURITY_TOKEN), None);
    }

    #[test]
    fn test_sts_transformer_includes_security_token() {
        let descriptor = CredentialDescriptor::builder("deploy", CredentialType::FederationToken)
            .session_token_key_property("aws.session")
            .build()
            .unwrap();
        let transformer = build_transformer(&descriptor).unwrap();
        assert_eq!(transformer.entries().len(), 3);
        assert_eq!(transformer.target_for(SECURITY_TOKEN), Some("aws.session"));
    }

    #[test]
    fn test_empty_target_rejected() {
        let mut transformer = KeyTransformer::new();
        assert!(matches!(
            transformer.add_key_transformation(ACCESS_KEY, ""),
            Err(CredentialError::InvalidArgument(_))
        ));
        assert!(transformer.entries().is_empty());
    }

    #[test]
    fn test_apply_renames_and_keeps_unmapped() {
        let mut transformer = KeyTransformer::new();
        transformer.add_key_transformation(ACCESS_KEY, "aws.access").unwrap();
        transformer.add_key_transformation(SECRET_KEY, "aws.secret").unwrap();

        let raw = json!({"access_key": "AKIA", "secret_key": "s3cr3t", "arn": "arn:aws:iam::1"});
        let output = transformer.apply(raw.as_object().unwrap().clone());

        assert_eq!(output["aws.access"], "AKIA");
        assert_eq!(output["aws.secret"], "s3cr3t");
        assert_eq!(output["arn"], "arn:aws:iam::1");
        assert!(!output.contains_key(ACCESS_KEY));
    }

    #[test]
    fn test_apply_last_write_wins() {
        let mut transformer = KeyTransformer::new();
        transformer.add_key_transformation(ACCESS_KEY, "aws.key").unwrap();
        transformer.add_key_transformation(SECRET_KEY, "aws.key").unwrap();

        let raw = json!({"access_key": "AKIA", "secret_key": "s3cr3t"});
        let output = transformer.apply(raw.as_object().unwrap().clone());

        assert_eq!(output.len(), 1);
        assert_eq!(output["aws.key"], "s3cr3t");
    }
}

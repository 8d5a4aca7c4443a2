//! AWS secrets engine: credential types, request metadata and key remapping.

pub mod credential_type;
pub mod descriptor;
pub mod factory;
pub mod metadata;
pub mod path;
pub mod transformer;

pub use credential_type::{CredentialType, LeaseMode};
pub use descriptor::{CredentialDescriptor, CredentialProperties};
pub use factory::{create, create_from_properties, MetadataFactory};
pub use metadata::CredentialMetadata;
pub use transformer::KeyTransformer;

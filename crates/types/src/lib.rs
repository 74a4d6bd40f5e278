//! Shared types for bentoctl
//!
//! This crate contains the error taxonomy and the small set of constants and
//! helpers shared by the schema, operator, bento and config crates.

pub mod error;
pub mod utils;

pub use error::{
    BentoStoreError, DeploymentConfigError, FieldErrors, OperatorError, Result, SchemaError,
    SettingsError,
};

/// The only deployment config `api_version` this tool understands
pub const API_VERSION: &str = "v1";

/// File whose presence marks a directory as a built bento
pub const BENTO_DESCRIPTOR_FILE: &str = "bento.yaml";

/// Manifest file expected inside every operator directory
pub const OPERATOR_MANIFEST_FILE: &str = "operator_config.yaml";

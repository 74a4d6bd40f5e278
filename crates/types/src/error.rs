//! Error types for bentoctl

use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Validation errors keyed by dotted field path (`spec.instances.min`)
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Main error type for loading a deployment config.
///
/// Every failure while building a `DeploymentConfig` ends up as one of these
/// two variants, whatever layer it started in.
#[derive(Error, Debug)]
pub enum DeploymentConfigError {
    /// The deployment config file does not exist
    #[error("Deployment config not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// The document is malformed, fails the schema or references something
    /// that cannot be resolved
    #[error("Invalid deployment config: {message}{}", format_field_errors(.errors))]
    Invalid { message: String, errors: FieldErrors },
}

/// Result type alias for deployment config operations
pub type Result<T> = std::result::Result<T, DeploymentConfigError>;

impl DeploymentConfigError {
    /// Invalid config without a field report
    pub fn invalid(message: impl Into<String>) -> Self {
        DeploymentConfigError::Invalid {
            message: message.into(),
            errors: FieldErrors::new(),
        }
    }

    /// Invalid config carrying the validator's field report
    pub fn with_errors(message: impl Into<String>, errors: FieldErrors) -> Self {
        DeploymentConfigError::Invalid {
            message: message.into(),
            errors,
        }
    }

    /// Field report, empty unless the error came from schema validation
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            DeploymentConfigError::Invalid { errors, .. } if !errors.is_empty() => Some(errors),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DeploymentConfigError::NotFound { .. })
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, DeploymentConfigError::Invalid { .. })
    }
}

fn format_field_errors(errors: &FieldErrors) -> String {
    let mut out = String::new();
    for (field, messages) in errors {
        out.push_str(&format!("\n  {}: {}", field, messages.join("; ")));
    }
    out
}

/// Operator registry and operator execution errors
#[derive(Error, Debug)]
pub enum OperatorError {
    /// No operator registered under this name
    #[error("Operator '{name}' is not installed")]
    NotInstalled { name: String },

    /// Operator directory has no manifest
    #[error("Operator manifest not found: {}", .path.display())]
    ManifestNotFound { path: PathBuf },

    /// Operator manifest could not be parsed
    #[error("Invalid operator manifest at {}: {message}", .path.display())]
    InvalidManifest { path: PathBuf, message: String },

    /// Operator cannot update an existing deployment in place
    #[error("Operator '{name}' does not support updating deployment '{deployment}'")]
    UpdateUnsupported { name: String, deployment: String },

    /// Operator failed while producing the deployable
    #[error("Operator '{name}' failed to deploy: {message}")]
    Deploy { name: String, message: String },

    /// Filesystem error while reading or writing operator files
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Bento store lookup errors
#[derive(Error, Debug)]
pub enum BentoStoreError {
    /// No bento with this tag in the store
    #[error("Bento '{tag}' not found in store")]
    NotFound { tag: String },

    /// Tag is not of the form `name` or `name:version`
    #[error("Invalid bento tag '{tag}': {reason}")]
    InvalidTag { tag: String, reason: String },

    /// Filesystem error while reading the store
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Malformed schema definitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Unknown value for the `type` rule
    #[error("Unknown field type '{0}'")]
    UnknownType(String),

    /// Unknown value for the `coerce` rule
    #[error("Unknown coercion '{0}'")]
    UnknownCoercion(String),

    /// `schema` rule has the wrong shape for the field's type
    #[error("Invalid nested schema for {field_type} field: {message}")]
    InvalidNested { field_type: String, message: String },
}

/// Tool settings errors
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Settings file given explicitly but missing
    #[error("Settings file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    /// Parse error
    #[error("Settings parse error: {0}")]
    ParseError(String),

    /// Validation error
    #[error("Settings validation error: {field}: {message}")]
    ValidationError { field: String, message: String },
}

impl From<OperatorError> for DeploymentConfigError {
    fn from(err: OperatorError) -> Self {
        DeploymentConfigError::invalid(err.to_string())
    }
}

impl From<SchemaError> for DeploymentConfigError {
    fn from(err: SchemaError) -> Self {
        DeploymentConfigError::invalid(format!("Operator schema is malformed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_display_lists_fields() {
        let mut errors = FieldErrors::new();
        errors.insert(
            "spec.instances".to_string(),
            vec!["required field".to_string()],
        );
        let err = DeploymentConfigError::with_errors("schema validation failed", errors);

        let rendered = err.to_string();
        assert!(rendered.starts_with("Invalid deployment config: schema validation failed"));
        assert!(rendered.contains("spec.instances: required field"));
        assert!(err.field_errors().is_some());
    }

    #[test]
    fn test_operator_error_converts_to_invalid() {
        let err: DeploymentConfigError = OperatorError::NotInstalled {
            name: "testop".to_string(),
        }
        .into();

        assert!(err.is_invalid());
        assert!(err.to_string().contains("Operator 'testop' is not installed"));
        assert!(err.field_errors().is_none());
    }

    #[test]
    fn test_not_found_display() {
        let err = DeploymentConfigError::NotFound {
            path: PathBuf::from("/tmp/missing.yaml"),
        };
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Deployment config not found: /tmp/missing.yaml"
        );
    }
}
